//! Domain records persisted in the local SQLite database.
//!
//! Scalar, frequently-filtered fields are typed columns; deep heterogeneous
//! payloads (`RecipientDetail`, `ChatItemPayload`, `Direction`) are stored as
//! `serde_json` TEXT columns. All cross-record references here use local row
//! ids (`i64`); archive-local ids never appear in this crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use valise_shared::content::{
    AccountSettings, Attachment, CallLink, ChatAttributes, Contact, ContactShare,
    DeliveryStatus, DonationSubscription, ExpirationTimerChange, GiftBadge, Group,
    GroupCallState, GroupChangeEvent, IncomingDetail, IndividualCall, LearnedProfileName,
    LinkPreview, MessageText, PackSticker, PaymentNotification, PrivacyMode, Profile,
    ProfileNameChange, QuoteKind, QuotedAttachment, SessionSwitchover, SimpleUpdate,
    StickerMessage, ThreadMerge, UsernameLink, ViewOnceMessage,
};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The singleton account record (row id 0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub profile: Profile,
    pub username: Option<String>,
    pub username_link: Option<UsernameLink>,
    pub donation: Option<DonationSubscription>,
    pub settings: AccountSettings,
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientRecord {
    pub id: i64,
    pub detail: RecipientDetail,
}

/// The per-kind detail of a recipient row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecipientDetail {
    /// The note-to-self destination. Identity comes from `LocalIdentifiers`.
    Myself,
    Contact(Contact),
    Group(Group),
    DistributionList(DistributionListDetail),
    CallLink(CallLink),
}

impl RecipientDetail {
    /// Stable kind discriminant stored in a typed column for filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Myself => "self",
            Self::Contact(_) => "contact",
            Self::Group(_) => "group",
            Self::DistributionList(_) => "distribution_list",
            Self::CallLink(_) => "call_link",
        }
    }
}

/// A distribution list is either live or a deletion tombstone. Tombstones
/// keep the deletion timestamp so exports can decide whether the deletion
/// still needs to be propagated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistributionListDetail {
    Tombstone {
        distribution_id: Uuid,
        deletion_timestamp_ms: u64,
    },
    List {
        distribution_id: Uuid,
        name: String,
        allow_replies: bool,
        privacy_mode: PrivacyMode,
        /// Local recipient row ids of the members.
        member_ids: Vec<i64>,
    },
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: i64,
    pub recipient_id: i64,
    pub attributes: ChatAttributes,
}

// ---------------------------------------------------------------------------
// Chat item
// ---------------------------------------------------------------------------

/// Where a row sits in an edit-history chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EditState {
    /// Not part of any edit chain.
    None,
    LatestRevisionRead,
    LatestRevisionUnread,
    PastRevision,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendStatus {
    pub recipient_id: i64,
    pub status: DeliveryStatus,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Incoming(IncomingDetail),
    Outgoing { send_status: Vec<SendStatus> },
    /// System updates have no direction.
    Directionless,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub author_id: i64,
    /// Sent timestamp of the quoted message; `None` if it was not found
    /// locally when the quote was created.
    pub target_sent_timestamp_ms: Option<u64>,
    pub text: Option<String>,
    pub kind: QuoteKind,
    pub attachments: Vec<QuotedAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandardMessage {
    pub text: Option<MessageText>,
    pub quote: Option<Quote>,
    pub attachments: Vec<Attachment>,
    pub link_previews: Vec<LinkPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupCallUpdate {
    pub state: GroupCallState,
    pub ringer_id: Option<i64>,
    pub started_by_id: Option<i64>,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatUpdate {
    Simple(SimpleUpdate),
    ExpirationTimerChange(ExpirationTimerChange),
    ProfileNameChange(ProfileNameChange),
    ThreadMerge(ThreadMerge),
    SessionSwitchover(SessionSwitchover),
    LearnedProfileName(LearnedProfileName),
    /// A single change is a one-element batch.
    GroupChange(Vec<GroupChangeEvent>),
    IndividualCall(IndividualCall),
    GroupCall(GroupCallUpdate),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatItemPayload {
    Standard(StandardMessage),
    ContactShare(ContactShare),
    Sticker(StickerMessage),
    RemoteDeleted,
    ViewOnce(ViewOnceMessage),
    GiftBadge(GiftBadge),
    PaymentNotification(PaymentNotification),
    Update(ChatUpdate),
}

/// One interaction row. Past revisions of an edited message are separate
/// rows pointing at the latest row via `latest_revision_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatItemRecord {
    pub id: i64,
    pub chat_id: i64,
    pub author_id: i64,
    pub date_sent_ms: u64,
    pub expire_start_ms: Option<u64>,
    pub expire_duration_ms: Option<u64>,
    pub sms: bool,
    pub direction: Direction,
    pub edit_state: EditState,
    pub latest_revision_id: Option<i64>,
    pub payload: ChatItemPayload,
}

// ---------------------------------------------------------------------------
// Reaction
// ---------------------------------------------------------------------------

/// A reaction row. Always attached to the latest revision of its chat item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionRecord {
    pub id: i64,
    pub chat_item_id: i64,
    pub author_id: i64,
    pub emoji: String,
    pub sent_timestamp_ms: u64,
    pub sort_order: u64,
}

// ---------------------------------------------------------------------------
// Sticker pack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StickerPackRecord {
    pub pack_id: [u8; 16],
    pub pack_key: [u8; 32],
    pub stickers: Vec<PackSticker>,
}
