//! The id-free domain content model shared by the local store and the
//! archive wire schema.
//!
//! Everything here references other people by service id (ACI/PNI/E.164),
//! never by a row id or an archive-local id, so the same structs can be
//! embedded both in store records (as JSON detail columns) and in archive
//! frames (as bincode payloads). Types that *do* carry recipient/chat
//! references exist twice — once per id space — in `valise-store::models`
//! and `valise-archive::proto`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifiers::{Aci, E164, Pni};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Local profile data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Profile {
    pub given_name: String,
    pub family_name: String,
    pub avatar_url: Option<String>,
    /// 32-byte profile key.
    pub profile_key: Option<[u8; 32]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsernameLink {
    pub entropy: Vec<u8>,
    pub server_id: Uuid,
    pub color: UsernameLinkColor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UsernameLinkColor {
    Unknown,
    Blue,
    White,
    Grey,
    Olive,
    Green,
    Orange,
    Pink,
    Purple,
}

/// Donation subscriber state carried through backups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DonationSubscription {
    pub subscriber_id: Vec<u8>,
    pub currency_code: String,
    pub manually_cancelled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PhoneNumberSharingMode {
    #[default]
    Everybody,
    Nobody,
}

/// The full set of account-level preferences persisted in a backup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AccountSettings {
    pub read_receipts: bool,
    pub sealed_sender_indicators: bool,
    pub typing_indicators: bool,
    pub link_previews: bool,
    pub not_discoverable_by_phone_number: bool,
    pub phone_number_sharing: PhoneNumberSharingMode,
    pub prefer_contact_avatars: bool,
    /// Default disappearing-message timer for new chats, in ms. Zero = off.
    pub universal_expire_timer_ms: u64,
    pub keep_muted_chats_archived: bool,
    pub display_badges_on_profile: bool,
    pub stories_disabled: bool,
    pub story_view_receipts_enabled: bool,
    pub has_viewed_onboarding_story: bool,
    pub has_seen_group_story_education_sheet: bool,
}

// ---------------------------------------------------------------------------
// Recipient details (contact / group / call link)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Registration {
    Registered,
    NotRegistered { unregistered_at_ms: u64 },
}

/// A contact recipient. At least one of `aci`, `pni`, `e164` is present in
/// any well-formed record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub aci: Option<Aci>,
    pub pni: Option<Pni>,
    pub e164: Option<E164>,
    pub username: Option<String>,
    pub registration: Registration,
    pub blocked: bool,
    /// Message-request "delete" state: the contact is hidden from lists.
    pub hidden: bool,
    /// Profile sharing enabled.
    pub whitelisted: bool,
    pub profile_key: Option<[u8; 32]>,
    pub profile_given_name: Option<String>,
    pub profile_family_name: Option<String>,
    pub hide_story: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupRole {
    Default,
    Administrator,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMember {
    pub aci: Aci,
    pub role: GroupRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvitedMember {
    /// Invitee, addressed by ACI or PNI.
    pub service_id: Uuid,
    pub inviter_aci: Option<Aci>,
    pub role: GroupRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestingMember {
    pub aci: Aci,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessLevel {
    Unknown,
    Any,
    Member,
    Administrator,
    Unsatisfiable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessControl {
    pub attributes: AccessLevel,
    pub members: AccessLevel,
    pub add_from_invite_link: AccessLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorySendMode {
    Default,
    Disabled,
    Enabled,
}

/// A group recipient: master key plus a snapshot of the group state at
/// backup time. Membership is keyed by service id, not by recipient id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub master_key: [u8; 32],
    pub whitelisted: bool,
    pub hide_story: bool,
    pub story_send_mode: StorySendMode,
    pub title: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub announcements_only: bool,
    pub members: Vec<GroupMember>,
    pub invited_members: Vec<InvitedMember>,
    pub requesting_members: Vec<RequestingMember>,
    pub banned_service_ids: Vec<Uuid>,
    pub access_control: AccessControl,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallLinkRestrictions {
    None,
    AdminApproval,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallLink {
    pub root_key: Vec<u8>,
    pub admin_key: Option<Vec<u8>>,
    pub name: String,
    pub restrictions: CallLinkRestrictions,
    pub expiration_ms: u64,
}

/// Distribution-list privacy mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrivacyMode {
    /// Only the listed members.
    OnlyWith,
    /// All connections except the listed members.
    AllExcept,
    /// All connections.
    All,
}

// ---------------------------------------------------------------------------
// Chat attributes
// ---------------------------------------------------------------------------

/// Thread-level settings carried identically in store rows and chat frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChatAttributes {
    pub archived: bool,
    pub pinned_order: Option<u32>,
    /// Disappearing-message timer in ms. `None` = off.
    pub expire_timer_ms: Option<u64>,
    pub expire_timer_version: u32,
    /// `Some(u64::MAX)` means muted forever.
    pub mute_until_ms: Option<u64>,
    pub marked_unread: bool,
    pub dont_notify_for_mentions_if_muted: bool,
}

// ---------------------------------------------------------------------------
// Message content
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BodyStyle {
    Bold,
    Italic,
    Spoiler,
    Strikethrough,
    Monospace,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum BodyRangeValue {
    MentionAci(Aci),
    Style(BodyStyle),
}

/// A formatting range or mention over a span of the message body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BodyRange {
    pub start: u32,
    pub length: u32,
    pub value: BodyRangeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageText {
    pub body: String,
    pub ranges: Vec<BodyRange>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttachmentFlag {
    None,
    VoiceMessage,
    Borderless,
    Gif,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub content_type: String,
    pub file_name: Option<String>,
    pub size: u64,
    /// BLAKE3 digest of the plaintext, when known.
    pub digest: Option<Vec<u8>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub flag: AttachmentFlag,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuoteKind {
    Normal,
    GiftBadge,
    ViewOnce,
}

/// Attachment stub inside a quote: content type + optional thumbnail stub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotedAttachment {
    pub content_type: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContactPhoneKind {
    Home,
    Mobile,
    Work,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactPhone {
    pub value: String,
    pub kind: ContactPhoneKind,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactEmail {
    pub value: String,
    pub kind: ContactPhoneKind,
    pub label: Option<String>,
}

/// A shared contact card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactShare {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub organization: Option<String>,
    pub phones: Vec<ContactPhone>,
    pub emails: Vec<ContactEmail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StickerMessage {
    pub pack_id: [u8; 16],
    pub pack_key: [u8; 32],
    pub sticker_id: u32,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewOnceMessage {
    /// `None` once the view-once content has been consumed.
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GiftBadgeState {
    Unopened,
    Opened,
    Redeemed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiftBadge {
    pub receipt_credential: Vec<u8>,
    pub state: GiftBadgeState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Initial,
    Submitted,
    Successful,
    Failed,
}

/// In-chat payment notification. Amounts are decimal strings to avoid
/// floating-point drift across round trips.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentNotification {
    pub amount: Option<String>,
    pub fee: Option<String>,
    pub note: Option<String>,
    pub status: TransactionStatus,
    pub transaction_timestamp_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Directionality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomingDetail {
    pub date_received_ms: u64,
    pub date_server_sent_ms: Option<u64>,
    pub read: bool,
    pub sealed_sender: bool,
}

/// Per-recipient delivery state of an outgoing message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Viewed,
    Skipped,
    Failed,
}

// ---------------------------------------------------------------------------
// Chat updates
// ---------------------------------------------------------------------------

/// One-shot system updates with no parameters beyond their kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SimpleUpdate {
    JoinedApp,
    IdentityUpdate,
    IdentityVerified,
    IdentityDefault,
    ChangeNumber,
    EndSession,
    ChatSessionRefresh,
    BadDecrypt,
    PaymentsActivated,
    PaymentActivationRequest,
    UnsupportedProtocolMessage,
    ReleaseChannelDonationRequest,
    ReportedSpam,
    Blocked,
    Unblocked,
    MessageRequestAccepted,
}

/// One event inside a (possibly batched) group-change update. Actors and
/// subjects are addressed by service id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupChangeEvent {
    Creation { creator_aci: Option<Aci> },
    GenericUpdate { updater_aci: Option<Aci> },
    NameUpdate { updater_aci: Option<Aci>, new_name: Option<String> },
    DescriptionUpdate { updater_aci: Option<Aci>, new_description: Option<String> },
    AvatarUpdate { updater_aci: Option<Aci>, removed: bool },
    MemberAdded { updater_aci: Option<Aci>, member_aci: Aci },
    MemberJoined { member_aci: Aci },
    MemberLeft { member_aci: Aci },
    MemberRemoved { remover_aci: Option<Aci>, member_aci: Aci },
    AdminStatusChange { updater_aci: Option<Aci>, member_aci: Aci, is_admin: bool },
    InvitationSent { inviter_aci: Option<Aci>, invitee_service_id: Uuid },
    InvitationAccepted { invitee_aci: Aci, inviter_aci: Option<Aci> },
    InvitationDeclined { invitee_service_id: Uuid },
    InvitationRevoked { revoker_aci: Option<Aci>, invitee_service_id: Uuid },
    InviteLinkEnabled { updater_aci: Option<Aci>, admin_approval: bool },
    InviteLinkDisabled { updater_aci: Option<Aci> },
    InviteLinkReset { updater_aci: Option<Aci> },
    AttributesAccessChange { updater_aci: Option<Aci>, new_level: AccessLevel },
    MembersAccessChange { updater_aci: Option<Aci>, new_level: AccessLevel },
    AnnouncementsOnlyChange { updater_aci: Option<Aci>, announcements_only: bool },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndividualCallState {
    Accepted,
    NotAccepted,
    Missed,
    MissedByNotificationProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndividualCall {
    pub direction: CallDirection,
    pub kind: CallKind,
    pub state: IndividualCallState,
    pub started_at_ms: u64,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupCallState {
    Generic,
    Joined,
    Ringing,
    Accepted,
    Missed,
    Declined,
    OutgoingRing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpirationTimerChange {
    pub updater_aci: Option<Aci>,
    /// New timer in ms. Zero = disabled.
    pub expires_in_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileNameChange {
    pub previous_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadMerge {
    pub previous_e164: E164,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSwitchover {
    pub e164: E164,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LearnedProfileName {
    pub previous: String,
}

// ---------------------------------------------------------------------------
// Sticker packs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackSticker {
    pub id: u32,
    pub emoji: Option<String>,
}
