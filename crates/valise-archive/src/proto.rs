//! The archive wire schema.
//!
//! Every body frame payload is a one-byte frame-kind tag followed by the
//! bincode encoding of the body struct; the header frame (always frame 0)
//! is a bare bincode [`BackupHeader`] with no tag. The kind tag lives
//! outside the body so an unrecognized kind can be skipped without trying
//! to deserialize it.
//!
//! All cross-frame references here use archive-local `u64` ids, allocated
//! during export and meaningless outside one archive. The byte layout is a
//! persisted, versioned contract: changing it requires bumping
//! [`FORMAT_VERSION`].

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

use crate::error::ArchiveError;

/// Current archive format version.
pub const FORMAT_VERSION: u64 = 1;

/// Why this archive was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackupPurpose {
    RemoteBackup,
    LocalExport,
}

/// Frame 0 of every archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupHeader {
    pub version: u64,
    /// Anchor timestamp. All relative-time decisions during import (e.g.
    /// tombstone expiry) are computed against this, never wall clock.
    pub backup_time_ms: u64,
    pub purpose: BackupPurpose,
}

/// Frame kind tag, the first byte of every body frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameKind {
    Account = 0x01,
    Recipient = 0x02,
    Chat = 0x03,
    ChatItem = 0x04,
    Reaction = 0x05,
    StickerPack = 0x06,
}

impl FrameKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Account),
            0x02 => Some(Self::Recipient),
            0x03 => Some(Self::Chat),
            0x04 => Some(Self::ChatItem),
            0x05 => Some(Self::Reaction),
            0x06 => Some(Self::StickerPack),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountFrame {
    pub profile: Profile,
    pub username: Option<String>,
    pub username_link: Option<UsernameLink>,
    pub donation: Option<DonationSubscription>,
    pub settings: AccountSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientFrame {
    /// Archive-local id, referenced by later frames.
    pub id: u64,
    pub detail: RecipientFrameDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecipientFrameDetail {
    /// Note-to-self. Carries no fields; identity comes from the importing
    /// device's `LocalIdentifiers`.
    Myself,
    Contact(Contact),
    Group(Group),
    DistributionList(DistributionListFrame),
    CallLink(CallLink),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistributionListFrame {
    Tombstone {
        distribution_id: Uuid,
        deletion_timestamp_ms: u64,
    },
    List {
        distribution_id: Uuid,
        name: String,
        allow_replies: bool,
        privacy_mode: PrivacyMode,
        /// Archive-local recipient ids; each must be introduced by an
        /// earlier Recipient frame.
        member_ids: Vec<u64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatFrame {
    pub id: u64,
    pub recipient_id: u64,
    pub attributes: ChatAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendStatusFrame {
    pub recipient_id: u64,
    pub status: DeliveryStatus,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DirectionFrame {
    Incoming(IncomingDetail),
    Outgoing { send_status: Vec<SendStatusFrame> },
    Directionless,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuoteFrame {
    pub author_id: u64,
    pub target_sent_timestamp_ms: Option<u64>,
    pub text: Option<String>,
    pub kind: QuoteKind,
    pub attachments: Vec<QuotedAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandardMessageFrame {
    pub text: Option<MessageText>,
    pub quote: Option<QuoteFrame>,
    pub attachments: Vec<Attachment>,
    pub link_previews: Vec<LinkPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupCallFrame {
    pub state: GroupCallState,
    pub ringer_id: Option<u64>,
    pub started_by_id: Option<u64>,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatUpdateFrame {
    Simple(SimpleUpdate),
    ExpirationTimerChange(ExpirationTimerChange),
    ProfileNameChange(ProfileNameChange),
    ThreadMerge(ThreadMerge),
    SessionSwitchover(SessionSwitchover),
    LearnedProfileName(LearnedProfileName),
    /// A single change is a one-element batch.
    GroupChange(Vec<GroupChangeEvent>),
    IndividualCall(IndividualCall),
    GroupCall(GroupCallFrame),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatItemPayloadFrame {
    Standard(StandardMessageFrame),
    ContactShare(ContactShare),
    Sticker(StickerMessage),
    RemoteDeleted,
    ViewOnce(ViewOnceMessage),
    GiftBadge(GiftBadge),
    PaymentNotification(PaymentNotification),
    Update(ChatUpdateFrame),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatItemFrame {
    /// Archive-local id, referenced by Reaction frames. Zero on the nested
    /// past revisions, which nothing references.
    pub id: u64,
    pub chat_id: u64,
    pub author_id: u64,
    pub date_sent_ms: u64,
    pub expire_start_ms: Option<u64>,
    pub expire_duration_ms: Option<u64>,
    pub sms: bool,
    pub direction: DirectionFrame,
    /// Prior revisions of this item, each structurally complete (empty
    /// `revisions` of their own). Canonical order is decided by
    /// `date_sent_ms` on restore, never by the order found here.
    pub revisions: Vec<ChatItemFrame>,
    pub payload: ChatItemPayloadFrame,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionFrame {
    pub chat_item_id: u64,
    pub author_id: u64,
    pub emoji: String,
    pub sent_timestamp_ms: u64,
    pub sort_order: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StickerPackFrame {
    pub pack_id: [u8; 16],
    pub pack_key: [u8; 32],
    pub stickers: Vec<PackSticker>,
}

// ---------------------------------------------------------------------------
// Tagged frame envelope
// ---------------------------------------------------------------------------

/// A decoded body frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Account(AccountFrame),
    Recipient(RecipientFrame),
    Chat(ChatFrame),
    ChatItem(ChatItemFrame),
    Reaction(ReactionFrame),
    StickerPack(StickerPackFrame),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Account(_) => FrameKind::Account,
            Self::Recipient(_) => FrameKind::Recipient,
            Self::Chat(_) => FrameKind::Chat,
            Self::ChatItem(_) => FrameKind::ChatItem,
            Self::Reaction(_) => FrameKind::Reaction,
            Self::StickerPack(_) => FrameKind::StickerPack,
        }
    }

    /// Encode as `[kind byte][bincode body]`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let body = match self {
            Self::Account(f) => bincode::serialize(f),
            Self::Recipient(f) => bincode::serialize(f),
            Self::Chat(f) => bincode::serialize(f),
            Self::ChatItem(f) => bincode::serialize(f),
            Self::Reaction(f) => bincode::serialize(f),
            Self::StickerPack(f) => bincode::serialize(f),
        }
        .map_err(|e| ArchiveError::FrameDecode(e.to_string()))?;

        let mut payload = Vec::with_capacity(1 + body.len());
        payload.push(self.kind() as u8);
        payload.extend_from_slice(&body);
        Ok(payload)
    }

    /// Decode a frame payload.
    ///
    /// Returns `Ok(None)` for an unrecognized kind tag — that frame is to be
    /// skipped, not treated as an error. A *recognized* kind with a malformed
    /// body is an error.
    pub fn from_bytes(payload: &[u8]) -> Result<Option<Self>, ArchiveError> {
        let (&tag, body) = payload
            .split_first()
            .ok_or(ArchiveError::EmptyFinalFrame)?;

        let Some(kind) = FrameKind::from_byte(tag) else {
            return Ok(None);
        };

        let decode_err = |e: bincode::Error| ArchiveError::FrameDecode(e.to_string());
        let frame = match kind {
            FrameKind::Account => Self::Account(bincode::deserialize(body).map_err(decode_err)?),
            FrameKind::Recipient => {
                Self::Recipient(bincode::deserialize(body).map_err(decode_err)?)
            }
            FrameKind::Chat => Self::Chat(bincode::deserialize(body).map_err(decode_err)?),
            FrameKind::ChatItem => Self::ChatItem(bincode::deserialize(body).map_err(decode_err)?),
            FrameKind::Reaction => Self::Reaction(bincode::deserialize(body).map_err(decode_err)?),
            FrameKind::StickerPack => {
                Self::StickerPack(bincode::deserialize(body).map_err(decode_err)?)
            }
        };
        Ok(Some(frame))
    }
}

impl BackupHeader {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        bincode::serialize(self).map_err(|_| ArchiveError::HeaderDeserialization)
    }

    pub fn from_bytes(payload: &[u8]) -> Result<Self, ArchiveError> {
        bincode::deserialize(payload).map_err(|_| ArchiveError::HeaderDeserialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = BackupHeader {
            version: FORMAT_VERSION,
            backup_time_ms: 1_700_000_000_000,
            purpose: BackupPurpose::RemoteBackup,
        };

        let bytes = header.to_bytes().unwrap();
        assert_eq!(BackupHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn test_garbage_header_fails() {
        assert!(matches!(
            BackupHeader::from_bytes(&[0xFF; 3]),
            Err(ArchiveError::HeaderDeserialization)
        ));
    }

    #[test]
    fn test_frame_roundtrip() {
        let frame = Frame::Reaction(ReactionFrame {
            chat_item_id: 9,
            author_id: 2,
            emoji: "👍".into(),
            sent_timestamp_ms: 1234,
            sort_order: 0,
        });

        let bytes = frame.to_bytes().unwrap();
        assert_eq!(bytes[0], FrameKind::Reaction as u8);
        assert_eq!(Frame::from_bytes(&bytes).unwrap(), Some(frame));
    }

    #[test]
    fn test_unknown_kind_is_skippable() {
        assert_eq!(Frame::from_bytes(&[0x7F, 1, 2, 3]).unwrap(), None);
    }

    #[test]
    fn test_known_kind_malformed_body_fails() {
        let result = Frame::from_bytes(&[FrameKind::Reaction as u8, 0xFF]);
        assert!(matches!(result, Err(ArchiveError::FrameDecode(_))));
    }
}
