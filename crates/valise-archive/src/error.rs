use std::path::PathBuf;

use thiserror::Error;

use valise_store::StoreError;

/// Everything that can go wrong during an import or export.
///
/// The taxonomy matters to callers: stream- and framing-level errors mean the
/// file is unreadable or tampered with; entity-level errors mean a readable
/// archive violated its own consistency rules; `Cancelled` is the caller's
/// own doing. Unknown frame *kinds* are never surfaced here — they are
/// skipped and counted (forward compatibility).
#[derive(Error, Debug)]
pub enum ArchiveError {
    // -- stream level -------------------------------------------------------
    #[error("Backup file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unable to open backup stream: {0}")]
    UnableToOpenStream(std::io::Error),

    #[error("Invalid archive envelope: {0}")]
    InvalidEnvelope(&'static str),

    #[error("Stream MAC validation failed: file is corrupt or tampered with")]
    MacValidationFailed,

    #[error("Frame decryption failed")]
    FrameDecrypt,

    // -- framing level ------------------------------------------------------
    #[error("Invalid frame length delimiter")]
    InvalidLengthDelimiter,

    #[error("Unexpected empty frame")]
    EmptyFinalFrame,

    #[error("Header could not be deserialized")]
    HeaderDeserialization,

    #[error("Unsupported archive format version {0}")]
    UnsupportedVersion(u64),

    // -- entity level (known frame kind, malformed content) -----------------
    #[error("Frame body could not be decoded: {0}")]
    FrameDecode(String),

    #[error("Frame references unknown recipient id {0}")]
    UnresolvedRecipient(u64),

    #[error("Frame references unknown chat id {0}")]
    UnresolvedChat(u64),

    #[error("Frame references unknown chat item id {0}")]
    UnresolvedChatItem(u64),

    #[error("Archive contains no account data frame")]
    MissingAccountData,

    #[error("Archive contains more than one account data frame")]
    DuplicateAccountData,

    #[error("Invalid field in {entity}: {reason}")]
    InvalidField {
        entity: &'static str,
        reason: String,
    },

    // -- collaborators ------------------------------------------------------
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -- caller -------------------------------------------------------------
    #[error("Operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;
