//! # valise-archive
//!
//! The backup archive engine: converts everything in the local store into a
//! single portable binary archive file, and restores such an archive into an
//! empty store on another device.
//!
//! An archive is a short envelope, a length-delimited header frame, a stream
//! of length-delimited body frames, and (when encrypted) a keyed-MAC trailer
//! that is verified in full before any frame is surfaced. Exports run over
//! one store snapshot; imports run inside one store transaction that commits
//! only after the last frame. [`manager::export_backup_file`] and
//! [`manager::import_backup_file`] are the entry points;
//! [`comparator::canonical_form`] renders an archive in a canonical textual
//! form for equivalence checks.

pub mod archivers;
pub mod comparator;
pub mod frame;
pub mod manager;
pub mod progress;
pub mod proto;
pub mod resolver;
pub mod stream;

mod error;

pub use error::ArchiveError;
pub use manager::{
    export_backup_file, export_to_default_dir, import_backup_file, ExportStats, ImportStats,
};
pub use progress::{BackupProgress, CancelFlag, NoProgress, ProgressSink};
pub use proto::{BackupHeader, BackupPurpose, FORMAT_VERSION};
pub use stream::{ArchiveReader, ArchiveWriter, StreamMode};
