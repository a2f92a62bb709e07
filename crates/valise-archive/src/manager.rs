//! The backup manager: drives a full export or import as one long-lived
//! async task.
//!
//! An export takes a single store snapshot (one read transaction) and walks
//! the entity families in dependency order: header, account data, recipients,
//! chats, chat items (with their reactions), sticker packs. An import reads
//! frames forward-only and restores them inside a single write transaction,
//! committed only after the last frame; any failure or cancellation rolls the
//! transaction back and leaves the store untouched. Cancellation is checked
//! between frames, never mid-frame. A failed or cancelled export removes its
//! partial output file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use valise_shared::LocalIdentifiers;
use valise_store::{ChatItemRecord, EditState, LocalStore, StoreError, StoreSnapshot, StoreWriter};

use crate::archivers::recipient::RecipientRestore;
use crate::archivers::{account, chat, chat_item, reaction, recipient, sticker_pack};
use crate::archivers::chat_item::ChatItemChain;
use crate::error::{ArchiveError, Result};
use crate::progress::{CancelFlag, ProgressSink};
use crate::proto::{BackupHeader, BackupPurpose, Frame, FORMAT_VERSION};
use crate::resolver::{ExportContext, ImportContext};
use crate::stream::{ArchiveReader, ArchiveWriter, StreamMode};

/// Export state machine. Phases run strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportPhase {
    WritingHeader,
    WritingAccountData,
    WritingRecipients,
    WritingChats,
    WritingChatItems,
    WritingStickerPacks,
    Finalized,
}

/// Import state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportPhase {
    ReadingHeader,
    ReadingFrames,
    Committing,
    Finalized,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExportStats {
    pub recipients_written: usize,
    pub chats_written: usize,
    pub chat_items_written: usize,
    pub reactions_written: usize,
    pub sticker_packs_written: usize,
    /// Tombstones that aged out and were not re-emitted.
    pub expired_tombstones: usize,
    pub frames_written: u64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ImportStats {
    pub recipients_imported: usize,
    pub chats_imported: usize,
    pub chat_items_imported: usize,
    pub reactions_imported: usize,
    pub sticker_packs_imported: usize,
    /// Frames of an unrecognized kind, skipped for forward compatibility.
    pub skipped_unknown_frames: usize,
    /// Expired distribution-list tombstones dropped on restore.
    pub expired_tombstones: usize,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Export the full local state to a backup archive at `path`.
///
/// On failure or cancellation the partial output file is removed before the
/// error is returned.
pub async fn export_backup_file<S: LocalStore>(
    path: &Path,
    store: &mut S,
    local: &LocalIdentifiers,
    mode: &StreamMode,
    purpose: BackupPurpose,
    progress: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<ExportStats> {
    let result = run_export(path, store, local, mode, purpose, progress, cancel).await;

    if let Err(error) = &result {
        warn!(path = %path.display(), %error, "export failed, removing partial file");
        let _ = tokio::fs::remove_file(path).await;
    }
    result
}

async fn run_export<S: LocalStore>(
    path: &Path,
    store: &mut S,
    local: &LocalIdentifiers,
    mode: &StreamMode,
    purpose: BackupPurpose,
    progress: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<ExportStats> {
    let backup_time_ms = chrono::Utc::now().timestamp_millis() as u64;
    let mut stats = ExportStats::default();
    let mut ctx = ExportContext::new(local.clone(), backup_time_ms);

    // One read transaction for the whole pass: the archive reflects a single
    // atomic view of local state.
    let snapshot = store.snapshot()?;
    let mut writer = ArchiveWriter::create(path, mode).await?;

    let mut phase = ExportPhase::WritingHeader;
    debug!(?phase, backup_time_ms, "export started");
    writer
        .write_header(&BackupHeader {
            version: FORMAT_VERSION,
            backup_time_ms,
            purpose,
        })
        .await?;
    progress.on_progress(writer.progress());

    phase = ExportPhase::WritingAccountData;
    debug!(?phase, "export phase");
    let account_record = snapshot.account()?.ok_or(ArchiveError::MissingAccountData)?;
    emit(&mut writer, &Frame::Account(account::archive(&account_record)), progress, cancel).await?;

    phase = ExportPhase::WritingRecipients;
    debug!(?phase, "export phase");
    let recipients = snapshot.recipients()?;
    // Distribution lists reference other recipients by archive id, so they
    // are emitted after everything they can point at.
    let (lists, others): (Vec<_>, Vec<_>) = recipients.iter().partition(|r| {
        matches!(r.detail, valise_store::RecipientDetail::DistributionList(_))
    });
    for record in others.into_iter().chain(lists) {
        match recipient::archive(record, &mut ctx) {
            Some(frame) => {
                emit(&mut writer, &Frame::Recipient(frame), progress, cancel).await?;
                stats.recipients_written += 1;
            }
            None => stats.expired_tombstones += 1,
        }
    }

    phase = ExportPhase::WritingChats;
    debug!(?phase, "export phase");
    // A chat can point at a recipient that aged out above (an expired
    // distribution-list tombstone). Emitting it would reference a recipient
    // frame that does not exist in this archive, so the chat and its items
    // are dropped along with the recipient.
    let chats: Vec<_> = snapshot
        .chats()?
        .into_iter()
        .filter(|record| {
            let exported = ctx.try_recipient_id(record.recipient_id).is_some();
            if !exported {
                warn!(
                    chat_id = record.id,
                    recipient_id = record.recipient_id,
                    "chat references a recipient that was not exported, skipping"
                );
            }
            exported
        })
        .collect();
    for record in &chats {
        emit(&mut writer, &Frame::Chat(chat::archive(record, &mut ctx)), progress, cancel).await?;
        stats.chats_written += 1;
    }

    phase = ExportPhase::WritingChatItems;
    debug!(?phase, "export phase");
    for chat_record in &chats {
        for chain in assemble_chains(snapshot.chat_items_for_chat(chat_record.id)?) {
            let latest_local_id = chain.latest.id;
            let frame = chat_item::archive(&chain, &mut ctx);
            emit(&mut writer, &Frame::ChatItem(frame), progress, cancel).await?;
            stats.chat_items_written += 1;

            // Reactions follow every revision of their owning item.
            for reaction_record in snapshot.reactions_for_item(latest_local_id)? {
                let frame = reaction::archive(&reaction_record, &mut ctx);
                emit(&mut writer, &Frame::Reaction(frame), progress, cancel).await?;
                stats.reactions_written += 1;
            }
        }
    }

    phase = ExportPhase::WritingStickerPacks;
    debug!(?phase, "export phase");
    for pack in snapshot.sticker_packs()? {
        emit(&mut writer, &Frame::StickerPack(sticker_pack::archive(&pack)), progress, cancel)
            .await?;
        stats.sticker_packs_written += 1;
    }

    stats.frames_written = writer.progress().frames;
    writer.finalize().await?;

    phase = ExportPhase::Finalized;
    info!(
        ?phase,
        path = %path.display(),
        recipients = stats.recipients_written,
        chats = stats.chats_written,
        chat_items = stats.chat_items_written,
        frames = stats.frames_written,
        "export finished"
    );
    Ok(stats)
}

async fn emit(
    writer: &mut ArchiveWriter,
    frame: &Frame,
    progress: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ArchiveError::Cancelled);
    }
    writer.write_payload(&frame.to_bytes()?).await?;
    progress.on_progress(writer.progress());
    Ok(())
}

/// Group one chat's rows into edit chains: each latest revision plus the
/// past-revision rows that point at it. Rows arrive in the store's own
/// enumeration order; chains are emitted oldest-first by the latest
/// revision's timestamp so repeated exports are stable.
fn assemble_chains(rows: Vec<ChatItemRecord>) -> Vec<ChatItemChain> {
    let (past, latest): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|r| r.edit_state == EditState::PastRevision);

    let mut chains: Vec<ChatItemChain> = latest
        .into_iter()
        .map(|record| ChatItemChain {
            latest: record,
            revisions: Vec::new(),
        })
        .collect();

    for record in past {
        let owner = record.latest_revision_id;
        if let Some(chain) = chains
            .iter_mut()
            .find(|c| Some(c.latest.id) == owner)
        {
            chain.revisions.push(record);
        } else {
            warn!(chat_item_id = record.id, "orphaned past revision, not exported");
        }
    }

    chains.sort_by_key(|c| (c.latest.date_sent_ms, c.latest.id));
    chains
}

/// Export to a timestamped file under the platform data directory
/// (`.../valise/backups/valise_backup_%Y%m%d_%H%M%S.vbk`), keeping the ten
/// most recent backups.
pub async fn export_to_default_dir<S: LocalStore>(
    store: &mut S,
    local: &LocalIdentifiers,
    mode: &StreamMode,
    purpose: BackupPurpose,
    progress: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "valise", "valise")
        .ok_or(ArchiveError::Store(StoreError::NoDataDir))?;

    let backup_dir = dirs.data_dir().join("backups");
    tokio::fs::create_dir_all(&backup_dir).await?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = backup_dir.join(format!("valise_backup_{timestamp}.vbk"));

    export_backup_file(&path, store, local, mode, purpose, progress, cancel).await?;

    cleanup_old_backups(&backup_dir, 10).await;
    Ok(path)
}

/// Keep only the `keep` most recently modified files in `dir`.
async fn cleanup_old_backups(dir: &Path, keep: usize) {
    let Ok(mut rd) = tokio::fs::read_dir(dir).await else {
        return;
    };

    let mut files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    while let Ok(Some(entry)) = rd.next_entry().await {
        if let Ok(meta) = entry.metadata().await {
            if let Ok(modified) = meta.modified() {
                files.push((entry.path(), modified));
            }
        }
    }

    files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in files.iter().skip(keep) {
        let _ = tokio::fs::remove_file(path).await;
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Import a backup archive at `path` into the local store.
///
/// All writes happen inside one store transaction; on any error or on
/// cancellation the transaction is rolled back and the store is unchanged.
pub async fn import_backup_file<S: LocalStore>(
    path: &Path,
    store: &mut S,
    local: &LocalIdentifiers,
    mode: &StreamMode,
    progress: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<ImportStats> {
    let mut reader = ArchiveReader::open(path, mode).await?;

    let mut phase = ImportPhase::ReadingHeader;
    debug!(?phase, path = %path.display(), "import started");
    let header = reader.read_header().await?;
    if header.version > FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion(header.version));
    }

    let mut ctx = ImportContext::new(local.clone(), header.backup_time_ms);
    let mut stats = ImportStats::default();
    let mut writer = store.writer()?;

    phase = ImportPhase::ReadingFrames;
    debug!(?phase, backup_time_ms = header.backup_time_ms, "import phase");
    let outcome =
        restore_frames(&mut reader, &mut writer, &mut ctx, &mut stats, progress, cancel).await;

    match outcome {
        Ok(()) => {
            phase = ImportPhase::Committing;
            debug!(?phase, "import phase");
            writer.commit()?;
        }
        Err(error) => {
            warn!(%error, "import failed, rolling back");
            let _ = writer.rollback();
            return Err(error);
        }
    }

    phase = ImportPhase::Finalized;
    info!(
        ?phase,
        recipients = stats.recipients_imported,
        chats = stats.chats_imported,
        chat_items = stats.chat_items_imported,
        skipped_unknown = stats.skipped_unknown_frames,
        "import finished"
    );
    Ok(stats)
}

async fn restore_frames<W: StoreWriter>(
    reader: &mut ArchiveReader,
    writer: &mut W,
    ctx: &mut ImportContext,
    stats: &mut ImportStats,
    progress: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<()> {
    let mut account_seen = false;

    while let Some(payload) = {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        reader.next_payload().await?
    } {
        let Some(frame) = Frame::from_bytes(&payload)? else {
            // Unknown frame kind: a newer client wrote something we do not
            // understand yet. Skip it, keep the rest of the archive.
            warn!(kind = payload.first(), "skipping frame of unknown kind");
            stats.skipped_unknown_frames += 1;
            progress.on_progress(reader.progress());
            continue;
        };

        match frame {
            Frame::Account(account_frame) => {
                if account_seen {
                    return Err(ArchiveError::DuplicateAccountData);
                }
                account::restore(account_frame, writer)?;
                account_seen = true;
            }
            Frame::Recipient(recipient_frame) => {
                match recipient::restore(recipient_frame, ctx, writer)? {
                    RecipientRestore::Restored => stats.recipients_imported += 1,
                    RecipientRestore::SkippedExpiredTombstone => stats.expired_tombstones += 1,
                }
            }
            Frame::Chat(chat_frame) => {
                chat::restore(chat_frame, ctx, writer)?;
                stats.chats_imported += 1;
            }
            Frame::ChatItem(item_frame) => {
                chat_item::restore(item_frame, ctx, writer)?;
                stats.chat_items_imported += 1;
            }
            Frame::Reaction(reaction_frame) => {
                reaction::restore(reaction_frame, ctx, writer)?;
                stats.reactions_imported += 1;
            }
            Frame::StickerPack(pack_frame) => {
                sticker_pack::restore(pack_frame, writer)?;
                stats.sticker_packs_imported += 1;
            }
        }
        progress.on_progress(reader.progress());
    }

    if !account_seen {
        return Err(ArchiveError::MissingAccountData);
    }
    Ok(())
}
