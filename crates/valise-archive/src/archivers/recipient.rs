//! Recipient archiver: contacts, groups, distribution lists, call links and
//! the note-to-self recipient.
//!
//! Distribution-list deletion tombstones are time-boxed: one that is older
//! than the retention window (measured against the archive's anchor
//! timestamp) is neither re-exported nor restored. Pruning the stale store
//! row is the store's job, not this engine's.

use tracing::debug;

use valise_shared::constants::TOMBSTONE_RETENTION_MS;
use valise_shared::content::Contact;
use valise_store::{DistributionListDetail, RecipientDetail, RecipientRecord, StoreWriter};

use crate::error::{ArchiveError, Result};
use crate::proto::{DistributionListFrame, RecipientFrame, RecipientFrameDetail};
use crate::resolver::{ExportContext, ImportContext};

fn tombstone_expired(backup_time_ms: u64, deletion_timestamp_ms: u64) -> bool {
    backup_time_ms.saturating_sub(deletion_timestamp_ms) > TOMBSTONE_RETENTION_MS
}

/// Produce the frame for one recipient, or `None` when the recipient has
/// aged out (expired tombstone) and must not be re-emitted.
pub fn archive(record: &RecipientRecord, ctx: &mut ExportContext) -> Option<RecipientFrame> {
    let detail = match &record.detail {
        RecipientDetail::Myself => RecipientFrameDetail::Myself,
        RecipientDetail::Contact(c) => RecipientFrameDetail::Contact(c.clone()),
        RecipientDetail::Group(g) => RecipientFrameDetail::Group(g.clone()),
        RecipientDetail::CallLink(l) => RecipientFrameDetail::CallLink(l.clone()),
        RecipientDetail::DistributionList(list) => match list {
            DistributionListDetail::Tombstone {
                distribution_id,
                deletion_timestamp_ms,
            } => {
                if tombstone_expired(ctx.backup_time_ms, *deletion_timestamp_ms) {
                    debug!(
                        recipient_id = record.id,
                        %distribution_id,
                        "skipping expired distribution-list tombstone"
                    );
                    return None;
                }
                RecipientFrameDetail::DistributionList(DistributionListFrame::Tombstone {
                    distribution_id: *distribution_id,
                    deletion_timestamp_ms: *deletion_timestamp_ms,
                })
            }
            DistributionListDetail::List {
                distribution_id,
                name,
                allow_replies,
                privacy_mode,
                member_ids,
            } => {
                // Members must already have been introduced by earlier
                // recipient frames; anything else is a dangling row.
                let member_ids = member_ids
                    .iter()
                    .filter_map(|local| ctx.try_recipient_id(*local))
                    .collect();
                RecipientFrameDetail::DistributionList(DistributionListFrame::List {
                    distribution_id: *distribution_id,
                    name: name.clone(),
                    allow_replies: *allow_replies,
                    privacy_mode: *privacy_mode,
                    member_ids,
                })
            }
        },
    };

    Some(RecipientFrame {
        id: ctx.recipient_id(record.id),
        detail,
    })
}

/// Outcome of restoring one recipient frame.
#[derive(Debug, PartialEq, Eq)]
pub enum RecipientRestore {
    Restored,
    /// An expired deletion tombstone; nothing was written.
    SkippedExpiredTombstone,
}

pub fn restore<W: StoreWriter>(
    frame: RecipientFrame,
    ctx: &mut ImportContext,
    writer: &mut W,
) -> Result<RecipientRestore> {
    let detail = match frame.detail {
        RecipientFrameDetail::Myself => RecipientDetail::Myself,
        RecipientFrameDetail::Contact(c) => {
            validate_contact(&c)?;
            RecipientDetail::Contact(c)
        }
        RecipientFrameDetail::Group(g) => RecipientDetail::Group(g),
        RecipientFrameDetail::CallLink(l) => RecipientDetail::CallLink(l),
        RecipientFrameDetail::DistributionList(list) => match list {
            DistributionListFrame::Tombstone {
                distribution_id,
                deletion_timestamp_ms,
            } => {
                if tombstone_expired(ctx.backup_time_ms, deletion_timestamp_ms) {
                    debug!(
                        archive_id = frame.id,
                        %distribution_id,
                        "dropping expired distribution-list tombstone"
                    );
                    return Ok(RecipientRestore::SkippedExpiredTombstone);
                }
                RecipientDetail::DistributionList(DistributionListDetail::Tombstone {
                    distribution_id,
                    deletion_timestamp_ms,
                })
            }
            DistributionListFrame::List {
                distribution_id,
                name,
                allow_replies,
                privacy_mode,
                member_ids,
            } => {
                let member_ids = member_ids
                    .iter()
                    .map(|id| ctx.resolve_recipient(*id))
                    .collect::<Result<Vec<i64>>>()?;
                RecipientDetail::DistributionList(DistributionListDetail::List {
                    distribution_id,
                    name,
                    allow_replies,
                    privacy_mode,
                    member_ids,
                })
            }
        },
    };

    let local_id = writer.insert_recipient(&detail)?;
    ctx.register_recipient(frame.id, local_id);
    Ok(RecipientRestore::Restored)
}

fn validate_contact(contact: &Contact) -> Result<()> {
    if contact.aci.is_none() && contact.pni.is_none() && contact.e164.is_none() {
        return Err(ArchiveError::InvalidField {
            entity: "Contact",
            reason: "contact carries neither ACI, PNI nor E.164".into(),
        });
    }
    Ok(())
}
