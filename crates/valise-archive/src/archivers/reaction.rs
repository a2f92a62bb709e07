//! Reaction archiver. Reaction frames come after every revision of their
//! owning chat item, so on restore the resolved item id is always the row
//! that is the current latest revision.

use valise_store::{ReactionRecord, StoreWriter};

use crate::error::Result;
use crate::proto::ReactionFrame;
use crate::resolver::{ExportContext, ImportContext};

pub fn archive(record: &ReactionRecord, ctx: &mut ExportContext) -> ReactionFrame {
    ReactionFrame {
        chat_item_id: ctx.chat_item_id(record.chat_item_id),
        author_id: ctx.recipient_id(record.author_id),
        emoji: record.emoji.clone(),
        sent_timestamp_ms: record.sent_timestamp_ms,
        sort_order: record.sort_order,
    }
}

pub fn restore<W: StoreWriter>(
    frame: ReactionFrame,
    ctx: &mut ImportContext,
    writer: &mut W,
) -> Result<()> {
    let record = ReactionRecord {
        id: 0,
        chat_item_id: ctx.resolve_chat_item(frame.chat_item_id)?,
        author_id: ctx.resolve_recipient(frame.author_id)?,
        emoji: frame.emoji,
        sent_timestamp_ms: frame.sent_timestamp_ms,
        sort_order: frame.sort_order,
    };
    writer.insert_reaction(&record)?;
    Ok(())
}
