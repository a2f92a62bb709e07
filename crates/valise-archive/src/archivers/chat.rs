//! Chat archiver.

use valise_store::{ChatRecord, StoreWriter};

use crate::error::Result;
use crate::proto::ChatFrame;
use crate::resolver::{ExportContext, ImportContext};

pub fn archive(record: &ChatRecord, ctx: &mut ExportContext) -> ChatFrame {
    ChatFrame {
        id: ctx.chat_id(record.id),
        recipient_id: ctx.recipient_id(record.recipient_id),
        attributes: record.attributes.clone(),
    }
}

pub fn restore<W: StoreWriter>(
    frame: ChatFrame,
    ctx: &mut ImportContext,
    writer: &mut W,
) -> Result<()> {
    let recipient_id = ctx.resolve_recipient(frame.recipient_id)?;
    let local_id = writer.insert_chat(recipient_id, &frame.attributes)?;
    ctx.register_chat(frame.id, local_id);
    Ok(())
}
