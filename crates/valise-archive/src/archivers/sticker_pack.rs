//! Sticker pack archiver. Packs reference no other entities.

use valise_store::{StickerPackRecord, StoreWriter};

use crate::error::Result;
use crate::proto::StickerPackFrame;

pub fn archive(record: &StickerPackRecord) -> StickerPackFrame {
    StickerPackFrame {
        pack_id: record.pack_id,
        pack_key: record.pack_key,
        stickers: record.stickers.clone(),
    }
}

pub fn restore<W: StoreWriter>(frame: StickerPackFrame, writer: &mut W) -> Result<()> {
    let record = StickerPackRecord {
        pack_id: frame.pack_id,
        pack_key: frame.pack_key,
        stickers: frame.stickers,
    };
    writer.insert_sticker_pack(&record)?;
    Ok(())
}
