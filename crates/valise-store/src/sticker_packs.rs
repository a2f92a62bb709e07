//! Sticker pack CRUD. Pack ids and keys are stored hex-encoded.

use rusqlite::{params, Connection};

use crate::database::Database;
use crate::error::Result;
use crate::models::StickerPackRecord;

use valise_shared::content::PackSticker;

pub fn upsert(conn: &Connection, pack: &StickerPackRecord) -> Result<()> {
    let stickers = serde_json::to_string(&pack.stickers)?;
    conn.execute(
        "INSERT INTO sticker_packs (pack_id, pack_key, stickers) VALUES (?1, ?2, ?3)
         ON CONFLICT(pack_id) DO UPDATE SET pack_key = excluded.pack_key,
                                            stickers = excluded.stickers",
        params![hex::encode(pack.pack_id), hex::encode(pack.pack_key), stickers],
    )?;
    Ok(())
}

pub fn list(conn: &Connection) -> Result<Vec<StickerPackRecord>> {
    let mut stmt =
        conn.prepare("SELECT pack_id, pack_key, stickers FROM sticker_packs ORDER BY pack_id")?;
    let rows = stmt.query_map([], row_to_pack)?;

    let mut packs = Vec::new();
    for row in rows {
        packs.push(row?);
    }
    Ok(packs)
}

fn row_to_pack(row: &rusqlite::Row<'_>) -> rusqlite::Result<StickerPackRecord> {
    let pack_id_hex: String = row.get(0)?;
    let pack_key_hex: String = row.get(1)?;
    let stickers_json: String = row.get(2)?;

    let bad = |idx: usize, e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e)
    };

    let pack_id_bytes = hex::decode(&pack_id_hex).map_err(|e| bad(0, Box::new(e)))?;
    let pack_key_bytes = hex::decode(&pack_key_hex).map_err(|e| bad(1, Box::new(e)))?;

    let pack_id: [u8; 16] = pack_id_bytes
        .try_into()
        .map_err(|_| bad(0, "pack id must be 16 bytes".into()))?;
    let pack_key: [u8; 32] = pack_key_bytes
        .try_into()
        .map_err(|_| bad(1, "pack key must be 32 bytes".into()))?;

    let stickers: Vec<PackSticker> =
        serde_json::from_str(&stickers_json).map_err(|e| bad(2, Box::new(e)))?;

    Ok(StickerPackRecord {
        pack_id,
        pack_key,
        stickers,
    })
}

impl Database {
    pub fn upsert_sticker_pack(&self, pack: &StickerPackRecord) -> Result<()> {
        upsert(self.conn(), pack)
    }

    pub fn list_sticker_packs(&self) -> Result<Vec<StickerPackRecord>> {
        list(self.conn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticker_pack_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let pack = StickerPackRecord {
            pack_id: [3u8; 16],
            pack_key: [9u8; 32],
            stickers: vec![
                PackSticker { id: 0, emoji: Some("🦀".into()) },
                PackSticker { id: 1, emoji: None },
            ],
        };

        db.upsert_sticker_pack(&pack).unwrap();
        db.upsert_sticker_pack(&pack).unwrap();

        let packs = db.list_sticker_packs().unwrap();
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0], pack);
    }
}
