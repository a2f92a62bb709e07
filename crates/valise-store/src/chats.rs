//! Chat (conversation thread) CRUD.

use rusqlite::{params, Connection};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::ChatRecord;

use valise_shared::content::ChatAttributes;

pub fn insert(conn: &Connection, recipient_id: i64, attributes: &ChatAttributes) -> Result<i64> {
    let json = serde_json::to_string(attributes)?;
    conn.execute(
        "INSERT INTO chats (recipient_id, attributes) VALUES (?1, ?2)",
        params![recipient_id, json],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list(conn: &Connection) -> Result<Vec<ChatRecord>> {
    let mut stmt = conn.prepare("SELECT id, recipient_id, attributes FROM chats ORDER BY id")?;
    let rows = stmt.query_map([], row_to_chat)?;

    let mut chats = Vec::new();
    for row in rows {
        chats.push(row?);
    }
    Ok(chats)
}

pub fn get(conn: &Connection, id: i64) -> Result<ChatRecord> {
    conn.query_row(
        "SELECT id, recipient_id, attributes FROM chats WHERE id = ?1",
        params![id],
        row_to_chat,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRecord> {
    let id: i64 = row.get(0)?;
    let recipient_id: i64 = row.get(1)?;
    let json: String = row.get(2)?;

    let attributes: ChatAttributes = serde_json::from_str(&json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(ChatRecord {
        id,
        recipient_id,
        attributes,
    })
}

impl Database {
    pub fn insert_chat(&self, recipient_id: i64, attributes: &ChatAttributes) -> Result<i64> {
        insert(self.conn(), recipient_id, attributes)
    }

    pub fn list_chats(&self) -> Result<Vec<ChatRecord>> {
        list(self.conn())
    }

    pub fn get_chat(&self, id: i64) -> Result<ChatRecord> {
        get(self.conn(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipientDetail;

    #[test]
    fn chat_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let recipient = db.insert_recipient(&RecipientDetail::Myself).unwrap();

        let attrs = ChatAttributes {
            archived: true,
            pinned_order: Some(1),
            mute_until_ms: Some(u64::MAX),
            ..Default::default()
        };
        let chat = db.insert_chat(recipient, &attrs).unwrap();

        let loaded = db.get_chat(chat).unwrap();
        assert_eq!(loaded.recipient_id, recipient);
        assert_eq!(loaded.attributes, attrs);
        assert_eq!(db.list_chats().unwrap().len(), 1);
    }
}
