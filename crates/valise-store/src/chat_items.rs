//! Chat item CRUD.
//!
//! Edit-history chains are stored flat: the latest revision is a normal row,
//! past revisions are rows whose `latest_revision_id` points at it and whose
//! `edit_state` is `PastRevision`. Enumeration is by insertion order, not by
//! timestamp — callers that need timestamp order sort themselves.

use rusqlite::{params, Connection};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{ChatItemPayload, ChatItemRecord, Direction, EditState};

fn edit_state_to_sql(state: EditState) -> &'static str {
    match state {
        EditState::None => "none",
        EditState::LatestRevisionRead => "latest_read",
        EditState::LatestRevisionUnread => "latest_unread",
        EditState::PastRevision => "past",
    }
}

fn edit_state_from_sql(s: &str) -> Option<EditState> {
    match s {
        "none" => Some(EditState::None),
        "latest_read" => Some(EditState::LatestRevisionRead),
        "latest_unread" => Some(EditState::LatestRevisionUnread),
        "past" => Some(EditState::PastRevision),
        _ => None,
    }
}

/// Insert a chat item. The `id` field of `item` is ignored; the assigned row
/// id is returned.
pub fn insert(conn: &Connection, item: &ChatItemRecord) -> Result<i64> {
    let direction = serde_json::to_string(&item.direction)?;
    let payload = serde_json::to_string(&item.payload)?;

    conn.execute(
        "INSERT INTO chat_items
            (chat_id, author_id, date_sent_ms, expire_start_ms, expire_duration_ms,
             sms, direction, edit_state, latest_revision_id, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            item.chat_id,
            item.author_id,
            item.date_sent_ms as i64,
            item.expire_start_ms.map(|v| v as i64),
            item.expire_duration_ms.map(|v| v as i64),
            item.sms,
            direction,
            edit_state_to_sql(item.edit_state),
            item.latest_revision_id,
            payload,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All items of one chat, in insertion order.
pub fn list_for_chat(conn: &Connection, chat_id: i64) -> Result<Vec<ChatItemRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_id, author_id, date_sent_ms, expire_start_ms, expire_duration_ms,
                sms, direction, edit_state, latest_revision_id, payload
         FROM chat_items
         WHERE chat_id = ?1
         ORDER BY id",
    )?;
    let rows = stmt.query_map(params![chat_id], row_to_chat_item)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn get(conn: &Connection, id: i64) -> Result<ChatItemRecord> {
    conn.query_row(
        "SELECT id, chat_id, author_id, date_sent_ms, expire_start_ms, expire_duration_ms,
                sms, direction, edit_state, latest_revision_id, payload
         FROM chat_items WHERE id = ?1",
        params![id],
        row_to_chat_item,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

fn row_to_chat_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatItemRecord> {
    let direction_json: String = row.get(7)?;
    let edit_state_str: String = row.get(8)?;
    let payload_json: String = row.get(10)?;

    let direction: Direction = serde_json::from_str(&direction_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let edit_state = edit_state_from_sql(&edit_state_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown edit state {edit_state_str:?}").into(),
        )
    })?;
    let payload: ChatItemPayload = serde_json::from_str(&payload_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let date_sent_ms: i64 = row.get(3)?;
    let expire_start_ms: Option<i64> = row.get(4)?;
    let expire_duration_ms: Option<i64> = row.get(5)?;

    Ok(ChatItemRecord {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        author_id: row.get(2)?,
        date_sent_ms: date_sent_ms as u64,
        expire_start_ms: expire_start_ms.map(|v| v as u64),
        expire_duration_ms: expire_duration_ms.map(|v| v as u64),
        sms: row.get(6)?,
        direction,
        edit_state,
        latest_revision_id: row.get(9)?,
        payload,
    })
}

impl Database {
    pub fn insert_chat_item(&self, item: &ChatItemRecord) -> Result<i64> {
        insert(self.conn(), item)
    }

    pub fn list_chat_items(&self, chat_id: i64) -> Result<Vec<ChatItemRecord>> {
        list_for_chat(self.conn(), chat_id)
    }

    pub fn get_chat_item(&self, id: i64) -> Result<ChatItemRecord> {
        get(self.conn(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecipientDetail, StandardMessage};
    use valise_shared::content::{ChatAttributes, IncomingDetail, MessageText};

    fn text_item(chat_id: i64, author_id: i64, body: &str, date_sent_ms: u64) -> ChatItemRecord {
        ChatItemRecord {
            id: 0,
            chat_id,
            author_id,
            date_sent_ms,
            expire_start_ms: None,
            expire_duration_ms: None,
            sms: false,
            direction: Direction::Incoming(IncomingDetail {
                date_received_ms: date_sent_ms + 40,
                date_server_sent_ms: Some(date_sent_ms + 10),
                read: true,
                sealed_sender: true,
            }),
            edit_state: EditState::None,
            latest_revision_id: None,
            payload: ChatItemPayload::Standard(StandardMessage {
                text: Some(MessageText {
                    body: body.into(),
                    ranges: vec![],
                }),
                quote: None,
                attachments: vec![],
                link_previews: vec![],
            }),
        }
    }

    #[test]
    fn chat_item_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let recipient = db.insert_recipient(&RecipientDetail::Myself).unwrap();
        let chat = db.insert_chat(recipient, &ChatAttributes::default()).unwrap();

        let item = text_item(chat, recipient, "hello", 1_700_000_000_000);
        let id = db.insert_chat_item(&item).unwrap();

        let loaded = db.get_chat_item(id).unwrap();
        assert_eq!(loaded.date_sent_ms, 1_700_000_000_000);
        assert_eq!(loaded.payload, item.payload);
        assert_eq!(loaded.direction, item.direction);
        assert_eq!(db.list_chat_items(chat).unwrap().len(), 1);
    }

    #[test]
    fn enumeration_is_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let recipient = db.insert_recipient(&RecipientDetail::Myself).unwrap();
        let chat = db.insert_chat(recipient, &ChatAttributes::default()).unwrap();

        // Inserted out of timestamp order on purpose.
        db.insert_chat_item(&text_item(chat, recipient, "b", 2000)).unwrap();
        db.insert_chat_item(&text_item(chat, recipient, "a", 1000)).unwrap();

        let items = db.list_chat_items(chat).unwrap();
        assert_eq!(items[0].date_sent_ms, 2000);
        assert_eq!(items[1].date_sent_ms, 1000);
    }
}
