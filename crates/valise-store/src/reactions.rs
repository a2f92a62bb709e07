//! Reaction CRUD. Reactions always hang off the latest revision of a chat
//! item; re-pointing them during an edit is the messaging layer's job, not
//! the store's.

use rusqlite::{params, Connection};

use crate::database::Database;
use crate::error::Result;
use crate::models::ReactionRecord;

/// Insert a reaction. The `id` field of `reaction` is ignored.
pub fn insert(conn: &Connection, reaction: &ReactionRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO reactions (chat_item_id, author_id, emoji, sent_timestamp_ms, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            reaction.chat_item_id,
            reaction.author_id,
            reaction.emoji,
            reaction.sent_timestamp_ms as i64,
            reaction.sort_order as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Reactions for one chat item, in stable sort order.
pub fn list_for_item(conn: &Connection, chat_item_id: i64) -> Result<Vec<ReactionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_item_id, author_id, emoji, sent_timestamp_ms, sort_order
         FROM reactions
         WHERE chat_item_id = ?1
         ORDER BY sort_order",
    )?;
    let rows = stmt.query_map(params![chat_item_id], row_to_reaction)?;

    let mut reactions = Vec::new();
    for row in rows {
        reactions.push(row?);
    }
    Ok(reactions)
}

fn row_to_reaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReactionRecord> {
    let sent_timestamp_ms: i64 = row.get(4)?;
    let sort_order: i64 = row.get(5)?;

    Ok(ReactionRecord {
        id: row.get(0)?,
        chat_item_id: row.get(1)?,
        author_id: row.get(2)?,
        emoji: row.get(3)?,
        sent_timestamp_ms: sent_timestamp_ms as u64,
        sort_order: sort_order as u64,
    })
}

impl Database {
    pub fn insert_reaction(&self, reaction: &ReactionRecord) -> Result<i64> {
        insert(self.conn(), reaction)
    }

    pub fn list_reactions(&self, chat_item_id: i64) -> Result<Vec<ReactionRecord>> {
        list_for_item(self.conn(), chat_item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChatItemPayload, ChatItemRecord, ChatUpdate, Direction, EditState, RecipientDetail,
    };
    use valise_shared::content::{ChatAttributes, SimpleUpdate};

    #[test]
    fn reaction_round_trip_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let recipient = db.insert_recipient(&RecipientDetail::Myself).unwrap();
        let chat = db.insert_chat(recipient, &ChatAttributes::default()).unwrap();
        let item = db
            .insert_chat_item(&ChatItemRecord {
                id: 0,
                chat_id: chat,
                author_id: recipient,
                date_sent_ms: 1000,
                expire_start_ms: None,
                expire_duration_ms: None,
                sms: false,
                direction: Direction::Directionless,
                edit_state: EditState::None,
                latest_revision_id: None,
                payload: ChatItemPayload::Update(ChatUpdate::Simple(SimpleUpdate::JoinedApp)),
            })
            .unwrap();

        for (emoji, order) in [("🔥", 2u64), ("👍", 1u64)] {
            db.insert_reaction(&ReactionRecord {
                id: 0,
                chat_item_id: item,
                author_id: recipient,
                emoji: emoji.into(),
                sent_timestamp_ms: 5000 + order,
                sort_order: order,
            })
            .unwrap();
        }

        let reactions = db.list_reactions(item).unwrap();
        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[0].emoji, "👍");
        assert_eq!(reactions[1].emoji, "🔥");
    }
}
