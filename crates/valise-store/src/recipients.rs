//! Recipient CRUD: contacts, groups, distribution lists, call links and the
//! note-to-self recipient.

use rusqlite::{params, Connection};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{RecipientDetail, RecipientRecord};

pub fn insert(conn: &Connection, detail: &RecipientDetail) -> Result<i64> {
    let json = serde_json::to_string(detail)?;
    conn.execute(
        "INSERT INTO recipients (kind, detail) VALUES (?1, ?2)",
        params![detail.kind(), json],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list(conn: &Connection) -> Result<Vec<RecipientRecord>> {
    let mut stmt = conn.prepare("SELECT id, detail FROM recipients ORDER BY id")?;
    let rows = stmt.query_map([], row_to_recipient)?;

    let mut recipients = Vec::new();
    for row in rows {
        recipients.push(row?);
    }
    Ok(recipients)
}

pub fn get(conn: &Connection, id: i64) -> Result<RecipientRecord> {
    conn.query_row(
        "SELECT id, detail FROM recipients WHERE id = ?1",
        params![id],
        row_to_recipient,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipientRecord> {
    let id: i64 = row.get(0)?;
    let json: String = row.get(1)?;

    let detail: RecipientDetail = serde_json::from_str(&json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(RecipientRecord { id, detail })
}

impl Database {
    pub fn insert_recipient(&self, detail: &RecipientDetail) -> Result<i64> {
        insert(self.conn(), detail)
    }

    pub fn list_recipients(&self) -> Result<Vec<RecipientRecord>> {
        list(self.conn())
    }

    pub fn get_recipient(&self, id: i64) -> Result<RecipientRecord> {
        get(self.conn(), id)
    }
}
