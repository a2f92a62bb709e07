//! Singleton account record CRUD.

use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::Result;
use crate::models::AccountRecord;

pub fn upsert(conn: &Connection, record: &AccountRecord) -> Result<()> {
    let data = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO account (id, data) VALUES (0, ?1)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        params![data],
    )?;
    Ok(())
}

pub fn get(conn: &Connection) -> Result<Option<AccountRecord>> {
    let data: Option<String> = conn
        .query_row("SELECT data FROM account WHERE id = 0", [], |row| {
            row.get(0)
        })
        .optional()?;

    match data {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

impl Database {
    pub fn upsert_account(&self, record: &AccountRecord) -> Result<()> {
        upsert(self.conn(), record)
    }

    pub fn get_account(&self) -> Result<Option<AccountRecord>> {
        get(self.conn())
    }
}
