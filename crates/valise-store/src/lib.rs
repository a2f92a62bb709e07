//! # valise-store
//!
//! The local system of record that the backup archive engine reads from and
//! writes into.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection` with typed CRUD helpers for every domain record,
//! plus the abstract transactional interface ([`LocalStore`],
//! [`StoreSnapshot`], [`StoreWriter`]) the engine is generic over: one read
//! transaction per export pass, one write transaction per import, committed
//! or rolled back as a unit.

pub mod account;
pub mod chat_items;
pub mod chats;
pub mod database;
pub mod migrations;
pub mod models;
pub mod reactions;
pub mod recipients;
pub mod sticker_packs;
pub mod traits;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use traits::{LocalStore, SqliteSnapshot, SqliteWriter, StoreSnapshot, StoreWriter};
