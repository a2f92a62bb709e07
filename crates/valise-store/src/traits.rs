//! The abstract transactional interface the backup engine is generic over.
//!
//! An export takes one [`StoreSnapshot`] (a single read transaction, so the
//! archive reflects one atomic view of local state); an import takes one
//! [`StoreWriter`] and commits it only after every frame restored cleanly.
//! `commit`/`rollback` consume the writer, so "no nested transactions" is
//! enforced by the types rather than by convention.

use rusqlite::Transaction;

use crate::chat_items;
use crate::chats;
use crate::database::Database;
use crate::error::Result;
use crate::models::{
    AccountRecord, ChatItemRecord, ChatRecord, ReactionRecord, RecipientDetail, RecipientRecord,
    StickerPackRecord,
};
use crate::reactions;
use crate::recipients;
use crate::sticker_packs;
use crate::account;

use valise_shared::content::ChatAttributes;

/// A store that can hand out read and write transactions.
pub trait LocalStore {
    type Snapshot<'a>: StoreSnapshot
    where
        Self: 'a;
    type Writer<'a>: StoreWriter
    where
        Self: 'a;

    /// Begin a read transaction covering one whole export pass.
    fn snapshot(&mut self) -> Result<Self::Snapshot<'_>>;

    /// Begin the write transaction covering one whole import.
    fn writer(&mut self) -> Result<Self::Writer<'_>>;
}

/// Read-transaction-scoped accessors, one group per entity family.
pub trait StoreSnapshot {
    fn account(&self) -> Result<Option<AccountRecord>>;
    fn recipients(&self) -> Result<Vec<RecipientRecord>>;
    fn chats(&self) -> Result<Vec<ChatRecord>>;
    /// Items of one chat in the store's own enumeration order, which is not
    /// necessarily timestamp order.
    fn chat_items_for_chat(&self, chat_id: i64) -> Result<Vec<ChatItemRecord>>;
    fn reactions_for_item(&self, chat_item_id: i64) -> Result<Vec<ReactionRecord>>;
    fn sticker_packs(&self) -> Result<Vec<StickerPackRecord>>;
}

/// Write-transaction-scoped insertion. Nothing is visible to other readers
/// until `commit`.
pub trait StoreWriter {
    fn insert_account(&mut self, record: &AccountRecord) -> Result<()>;
    fn insert_recipient(&mut self, detail: &RecipientDetail) -> Result<i64>;
    fn insert_chat(&mut self, recipient_id: i64, attributes: &ChatAttributes) -> Result<i64>;
    fn insert_chat_item(&mut self, item: &ChatItemRecord) -> Result<i64>;
    fn insert_reaction(&mut self, reaction: &ReactionRecord) -> Result<i64>;
    fn insert_sticker_pack(&mut self, pack: &StickerPackRecord) -> Result<()>;

    fn commit(self) -> Result<()>;
    /// Rollback (also implicit when the writer is dropped uncommitted).
    fn rollback(self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

/// [`StoreSnapshot`] backed by a `rusqlite` transaction.
pub struct SqliteSnapshot<'a> {
    tx: Transaction<'a>,
}

impl StoreSnapshot for SqliteSnapshot<'_> {
    fn account(&self) -> Result<Option<AccountRecord>> {
        account::get(&self.tx)
    }

    fn recipients(&self) -> Result<Vec<RecipientRecord>> {
        recipients::list(&self.tx)
    }

    fn chats(&self) -> Result<Vec<ChatRecord>> {
        chats::list(&self.tx)
    }

    fn chat_items_for_chat(&self, chat_id: i64) -> Result<Vec<ChatItemRecord>> {
        chat_items::list_for_chat(&self.tx, chat_id)
    }

    fn reactions_for_item(&self, chat_item_id: i64) -> Result<Vec<ReactionRecord>> {
        reactions::list_for_item(&self.tx, chat_item_id)
    }

    fn sticker_packs(&self) -> Result<Vec<StickerPackRecord>> {
        sticker_packs::list(&self.tx)
    }
}

/// [`StoreWriter`] backed by a `rusqlite` transaction.
pub struct SqliteWriter<'a> {
    tx: Transaction<'a>,
}

impl StoreWriter for SqliteWriter<'_> {
    fn insert_account(&mut self, record: &AccountRecord) -> Result<()> {
        account::upsert(&self.tx, record)
    }

    fn insert_recipient(&mut self, detail: &RecipientDetail) -> Result<i64> {
        recipients::insert(&self.tx, detail)
    }

    fn insert_chat(&mut self, recipient_id: i64, attributes: &ChatAttributes) -> Result<i64> {
        chats::insert(&self.tx, recipient_id, attributes)
    }

    fn insert_chat_item(&mut self, item: &ChatItemRecord) -> Result<i64> {
        chat_items::insert(&self.tx, item)
    }

    fn insert_reaction(&mut self, reaction: &ReactionRecord) -> Result<i64> {
        reactions::insert(&self.tx, reaction)
    }

    fn insert_sticker_pack(&mut self, pack: &StickerPackRecord) -> Result<()> {
        sticker_packs::upsert(&self.tx, pack)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

impl LocalStore for Database {
    type Snapshot<'a>
        = SqliteSnapshot<'a>
    where
        Self: 'a;
    type Writer<'a>
        = SqliteWriter<'a>
    where
        Self: 'a;

    fn snapshot(&mut self) -> Result<SqliteSnapshot<'_>> {
        Ok(SqliteSnapshot {
            tx: self.conn_mut().transaction()?,
        })
    }

    fn writer(&mut self) -> Result<SqliteWriter<'_>> {
        Ok(SqliteWriter {
            tx: self.conn_mut().transaction()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_rollback_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("test.db")).unwrap();

        {
            let mut writer = db.writer().unwrap();
            writer.insert_recipient(&RecipientDetail::Myself).unwrap();
            writer.rollback().unwrap();
        }
        assert!(db.list_recipients().unwrap().is_empty());

        // Dropping uncommitted has the same effect.
        {
            let mut writer = db.writer().unwrap();
            writer.insert_recipient(&RecipientDetail::Myself).unwrap();
        }
        assert!(db.list_recipients().unwrap().is_empty());
    }

    #[test]
    fn writer_commit_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let mut writer = db.writer().unwrap();
        let id = writer.insert_recipient(&RecipientDetail::Myself).unwrap();
        writer.insert_chat(id, &ChatAttributes::default()).unwrap();
        writer.commit().unwrap();

        assert_eq!(db.list_recipients().unwrap().len(), 1);
        assert_eq!(db.list_chats().unwrap().len(), 1);
    }

    #[test]
    fn snapshot_reads_committed_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let id = db.insert_recipient(&RecipientDetail::Myself).unwrap();
        db.insert_chat(id, &ChatAttributes::default()).unwrap();

        let snapshot = db.snapshot().unwrap();
        assert!(snapshot.account().unwrap().is_none());
        assert_eq!(snapshot.recipients().unwrap().len(), 1);
        assert_eq!(snapshot.chats().unwrap().len(), 1);
        assert!(snapshot.sticker_packs().unwrap().is_empty());
    }
}
