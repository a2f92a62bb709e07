//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `account`, `recipients`, `chats`,
//! `chat_items`, `reactions`, and `sticker_packs`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Account (singleton, id is always 0)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS account (
    id   INTEGER PRIMARY KEY CHECK (id = 0),
    data TEXT NOT NULL                        -- JSON AccountRecord
);

-- ----------------------------------------------------------------
-- Recipients (contacts, groups, distribution lists, call links, self)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS recipients (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    kind   TEXT NOT NULL,                     -- 'self' | 'contact' | 'group' | ...
    detail TEXT NOT NULL                      -- JSON RecipientDetail
);

CREATE INDEX IF NOT EXISTS idx_recipients_kind ON recipients(kind);

-- ----------------------------------------------------------------
-- Chats (one per conversation thread)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient_id INTEGER NOT NULL,            -- FK -> recipients(id)
    attributes   TEXT NOT NULL,               -- JSON ChatAttributes

    FOREIGN KEY (recipient_id) REFERENCES recipients(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chats_recipient ON chats(recipient_id);

-- ----------------------------------------------------------------
-- Chat items (messages, calls, system updates)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_items (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id            INTEGER NOT NULL,      -- FK -> chats(id)
    author_id          INTEGER NOT NULL,      -- FK -> recipients(id)
    date_sent_ms       INTEGER NOT NULL,
    expire_start_ms    INTEGER,
    expire_duration_ms INTEGER,
    sms                INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    direction          TEXT NOT NULL,         -- JSON Direction
    edit_state         TEXT NOT NULL,         -- 'none' | 'latest_read' | 'latest_unread' | 'past'
    latest_revision_id INTEGER,               -- FK -> chat_items(id), past revisions only
    payload            TEXT NOT NULL,         -- JSON ChatItemPayload

    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES recipients(id),
    FOREIGN KEY (latest_revision_id) REFERENCES chat_items(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chat_items_chat ON chat_items(chat_id, date_sent_ms);
CREATE INDEX IF NOT EXISTS idx_chat_items_revision ON chat_items(latest_revision_id);

-- ----------------------------------------------------------------
-- Reactions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reactions (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_item_id      INTEGER NOT NULL,       -- FK -> chat_items(id)
    author_id         INTEGER NOT NULL,       -- FK -> recipients(id)
    emoji             TEXT NOT NULL,
    sent_timestamp_ms INTEGER NOT NULL,
    sort_order        INTEGER NOT NULL,

    FOREIGN KEY (chat_item_id) REFERENCES chat_items(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES recipients(id)
);

CREATE INDEX IF NOT EXISTS idx_reactions_item ON reactions(chat_item_id, sort_order);

-- ----------------------------------------------------------------
-- Sticker packs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sticker_packs (
    pack_id  TEXT PRIMARY KEY NOT NULL,       -- hex-encoded 16-byte pack id
    pack_key TEXT NOT NULL,                   -- hex-encoded 32-byte pack key
    stickers TEXT NOT NULL                    -- JSON Vec<PackSticker>
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
