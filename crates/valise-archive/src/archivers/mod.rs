//! Entity archivers: one module per entity family, each translating between
//! store records and archive frames.
//!
//! `archive` turns a record into a frame payload, allocating archive-local
//! ids through the [`ExportContext`](crate::resolver::ExportContext) on first
//! reference. `restore` turns a frame back into rows through a
//! [`StoreWriter`](valise_store::StoreWriter), resolving every id through the
//! [`ImportContext`](crate::resolver::ImportContext) and failing with a typed
//! error on any dangling reference.

pub mod account;
pub mod chat;
pub mod chat_item;
pub mod reaction;
pub mod recipient;
pub mod sticker_pack;
