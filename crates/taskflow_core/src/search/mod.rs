//! Task search backed by the SQLite FTS5 index created in migration 3.

pub mod fts;
