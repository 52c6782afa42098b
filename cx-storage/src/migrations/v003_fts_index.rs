//! v003 — FTS5 index over searchable entity text.

use rusqlite::Connection;

use cx_core::errors::StorageError;

use crate::sq;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS entity_fts USING fts5(
            id UNINDEXED,
            name,
            body_text,
            doc_comment,
            file_path
        );",
    )
    .map_err(sq)
}
