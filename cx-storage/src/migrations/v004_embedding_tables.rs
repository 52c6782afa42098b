//! v004 — embedding storage: current row per entity plus history rows for
//! time-travel reads.

use rusqlite::Connection;

use cx_core::errors::StorageError;

use crate::sq;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entity_embeddings (
            entity_id     TEXT PRIMARY KEY,
            vector        BLOB NOT NULL,
            dims          INTEGER NOT NULL,
            model_version TEXT NOT NULL,
            content_hash  TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS embedding_history (
            history_id    INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id     TEXT NOT NULL,
            vector        BLOB NOT NULL,
            dims          INTEGER NOT NULL,
            model_version TEXT NOT NULL,
            content_hash  TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_embedding_history_entity
            ON embedding_history(entity_id, created_at);",
    )
    .map_err(sq)
}
