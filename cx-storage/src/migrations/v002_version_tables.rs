//! v002 — snapshot/version tables: commits, refs, per-commit copies of
//! entities and dependencies.

use rusqlite::Connection;

use cx_core::errors::StorageError;

use crate::sq;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS commits (
            hash          TEXT PRIMARY KEY,
            parent        TEXT,
            committer     TEXT NOT NULL DEFAULT '',
            message       TEXT NOT NULL DEFAULT '',
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_commits_created ON commits(created_at);

        CREATE TABLE IF NOT EXISTS refs (
            name          TEXT PRIMARY KEY,
            commit_hash   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entity_versions (
            commit_hash   TEXT NOT NULL,
            id            TEXT NOT NULL,
            name          TEXT NOT NULL,
            entity_type   TEXT NOT NULL,
            kind          TEXT NOT NULL DEFAULT '',
            visibility    TEXT NOT NULL DEFAULT 'priv',
            language      TEXT NOT NULL DEFAULT '',
            file_path     TEXT NOT NULL,
            line_start    INTEGER NOT NULL,
            line_end      INTEGER,
            signature     TEXT NOT NULL DEFAULT '',
            sig_hash      TEXT NOT NULL,
            body_hash     TEXT NOT NULL,
            status        TEXT NOT NULL DEFAULT 'active',
            PRIMARY KEY (commit_hash, id)
        );
        CREATE INDEX IF NOT EXISTS idx_entity_versions_id ON entity_versions(id);

        CREATE TABLE IF NOT EXISTS dependency_versions (
            commit_hash   TEXT NOT NULL,
            from_id       TEXT NOT NULL,
            to_id         TEXT NOT NULL,
            dep_type      TEXT NOT NULL,
            PRIMARY KEY (commit_hash, from_id, to_id, dep_type)
        );",
    )
    .map_err(sq)
}
