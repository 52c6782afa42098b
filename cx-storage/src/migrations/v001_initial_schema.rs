//! v001 — core tables: entities, dependencies, metrics, coverage,
//! test→entity map, incremental file index.

use rusqlite::Connection;

use cx_core::errors::StorageError;

use crate::sq;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entities (
            id            TEXT PRIMARY KEY,
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
            receiver      TEXT,
            fields        TEXT,
            body_text     TEXT,
            doc_comment   TEXT,
            skeleton      TEXT,
            status        TEXT NOT NULL DEFAULT 'active',
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entities_file ON entities(file_path);
        CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name);
        CREATE INDEX IF NOT EXISTS idx_entities_status ON entities(status);

        CREATE TABLE IF NOT EXISTS dependencies (
            from_id       TEXT NOT NULL,
            to_id         TEXT NOT NULL,
            dep_type      TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            PRIMARY KEY (from_id, to_id, dep_type)
        );
        CREATE INDEX IF NOT EXISTS idx_dependencies_from ON dependencies(from_id);
        CREATE INDEX IF NOT EXISTS idx_dependencies_to ON dependencies(to_id);

        CREATE TABLE IF NOT EXISTS entity_metrics (
            entity_id     TEXT PRIMARY KEY,
            pagerank      REAL NOT NULL DEFAULT 0,
            in_degree     INTEGER NOT NULL DEFAULT 0,
            out_degree    INTEGER NOT NULL DEFAULT 0,
            betweenness   REAL NOT NULL DEFAULT 0,
            computed_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entity_coverage (
            entity_id         TEXT PRIMARY KEY,
            coverage_percent  REAL NOT NULL DEFAULT 0,
            covered_lines     TEXT NOT NULL DEFAULT '[]',
            uncovered_lines   TEXT NOT NULL DEFAULT '[]',
            last_run          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS test_entity_map (
            test_file     TEXT NOT NULL,
            test_name     TEXT NOT NULL,
            entity_id     TEXT NOT NULL,
            PRIMARY KEY (test_file, test_name, entity_id)
        );
        CREATE INDEX IF NOT EXISTS idx_test_map_entity ON test_entity_map(entity_id);

        CREATE TABLE IF NOT EXISTS file_index (
            file_path     TEXT PRIMARY KEY,
            scan_hash     TEXT NOT NULL,
            scanned_at    TEXT NOT NULL
        );",
    )
    .map_err(sq)
}
