//! Migration runner — version tracking, forward-only, transactional per
//! migration. Re-running against an existing schema is a no-op; duplicate
//! index/table errors are treated as benign.

mod v001_initial_schema;
mod v002_version_tables;
mod v003_fts_index;
mod v004_embedding_tables;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use cx_core::errors::StorageError;

use crate::sq;

/// Total number of migrations.
pub const LATEST_VERSION: u32 = 4;

type MigrationFn = fn(&Connection) -> Result<(), StorageError>;

const MIGRATIONS: [(u32, &str, MigrationFn); 4] = [
    (1, "initial_schema", v001_initial_schema::migrate),
    (2, "version_tables", v002_version_tables::migrate),
    (3, "fts_index", v003_fts_index::migrate),
    (4, "embedding_tables", v004_embedding_tables::migrate),
];

/// Get the current schema version. Returns 0 before the first migration.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(sq)?;

    if !exists {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .map_err(sq)?;
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(sq)
}

/// Duplicate-object errors on re-init are benign by contract.
fn is_benign(e: &StorageError) -> bool {
    matches!(e, StorageError::Sqlite { message } if message.contains("already exists"))
}

/// Run all pending migrations. Forward-only, each in its own transaction.
pub fn run_migrations(conn: &Connection) -> Result<u32, StorageError> {
    let current = current_version(conn)?;
    let mut applied = 0;

    if current >= LATEST_VERSION {
        debug!("schema is up to date (v{current})");
        return Ok(0);
    }

    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| sq(format!("begin transaction for v{version:03}: {e}")))?;

        let result = match migrate_fn(conn) {
            Err(e) if is_benign(&e) => {
                debug!("migration v{version:03} hit existing objects, continuing");
                Ok(())
            }
            other => other,
        };

        match result {
            Ok(()) => {
                conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
                    .map_err(|e| sq(format!("record version v{version:03}: {e}")))?;
                conn.execute_batch("COMMIT")
                    .map_err(|e| sq(format!("commit v{version:03}: {e}")))?;
                applied += 1;
            }
            Err(e) => {
                warn!("migration v{version:03} failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(StorageError::MigrationFailed {
                    version,
                    message: e.to_string(),
                });
            }
        }
    }

    if applied > 0 {
        info!("applied {applied} migration(s), now at v{LATEST_VERSION}");
    }
    Ok(applied)
}
