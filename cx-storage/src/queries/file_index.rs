//! The incremental file index: `file_path → (scan_hash, scanned_at)`.
//! Purely advisory; losing it forces a full rescan, nothing worse.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, Connection};

use cx_core::errors::StorageError;

use super::OptionalRow;
use crate::sq;

pub fn upsert(conn: &Connection, file_path: &str, scan_hash: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR REPLACE INTO file_index (file_path, scan_hash, scanned_at)
         VALUES (?1, ?2, ?3)",
        params![file_path, scan_hash, Utc::now().to_rfc3339()],
    )
    .map_err(sq)?;
    Ok(())
}

/// Bulk upsert. Caller wraps in a transaction so the "scan completed"
/// transition is atomic.
pub fn upsert_bulk(
    conn: &Connection,
    hashes: &HashMap<String, String>,
) -> Result<usize, StorageError> {
    let now = Utc::now().to_rfc3339();
    let mut stmt = conn
        .prepare(
            "INSERT OR REPLACE INTO file_index (file_path, scan_hash, scanned_at)
             VALUES (?1, ?2, ?3)",
        )
        .map_err(sq)?;
    for (path, hash) in hashes {
        stmt.execute(params![path, hash, now]).map_err(sq)?;
    }
    Ok(hashes.len())
}

/// The recorded hash for a path, if any.
pub fn get_hash(conn: &Connection, file_path: &str) -> Result<Option<String>, StorageError> {
    conn.query_row(
        "SELECT scan_hash FROM file_index WHERE file_path = ?1",
        params![file_path],
        |row| row.get(0),
    )
    .optional()
    .map_err(sq)
}

/// All recorded `path → hash` pairs.
pub fn all_hashes(conn: &Connection) -> Result<HashMap<String, String>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT file_path, scan_hash FROM file_index")
        .map_err(sq)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(sq)?;
    let mut out = HashMap::new();
    for row in rows {
        let (path, hash) = row.map_err(sq)?;
        out.insert(path, hash);
    }
    Ok(out)
}

/// Remove index rows for paths not in the current set. Returns the count
/// pruned. Caller wraps in a transaction.
pub fn prune_stale(conn: &Connection, valid_paths: &[String]) -> Result<usize, StorageError> {
    let existing = all_hashes(conn)?;
    let valid: std::collections::HashSet<&str> = valid_paths.iter().map(|s| s.as_str()).collect();
    let mut pruned = 0;
    for path in existing.keys() {
        if !valid.contains(path.as_str()) {
            pruned += conn
                .execute("DELETE FROM file_index WHERE file_path = ?1", params![path])
                .map_err(sq)?;
        }
    }
    Ok(pruned)
}
