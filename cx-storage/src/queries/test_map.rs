//! The test→entity attribution map. Rebuilt in bulk on per-test coverage
//! import; read-only otherwise.

use rusqlite::{params, Connection};

use cx_core::errors::StorageError;
use cx_core::model::coverage::TestEntityLink;

use crate::sq;

/// Wholly replace the map. Caller wraps in a transaction so the rebuild
/// is atomic.
pub fn replace_all(conn: &Connection, links: &[TestEntityLink]) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM test_entity_map", []).map_err(sq)?;
    let mut stmt = conn
        .prepare(
            "INSERT OR IGNORE INTO test_entity_map (test_file, test_name, entity_id)
             VALUES (?1, ?2, ?3)",
        )
        .map_err(sq)?;
    for link in links {
        stmt.execute(params![link.test_file, link.test_name, link.entity_id])
            .map_err(sq)?;
    }
    Ok(links.len())
}

/// Tests covering a given entity, as `(test_file, test_name)` pairs.
pub fn tests_covering(
    conn: &Connection,
    entity_id: &str,
) -> Result<Vec<(String, String)>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT test_file, test_name FROM test_entity_map
             WHERE entity_id = ?1 ORDER BY test_file, test_name",
        )
        .map_err(sq)?;
    let rows = stmt
        .query_map(params![entity_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

/// Entities exercised by a given test.
pub fn entities_for_test(
    conn: &Connection,
    test_name: &str,
) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT entity_id FROM test_entity_map WHERE test_name = ?1 ORDER BY entity_id")
        .map_err(sq)?;
    let rows = stmt
        .query_map(params![test_name], |row| row.get(0))
        .map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM test_entity_map", [], |row| row.get(0))
        .map_err(sq)
}
