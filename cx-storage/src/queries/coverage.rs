//! Per-entity coverage rows. Line arrays persist as JSON arrays of ints.

use rusqlite::{params, Connection};

use cx_core::errors::StorageError;
use cx_core::model::coverage::EntityCoverage;

use super::entities::parse_dt;
use super::OptionalRow;
use crate::sq;

/// Replace-on-write keyed by entity id.
pub fn upsert(conn: &Connection, cov: &EntityCoverage) -> Result<(), StorageError> {
    let covered = serde_json::to_string(&cov.covered_lines).map_err(sq)?;
    let uncovered = serde_json::to_string(&cov.uncovered_lines).map_err(sq)?;
    conn.execute(
        "INSERT OR REPLACE INTO entity_coverage
            (entity_id, coverage_percent, covered_lines, uncovered_lines, last_run)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            cov.entity_id,
            cov.coverage_percent,
            covered,
            uncovered,
            cov.last_run.to_rfc3339(),
        ],
    )
    .map_err(sq)?;
    Ok(())
}

/// Bulk upsert; caller wraps in a transaction.
pub fn upsert_bulk(conn: &Connection, rows: &[EntityCoverage]) -> Result<usize, StorageError> {
    for cov in rows {
        upsert(conn, cov)?;
    }
    Ok(rows.len())
}

/// Coverage for one entity. Callers treat NotFound as "0% coverage".
pub fn get(conn: &Connection, entity_id: &str) -> Result<EntityCoverage, StorageError> {
    let result = conn
        .query_row(
            "SELECT entity_id, coverage_percent, covered_lines, uncovered_lines, last_run
             FROM entity_coverage WHERE entity_id = ?1",
            params![entity_id],
            row_to_coverage,
        )
        .optional()
        .map_err(sq)?;
    result.ok_or_else(|| StorageError::not_found("coverage", entity_id))
}

/// All coverage rows for active entities.
pub fn all_active(conn: &Connection) -> Result<Vec<EntityCoverage>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT c.entity_id, c.coverage_percent, c.covered_lines, c.uncovered_lines, c.last_run
             FROM entity_coverage c
             JOIN entities e ON e.id = c.entity_id AND e.status = 'active'",
        )
        .map_err(sq)?;
    let rows = stmt.query_map([], row_to_coverage).map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

fn row_to_coverage(row: &rusqlite::Row<'_>) -> Result<EntityCoverage, rusqlite::Error> {
    let covered_json: String = row.get(2)?;
    let uncovered_json: String = row.get(3)?;
    let last_run_str: String = row.get(4)?;

    let parse_lines = |s: &str| -> Result<Vec<u32>, rusqlite::Error> {
        serde_json::from_str(s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
    };

    Ok(EntityCoverage {
        entity_id: row.get(0)?,
        coverage_percent: row.get(1)?,
        covered_lines: parse_lines(&covered_json)?,
        uncovered_lines: parse_lines(&uncovered_json)?,
        last_run: parse_dt(&last_run_str)?,
    })
}
