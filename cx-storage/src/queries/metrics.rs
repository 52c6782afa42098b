//! Per-entity metrics rows, written back in bulk after a metrics pass.

use rusqlite::{params, Connection};

use cx_core::errors::StorageError;
use cx_core::model::metrics::EntityMetrics;

use super::entities::parse_dt;
use super::OptionalRow;
use crate::sq;

/// Replace-on-write save of a whole metrics pass. Caller wraps in a
/// transaction so readers never observe a partial mix of passes.
pub fn save_bulk(conn: &Connection, metrics: &[EntityMetrics]) -> Result<usize, StorageError> {
    let mut stmt = conn
        .prepare(
            "INSERT OR REPLACE INTO entity_metrics
                (entity_id, pagerank, in_degree, out_degree, betweenness, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(sq)?;
    for m in metrics {
        stmt.execute(params![
            m.entity_id,
            m.pagerank,
            m.in_degree,
            m.out_degree,
            m.betweenness,
            m.computed_at.to_rfc3339(),
        ])
        .map_err(sq)?;
    }
    Ok(metrics.len())
}

/// Metrics for one entity. Typed NotFound on miss.
pub fn get(conn: &Connection, entity_id: &str) -> Result<EntityMetrics, StorageError> {
    let result = conn
        .query_row(
            "SELECT entity_id, pagerank, in_degree, out_degree, betweenness, computed_at
             FROM entity_metrics WHERE entity_id = ?1",
            params![entity_id],
            row_to_metrics,
        )
        .optional()
        .map_err(sq)?;
    result.ok_or_else(|| StorageError::not_found("metrics", entity_id))
}

/// All metrics rows for active entities.
pub fn all_active(conn: &Connection) -> Result<Vec<EntityMetrics>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT m.entity_id, m.pagerank, m.in_degree, m.out_degree, m.betweenness, m.computed_at
             FROM entity_metrics m
             JOIN entities e ON e.id = m.entity_id AND e.status = 'active'",
        )
        .map_err(sq)?;
    let rows = stmt.query_map([], row_to_metrics).map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

/// Highest-ranked entities first.
pub fn top_by_pagerank(conn: &Connection, limit: usize) -> Result<Vec<EntityMetrics>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT m.entity_id, m.pagerank, m.in_degree, m.out_degree, m.betweenness, m.computed_at
             FROM entity_metrics m
             JOIN entities e ON e.id = m.entity_id AND e.status = 'active'
             ORDER BY m.pagerank DESC
             LIMIT ?1",
        )
        .map_err(sq)?;
    let rows = stmt
        .query_map(params![limit as i64], row_to_metrics)
        .map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

fn row_to_metrics(row: &rusqlite::Row<'_>) -> Result<EntityMetrics, rusqlite::Error> {
    let computed_at_str: String = row.get(5)?;
    Ok(EntityMetrics {
        entity_id: row.get(0)?,
        pagerank: row.get(1)?,
        in_degree: row.get(2)?,
        out_degree: row.get(3)?,
        betweenness: row.get(4)?,
        computed_at: parse_dt(&computed_at_str)?,
    })
}
