//! Dependency edge operations. Composite key `(from_id, to_id, dep_type)`;
//! re-inserting an existing triple only refreshes `created_at`.

use rusqlite::{params, Connection};

use cx_core::errors::StorageError;
use cx_core::model::dependency::{DepType, Dependency};

use super::entities::parse_dt;
use crate::sq;

/// Idempotent insert.
pub fn insert(conn: &Connection, dep: &Dependency) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO dependencies (from_id, to_id, dep_type, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (from_id, to_id, dep_type) DO UPDATE SET created_at = excluded.created_at",
        params![
            dep.from_id,
            dep.to_id,
            dep.dep_type.as_str(),
            dep.created_at.to_rfc3339(),
        ],
    )
    .map_err(sq)?;
    Ok(())
}

/// Bulk insert. Caller wraps in a transaction.
pub fn bulk_insert(conn: &Connection, deps: &[Dependency]) -> Result<usize, StorageError> {
    for dep in deps {
        insert(conn, dep)?;
    }
    Ok(deps.len())
}

/// Outgoing edges of an entity.
pub fn from_entity(conn: &Connection, from_id: &str) -> Result<Vec<Dependency>, StorageError> {
    edges_where(conn, "from_id = ?1", from_id)
}

/// Incoming edges of an entity.
pub fn to_entity(conn: &Connection, to_id: &str) -> Result<Vec<Dependency>, StorageError> {
    edges_where(conn, "to_id = ?1", to_id)
}

fn edges_where(conn: &Connection, clause: &str, arg: &str) -> Result<Vec<Dependency>, StorageError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT from_id, to_id, dep_type, created_at FROM dependencies WHERE {clause}"
        ))
        .map_err(sq)?;
    let rows = stmt.query_map(params![arg], row_to_dependency).map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

/// All edges between currently-active entities, for graph construction.
pub fn active_edges(conn: &Connection) -> Result<Vec<Dependency>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT d.from_id, d.to_id, d.dep_type, d.created_at
             FROM dependencies d
             JOIN entities ef ON ef.id = d.from_id AND ef.status = 'active'
             JOIN entities et ON et.id = d.to_id AND et.status = 'active'",
        )
        .map_err(sq)?;
    let rows = stmt.query_map([], row_to_dependency).map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

/// Remove edges whose *source* entity currently lives in the given file.
pub fn delete_by_file(conn: &Connection, file_path: &str) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM dependencies WHERE from_id IN
            (SELECT id FROM entities WHERE file_path = ?1)",
        params![file_path],
    )
    .map_err(sq)
}

pub fn count(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM dependencies", [], |row| row.get(0))
        .map_err(sq)
}

fn row_to_dependency(row: &rusqlite::Row<'_>) -> Result<Dependency, rusqlite::Error> {
    let dep_type_str: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    Ok(Dependency {
        from_id: row.get(0)?,
        to_id: row.get(1)?,
        dep_type: DepType::parse(&dep_type_str).unwrap_or(DepType::Calls),
        created_at: parse_dt(&created_at_str)?,
    })
}
