//! File-scoped staging of extractor output: replace a file's entities and
//! dependencies and record its scan hash, atomically.

use rusqlite::Connection;
use tracing::debug;

use cx_core::errors::StorageError;
use cx_core::model::dependency::Dependency;
use cx_core::model::entity::Entity;

use crate::queries;

/// What one staged file produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageResult {
    pub entities_inserted: usize,
    pub dependencies_inserted: usize,
    pub entities_removed: usize,
}

/// Replace a file's rows inside an already-open transaction.
///
/// Order matters: edges are removed while their source entities still
/// exist, and new dependencies are inserted after new entities so the
/// snapshot is self-consistent. `archive_mode` soft-deletes the prior
/// rows instead of removing them.
pub fn stage_file(
    conn: &Connection,
    file_path: &str,
    entities: &[Entity],
    dependencies: &[Dependency],
    scan_hash: &str,
    archive_mode: bool,
) -> Result<StageResult, StorageError> {
    let mut result = StageResult::default();

    queries::dependencies::delete_by_file(conn, file_path)?;
    if archive_mode {
        result.entities_removed = queries::entities::archive_by_file(conn, file_path)?;
        // Re-appearing ids must overwrite their archived rows.
        result.entities_inserted = queries::entities::bulk_upsert(conn, entities)?;
    } else {
        result.entities_removed = queries::entities::delete_by_file(conn, file_path)?;
        result.entities_inserted = queries::entities::bulk_insert(conn, entities)?;
    }
    result.dependencies_inserted = queries::dependencies::bulk_insert(conn, dependencies)?;

    queries::file_index::upsert(conn, file_path, scan_hash)?;

    debug!(
        "staged {file_path}: +{} entities, +{} deps, -{} prior",
        result.entities_inserted, result.dependencies_inserted, result.entities_removed
    );
    Ok(result)
}
