//! Incremental freshness predicates over the persisted file index.
//!
//! The index is advisory: losing it costs a full rescan, never
//! correctness.

use std::collections::HashMap;
use std::path::Path;

use cx_core::errors::ScanError;
use cx_core::ident;
use cx_storage::Store;

/// Content hash of a file on disk, in the file-index format.
pub fn hash_file(path: &Path) -> Result<String, ScanError> {
    let contents = std::fs::read(path)?;
    Ok(ident::file_hash(&contents))
}

/// Whether a file needs rescanning. Unknown paths always do.
pub fn is_file_changed(
    store: &Store,
    file_path: &str,
    new_hash: &str,
) -> Result<bool, ScanError> {
    match store.file_hash(file_path)? {
        None => Ok(true),
        Some(recorded) => Ok(recorded != new_hash),
    }
}

/// Bulk predicate: the subset of `path → hash` pairs needing a rescan,
/// in sorted order for deterministic scans.
pub fn changed_files(
    store: &Store,
    candidates: &HashMap<String, String>,
) -> Result<Vec<String>, ScanError> {
    let recorded = store.all_file_hashes()?;
    let mut changed: Vec<String> = candidates
        .iter()
        .filter(|(path, hash)| recorded.get(*path) != Some(*hash))
        .map(|(path, _)| path.clone())
        .collect();
    changed.sort();
    Ok(changed)
}

/// Drop index rows for paths no longer present. Returns the count pruned.
pub fn prune_stale(store: &Store, valid_paths: &[String]) -> Result<usize, ScanError> {
    Ok(store.prune_stale_files(valid_paths)?)
}
