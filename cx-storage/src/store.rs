//! `Store` — the single owner of on-disk state.
//!
//! Wraps `DatabaseManager` (read/write routing). All reads go through
//! `with_reader()`, all writes through `with_writer()` or
//! `with_transaction()`; no code outside this crate touches a raw
//! `&Connection` for store operations.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use cx_core::config::SearchConfig;
use cx_core::errors::StorageError;
use cx_core::model::coverage::{EntityCoverage, TestEntityLink};
use cx_core::model::dependency::Dependency;
use cx_core::model::entity::{Entity, EntityFilter, EntityPatch};
use cx_core::model::metrics::EntityMetrics;

use crate::connection::DatabaseManager;
use crate::queries;
use crate::queries::embeddings::{EmbeddingRow, SimilarHit};
use crate::search::{self, SearchHit};
use crate::staging::{self, StageResult};
use crate::versioning::{self, CommitInfo, CommitStats, DiffFilter, HistoryEntry, TableDiff};

/// Aggregate counts for status reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StoreStats {
    pub active_entities: i64,
    pub archived_entities: i64,
    pub dependencies: i64,
    pub commits: i64,
    pub mapped_tests: i64,
}

/// The versioned store rooted at one directory.
pub struct Store {
    db: DatabaseManager,
}

impl Store {
    /// Open (creating if needed) the store under `dir`. Schema creation is
    /// idempotent; the handle releases all connections on drop.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let db = DatabaseManager::open(&dir.join("cortex.db"))?;
        Ok(Self { db })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            db: DatabaseManager::open_in_memory()?,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    // ─── Entities ───────────────────────────────────────────────────────

    pub fn insert_entity(&self, entity: &Entity) -> Result<(), StorageError> {
        self.db.with_writer(|c| queries::entities::insert(c, entity))
    }

    pub fn bulk_insert_entities(&self, entities: &[Entity]) -> Result<usize, StorageError> {
        self.db
            .with_transaction(|c| queries::entities::bulk_insert(c, entities))
    }

    pub fn get_entity(&self, id: &str) -> Result<Entity, StorageError> {
        self.db.with_reader(|c| queries::entities::get(c, id))
    }

    pub fn query_entities(&self, filter: &EntityFilter) -> Result<Vec<Entity>, StorageError> {
        self.db.with_reader(|c| queries::entities::query(c, filter))
    }

    pub fn count_entities(&self, filter: &EntityFilter) -> Result<i64, StorageError> {
        self.db.with_reader(|c| queries::entities::count(c, filter))
    }

    pub fn update_entity(&self, id: &str, patch: &EntityPatch) -> Result<(), StorageError> {
        self.db
            .with_writer(|c| queries::entities::update(c, id, patch))
    }

    pub fn archive_entity(&self, id: &str) -> Result<(), StorageError> {
        self.db.with_writer(|c| queries::entities::archive(c, id))
    }

    pub fn delete_entities_by_file(&self, file_path: &str) -> Result<usize, StorageError> {
        self.db
            .with_writer(|c| queries::entities::delete_by_file(c, file_path))
    }

    // ─── Dependencies ───────────────────────────────────────────────────

    pub fn insert_dependency(&self, dep: &Dependency) -> Result<(), StorageError> {
        self.db
            .with_writer(|c| queries::dependencies::insert(c, dep))
    }

    pub fn bulk_insert_dependencies(&self, deps: &[Dependency]) -> Result<usize, StorageError> {
        self.db
            .with_transaction(|c| queries::dependencies::bulk_insert(c, deps))
    }

    pub fn dependencies_from(&self, id: &str) -> Result<Vec<Dependency>, StorageError> {
        self.db
            .with_reader(|c| queries::dependencies::from_entity(c, id))
    }

    pub fn dependencies_to(&self, id: &str) -> Result<Vec<Dependency>, StorageError> {
        self.db
            .with_reader(|c| queries::dependencies::to_entity(c, id))
    }

    pub fn active_edges(&self) -> Result<Vec<Dependency>, StorageError> {
        self.db.with_reader(queries::dependencies::active_edges)
    }

    pub fn delete_dependencies_by_file(&self, file_path: &str) -> Result<usize, StorageError> {
        self.db
            .with_writer(|c| queries::dependencies::delete_by_file(c, file_path))
    }

    // ─── Staging (C3) ───────────────────────────────────────────────────

    /// Replace one file's entities and dependencies and record its scan
    /// hash, in a single transaction.
    pub fn stage_file(
        &self,
        file_path: &str,
        entities: &[Entity],
        dependencies: &[Dependency],
        scan_hash: &str,
        archive_mode: bool,
    ) -> Result<StageResult, StorageError> {
        self.db.with_transaction(|c| {
            staging::stage_file(c, file_path, entities, dependencies, scan_hash, archive_mode)
        })
    }

    // ─── File index (C2) ────────────────────────────────────────────────

    pub fn file_hash(&self, file_path: &str) -> Result<Option<String>, StorageError> {
        self.db
            .with_reader(|c| queries::file_index::get_hash(c, file_path))
    }

    pub fn all_file_hashes(&self) -> Result<HashMap<String, String>, StorageError> {
        self.db.with_reader(queries::file_index::all_hashes)
    }

    pub fn upsert_file_hashes(&self, hashes: &HashMap<String, String>) -> Result<usize, StorageError> {
        self.db
            .with_transaction(|c| queries::file_index::upsert_bulk(c, hashes))
    }

    pub fn prune_stale_files(&self, valid_paths: &[String]) -> Result<usize, StorageError> {
        self.db
            .with_transaction(|c| queries::file_index::prune_stale(c, valid_paths))
    }

    // ─── Metrics (C5 persistence) ───────────────────────────────────────

    /// Persist a whole metrics pass atomically: readers see this pass or
    /// the previous one, never a mix.
    pub fn save_bulk_metrics(&self, metrics: &[EntityMetrics]) -> Result<usize, StorageError> {
        self.db
            .with_transaction(|c| queries::metrics::save_bulk(c, metrics))
    }

    pub fn get_metrics(&self, entity_id: &str) -> Result<EntityMetrics, StorageError> {
        self.db.with_reader(|c| queries::metrics::get(c, entity_id))
    }

    pub fn all_metrics(&self) -> Result<Vec<EntityMetrics>, StorageError> {
        self.db.with_reader(queries::metrics::all_active)
    }

    pub fn top_by_pagerank(&self, limit: usize) -> Result<Vec<EntityMetrics>, StorageError> {
        self.db
            .with_reader(|c| queries::metrics::top_by_pagerank(c, limit))
    }

    // ─── Coverage (C7 persistence) ──────────────────────────────────────

    pub fn upsert_coverage(&self, cov: &EntityCoverage) -> Result<(), StorageError> {
        self.db.with_writer(|c| queries::coverage::upsert(c, cov))
    }

    pub fn upsert_coverage_bulk(&self, rows: &[EntityCoverage]) -> Result<usize, StorageError> {
        self.db
            .with_transaction(|c| queries::coverage::upsert_bulk(c, rows))
    }

    /// Callers treat `NotFound` as "0% coverage" by convention.
    pub fn get_coverage(&self, entity_id: &str) -> Result<EntityCoverage, StorageError> {
        self.db
            .with_reader(|c| queries::coverage::get(c, entity_id))
    }

    pub fn all_coverage(&self) -> Result<Vec<EntityCoverage>, StorageError> {
        self.db.with_reader(queries::coverage::all_active)
    }

    /// Atomically rebuild the test→entity map.
    pub fn replace_test_map(&self, links: &[TestEntityLink]) -> Result<usize, StorageError> {
        self.db
            .with_transaction(|c| queries::test_map::replace_all(c, links))
    }

    pub fn tests_covering(&self, entity_id: &str) -> Result<Vec<(String, String)>, StorageError> {
        self.db
            .with_reader(|c| queries::test_map::tests_covering(c, entity_id))
    }

    pub fn entities_for_test(&self, test_name: &str) -> Result<Vec<String>, StorageError> {
        self.db
            .with_reader(|c| queries::test_map::entities_for_test(c, test_name))
    }

    // ─── Versioning (C1 snapshot/diff/history) ──────────────────────────

    /// Snapshot the current entities and dependencies as a new commit.
    pub fn commit(&self, message: &str, committer: &str) -> Result<String, StorageError> {
        let hash = self
            .db
            .with_transaction(|c| versioning::commit(c, message, committer))?;
        info!("committed snapshot {hash}");
        Ok(hash)
    }

    pub fn diff(
        &self,
        from_ref: &str,
        to_ref: &str,
        table: &str,
        filter: &DiffFilter,
    ) -> Result<TableDiff, StorageError> {
        self.db
            .with_reader(|c| versioning::diff(c, from_ref, to_ref, table, filter))
    }

    pub fn log(&self, limit: usize) -> Result<Vec<CommitInfo>, StorageError> {
        self.db.with_reader(|c| versioning::log(c, limit))
    }

    pub fn log_stats(&self, reference: &str) -> Result<CommitStats, StorageError> {
        self.db
            .with_reader(|c| versioning::log_stats(c, reference))
    }

    pub fn entity_history(
        &self,
        entity_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        self.db
            .with_reader(|c| versioning::entity_history(c, entity_id, limit))
    }

    pub fn resolve_ref(&self, reference: &str) -> Result<Option<String>, StorageError> {
        self.db
            .with_reader(|c| versioning::resolve_ref(c, reference))
    }

    // ─── Search (C6) ────────────────────────────────────────────────────

    pub fn reindex_search(&self) -> Result<usize, StorageError> {
        self.db.with_writer(search::reindex)
    }

    pub fn search(
        &self,
        query: &str,
        limit: usize,
        config: &SearchConfig,
    ) -> Result<Vec<SearchHit>, StorageError> {
        self.db
            .with_reader(|c| search::search(c, query, limit, config))
    }

    // ─── Embeddings (C9) ────────────────────────────────────────────────

    pub fn save_embedding(
        &self,
        entity_id: &str,
        vector: &[f32],
        model_version: &str,
        content_hash: &str,
    ) -> Result<(), StorageError> {
        self.db.with_transaction(|c| {
            queries::embeddings::save(c, entity_id, vector, model_version, content_hash)
        })
    }

    pub fn get_embedding(&self, entity_id: &str) -> Result<Option<EmbeddingRow>, StorageError> {
        self.db
            .with_reader(|c| queries::embeddings::get(c, entity_id))
    }

    pub fn find_similar(&self, query: &[f32], k: usize) -> Result<Vec<SimilarHit>, StorageError> {
        self.db
            .with_reader(|c| queries::embeddings::find_similar(c, query, k))
    }

    pub fn needs_embedding(&self, model_version: &str) -> Result<Vec<String>, StorageError> {
        self.db
            .with_reader(|c| queries::embeddings::needs_embedding(c, model_version))
    }

    /// Time-travel read: the embedding as of a resolved ref. `None` when
    /// the ref has insufficient history or nothing was stored yet.
    pub fn embedding_at(
        &self,
        entity_id: &str,
        reference: &str,
    ) -> Result<Option<EmbeddingRow>, StorageError> {
        self.db.with_reader(|c| {
            let Some(hash) = versioning::resolve_ref(c, reference)? else {
                return Ok(None);
            };
            let commit_time: String = c
                .query_row(
                    "SELECT created_at FROM commits WHERE hash = ?1",
                    rusqlite::params![hash],
                    |row| row.get(0),
                )
                .map_err(crate::sq)?;
            queries::embeddings::get_at_time(c, entity_id, &commit_time)
        })
    }

    // ─── Status ─────────────────────────────────────────────────────────

    pub fn stats(&self) -> Result<StoreStats, StorageError> {
        self.db.with_reader(|c| {
            let one = |sql: &str| -> Result<i64, StorageError> {
                c.query_row(sql, [], |row| row.get(0)).map_err(crate::sq)
            };
            Ok(StoreStats {
                active_entities: one("SELECT COUNT(*) FROM entities WHERE status = 'active'")?,
                archived_entities: one("SELECT COUNT(*) FROM entities WHERE status = 'archived'")?,
                dependencies: one("SELECT COUNT(*) FROM dependencies")?,
                commits: one("SELECT COUNT(*) FROM commits")?,
                mapped_tests: one("SELECT COUNT(DISTINCT test_name) FROM test_entity_map")?,
            })
        })
    }

    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.db.checkpoint()
    }
}
