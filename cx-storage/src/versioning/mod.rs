//! Snapshot/commit operations: commit, diff, log, per-entity history.
//!
//! A commit copies the current entities and dependencies into the version
//! tables under a new hash and advances `HEAD`. Diffs and history are
//! computed from those copies, never from live tables.

pub mod refs;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use cx_core::errors::StorageError;
use cx_core::model::entity::EntityType;

use crate::queries::OptionalRow;
use crate::sq;

pub use refs::{resolve_ref, validate_ref};

/// One commit in the log.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub parent: Option<String>,
    pub committer: String,
    pub message: String,
    pub created_at: String,
}

/// Table sizes as of one commit.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommitStats {
    pub entities: i64,
    pub dependencies: i64,
}

/// One changed entity in a diff. `old_sig_hash`/`new_sig_hash` are both
/// populated for modified rows, one-sided for added/removed.
#[derive(Debug, Clone, Serialize)]
pub struct EntityChange {
    pub entity_id: String,
    pub name: String,
    pub entity_type: String,
    pub file_path: String,
    pub line_start: u32,
    pub old_sig_hash: Option<String>,
    pub new_sig_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityDiff {
    pub added: Vec<EntityChange>,
    pub modified: Vec<EntityChange>,
    pub removed: Vec<EntityChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyChange {
    pub from_id: String,
    pub to_id: String,
    pub dep_type: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyDiff {
    pub added: Vec<DependencyChange>,
    pub removed: Vec<DependencyChange>,
}

/// Diff of one table between two refs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableDiff {
    Entities(EntityDiff),
    Dependencies(DependencyDiff),
}

/// Optional narrowing of an entity diff.
#[derive(Debug, Clone, Default)]
pub struct DiffFilter {
    pub file_path: Option<String>,
    pub entity_type: Option<EntityType>,
}

/// How an entity changed between adjacent history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Current,
    SignatureChanged,
    BodyChanged,
    Moved,
    Unchanged,
    Added,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::SignatureChanged => "signature_changed",
            Self::BodyChanged => "body_changed",
            Self::Moved => "moved",
            Self::Unchanged => "unchanged",
            Self::Added => "added",
        }
    }
}

/// One entry of an entity's history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub commit_hash: String,
    pub commit_time: String,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: Option<u32>,
    pub signature: String,
    pub sig_hash: String,
    pub body_hash: String,
    pub change_type: ChangeType,
}

/// Record a commit: copy current entities and dependencies into the
/// version tables, advance HEAD. Caller wraps in a transaction.
pub fn commit(
    conn: &Connection,
    message: &str,
    committer: &str,
) -> Result<String, StorageError> {
    let parent = head(conn)?;
    let created_at = Utc::now().to_rfc3339();

    let entity_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))
        .map_err(sq)?;
    let commit_seq: i64 = conn
        .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))
        .map_err(sq)?;

    let seed = format!(
        "{}|{}|{}|{}|{}",
        parent.as_deref().unwrap_or(""),
        committer,
        message,
        created_at,
        entity_count + commit_seq,
    );
    let hash = format!("{:016x}", xxh3_64(seed.as_bytes()));

    conn.execute(
        "INSERT INTO commits (hash, parent, committer, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![hash, parent, committer, message, created_at],
    )
    .map_err(sq)?;

    conn.execute(
        "INSERT INTO entity_versions
            (commit_hash, id, name, entity_type, kind, visibility, language,
             file_path, line_start, line_end, signature, sig_hash, body_hash, status)
         SELECT ?1, id, name, entity_type, kind, visibility, language,
                file_path, line_start, line_end, signature, sig_hash, body_hash, status
         FROM entities",
        params![hash],
    )
    .map_err(sq)?;

    conn.execute(
        "INSERT INTO dependency_versions (commit_hash, from_id, to_id, dep_type)
         SELECT ?1, from_id, to_id, dep_type FROM dependencies",
        params![hash],
    )
    .map_err(sq)?;

    conn.execute(
        "INSERT OR REPLACE INTO refs (name, commit_hash) VALUES ('HEAD', ?1)",
        params![hash],
    )
    .map_err(sq)?;

    Ok(hash)
}

fn head(conn: &Connection) -> Result<Option<String>, StorageError> {
    conn.query_row(
        "SELECT commit_hash FROM refs WHERE name = 'HEAD'",
        [],
        |row| row.get(0),
    )
    .optional()
    .map_err(sq)
}

/// Commit log, newest first.
pub fn log(conn: &Connection, limit: usize) -> Result<Vec<CommitInfo>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT hash, parent, committer, message, created_at
             FROM commits ORDER BY created_at DESC, hash LIMIT ?1",
        )
        .map_err(sq)?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(CommitInfo {
                hash: row.get(0)?,
                parent: row.get(1)?,
                committer: row.get(2)?,
                message: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

/// Entity/dependency counts as of one commit. Unresolvable refs count as
/// empty, consistent with the empty-diff convention.
pub fn log_stats(conn: &Connection, reference: &str) -> Result<CommitStats, StorageError> {
    let hash = match resolve_ref(conn, reference)? {
        Some(h) => h,
        None => {
            return Ok(CommitStats {
                entities: 0,
                dependencies: 0,
            })
        }
    };
    let entities: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM entity_versions WHERE commit_hash = ?1 AND status = 'active'",
            params![hash],
            |row| row.get(0),
        )
        .map_err(sq)?;
    let dependencies: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM dependency_versions WHERE commit_hash = ?1",
            params![hash],
            |row| row.get(0),
        )
        .map_err(sq)?;
    Ok(CommitStats {
        entities,
        dependencies,
    })
}

/// Diff one table between two refs. A ref with insufficient history
/// yields an empty diff, never an error.
pub fn diff(
    conn: &Connection,
    from_ref: &str,
    to_ref: &str,
    table: &str,
    filter: &DiffFilter,
) -> Result<TableDiff, StorageError> {
    let from = resolve_ref(conn, from_ref)?;
    let to = resolve_ref(conn, to_ref)?;

    match table {
        "entities" => {
            let (Some(from), Some(to)) = (from, to) else {
                return Ok(TableDiff::Entities(EntityDiff::default()));
            };
            diff_entities(conn, &from, &to, filter).map(TableDiff::Entities)
        }
        "dependencies" => {
            let (Some(from), Some(to)) = (from, to) else {
                return Ok(TableDiff::Dependencies(DependencyDiff::default()));
            };
            diff_dependencies(conn, &from, &to).map(TableDiff::Dependencies)
        }
        other => Err(StorageError::InvalidInput {
            message: format!("unknown diff table '{other}'"),
        }),
    }
}

#[derive(Debug, Clone)]
struct VersionRow {
    name: String,
    entity_type: String,
    file_path: String,
    line_start: u32,
    sig_hash: String,
    body_hash: String,
}

fn load_snapshot(
    conn: &Connection,
    commit_hash: &str,
    filter: &DiffFilter,
) -> Result<std::collections::HashMap<String, VersionRow>, StorageError> {
    let mut sql = "SELECT id, name, entity_type, file_path, line_start, sig_hash, body_hash
         FROM entity_versions WHERE commit_hash = ?1 AND status = 'active'"
        .to_string();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(commit_hash.to_string())];
    if let Some(ref file_path) = filter.file_path {
        sql.push_str(" AND file_path = ?2");
        args.push(Box::new(file_path.clone()));
    }
    if let Some(entity_type) = filter.entity_type {
        sql.push_str(&format!(" AND entity_type = ?{}", args.len() + 1));
        args.push(Box::new(entity_type.as_str().to_string()));
    }

    let mut stmt = conn.prepare(&sql).map_err(sq)?;
    let rows = stmt
        .query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    VersionRow {
                        name: row.get(1)?,
                        entity_type: row.get(2)?,
                        file_path: row.get(3)?,
                        line_start: row.get(4)?,
                        sig_hash: row.get(5)?,
                        body_hash: row.get(6)?,
                    },
                ))
            },
        )
        .map_err(sq)?;

    let mut out = std::collections::HashMap::new();
    for row in rows {
        let (id, v) = row.map_err(sq)?;
        out.insert(id, v);
    }
    Ok(out)
}

fn diff_entities(
    conn: &Connection,
    from: &str,
    to: &str,
    filter: &DiffFilter,
) -> Result<EntityDiff, StorageError> {
    let old = load_snapshot(conn, from, filter)?;
    let new = load_snapshot(conn, to, filter)?;

    let mut diff = EntityDiff::default();

    for (id, row) in &new {
        match old.get(id) {
            None => diff.added.push(EntityChange {
                entity_id: id.clone(),
                name: row.name.clone(),
                entity_type: row.entity_type.clone(),
                file_path: row.file_path.clone(),
                line_start: row.line_start,
                old_sig_hash: None,
                new_sig_hash: Some(row.sig_hash.clone()),
            }),
            Some(prev) => {
                let changed = prev.sig_hash != row.sig_hash
                    || prev.body_hash != row.body_hash
                    || prev.file_path != row.file_path
                    || prev.line_start != row.line_start;
                if changed {
                    diff.modified.push(EntityChange {
                        entity_id: id.clone(),
                        name: row.name.clone(),
                        entity_type: row.entity_type.clone(),
                        file_path: row.file_path.clone(),
                        line_start: row.line_start,
                        old_sig_hash: Some(prev.sig_hash.clone()),
                        new_sig_hash: Some(row.sig_hash.clone()),
                    });
                }
            }
        }
    }

    for (id, row) in &old {
        if !new.contains_key(id) {
            diff.removed.push(EntityChange {
                entity_id: id.clone(),
                name: row.name.clone(),
                entity_type: row.entity_type.clone(),
                file_path: row.file_path.clone(),
                line_start: row.line_start,
                old_sig_hash: Some(row.sig_hash.clone()),
                new_sig_hash: None,
            });
        }
    }

    // Deterministic ordering for consumers and tests.
    let by_id = |a: &EntityChange, b: &EntityChange| a.entity_id.cmp(&b.entity_id);
    diff.added.sort_by(by_id);
    diff.modified.sort_by(by_id);
    diff.removed.sort_by(by_id);
    Ok(diff)
}

fn diff_dependencies(
    conn: &Connection,
    from: &str,
    to: &str,
) -> Result<DependencyDiff, StorageError> {
    let load = |commit: &str| -> Result<std::collections::HashSet<(String, String, String)>, StorageError> {
        let mut stmt = conn
            .prepare(
                "SELECT from_id, to_id, dep_type FROM dependency_versions WHERE commit_hash = ?1",
            )
            .map_err(sq)?;
        let rows = stmt
            .query_map(params![commit], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(sq)?;
        rows.collect::<Result<_, _>>().map_err(sq)
    };

    let old = load(from)?;
    let new = load(to)?;

    let mut diff = DependencyDiff::default();
    for (from_id, to_id, dep_type) in new.difference(&old) {
        diff.added.push(DependencyChange {
            from_id: from_id.clone(),
            to_id: to_id.clone(),
            dep_type: dep_type.clone(),
        });
    }
    for (from_id, to_id, dep_type) in old.difference(&new) {
        diff.removed.push(DependencyChange {
            from_id: from_id.clone(),
            to_id: to_id.clone(),
            dep_type: dep_type.clone(),
        });
    }
    let key = |c: &DependencyChange| (c.from_id.clone(), c.to_id.clone(), c.dep_type.clone());
    diff.added.sort_by_key(key);
    diff.removed.sort_by_key(key);
    Ok(diff)
}

/// History of one entity across commits, newest first. Each entry's
/// change type comes from comparing its `(sig_hash, body_hash)` and
/// location to the next newer entry; the newest is `current`, the oldest
/// `added`.
pub fn entity_history(
    conn: &Connection,
    entity_id: &str,
    limit: usize,
) -> Result<Vec<HistoryEntry>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT ev.commit_hash, c.created_at, ev.file_path, ev.line_start, ev.line_end,
                    ev.signature, ev.sig_hash, ev.body_hash
             FROM entity_versions ev
             JOIN commits c ON c.hash = ev.commit_hash
             WHERE ev.id = ?1
             ORDER BY c.created_at DESC, c.hash DESC
             LIMIT ?2",
        )
        .map_err(sq)?;

    let rows = stmt
        .query_map(params![entity_id, limit as i64], |row| {
            Ok(HistoryEntry {
                commit_hash: row.get(0)?,
                commit_time: row.get(1)?,
                file_path: row.get(2)?,
                line_start: row.get(3)?,
                line_end: row.get(4)?,
                signature: row.get(5)?,
                sig_hash: row.get(6)?,
                body_hash: row.get(7)?,
                change_type: ChangeType::Unchanged,
            })
        })
        .map_err(sq)?;

    let mut entries: Vec<HistoryEntry> = rows.collect::<Result<Vec<_>, _>>().map_err(sq)?;

    let len = entries.len();
    let mut kinds = Vec::with_capacity(len);
    for i in 0..len {
        let kind = if i == 0 {
            // A single-entry history is both newest and oldest; current
            // wins and the add is implied.
            ChangeType::Current
        } else if i == len - 1 {
            ChangeType::Added
        } else {
            let newer = &entries[i - 1];
            let this = &entries[i];
            if this.sig_hash != newer.sig_hash {
                ChangeType::SignatureChanged
            } else if this.body_hash != newer.body_hash {
                ChangeType::BodyChanged
            } else if this.file_path != newer.file_path || this.line_start != newer.line_start {
                ChangeType::Moved
            } else {
                ChangeType::Unchanged
            }
        };
        kinds.push(kind);
    }
    for (entry, kind) in entries.iter_mut().zip(kinds) {
        entry.change_type = kind;
    }
    Ok(entries)
}
