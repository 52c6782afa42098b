//! Insert, get, query, update, archive, delete, count for entities.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use cx_core::errors::StorageError;
use cx_core::ident;
use cx_core::model::entity::{Entity, EntityFilter, EntityPatch, EntityStatus, EntityType, Visibility};

use super::OptionalRow;
use crate::sq;

const ENTITY_COLUMNS: &str = "id, name, entity_type, kind, visibility, language, file_path, \
     line_start, line_end, signature, sig_hash, body_hash, receiver, fields, \
     body_text, doc_comment, skeleton, status, created_at, updated_at";

/// Insert a single entity. Fails on duplicate id.
pub fn insert(conn: &Connection, entity: &Entity) -> Result<(), StorageError> {
    execute_insert(conn, entity, "INSERT").map(|_| ())
}

/// Bulk insert with `INSERT OR IGNORE` semantics keyed on id.
/// Caller wraps in a transaction; returns the number actually inserted.
pub fn bulk_insert(conn: &Connection, entities: &[Entity]) -> Result<usize, StorageError> {
    let mut inserted = 0;
    for entity in entities {
        inserted += execute_insert(conn, entity, "INSERT OR IGNORE")?;
    }
    Ok(inserted)
}

/// Bulk insert that overwrites existing rows (archive-mode staging, where
/// a re-appearing id must replace its archived row).
pub fn bulk_upsert(conn: &Connection, entities: &[Entity]) -> Result<usize, StorageError> {
    let mut inserted = 0;
    for entity in entities {
        inserted += execute_insert(conn, entity, "INSERT OR REPLACE")?;
    }
    Ok(inserted)
}

fn execute_insert(conn: &Connection, e: &Entity, verb: &str) -> Result<usize, StorageError> {
    let fields_json = e
        .fields
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(sq)?;
    conn.execute(
        &format!(
            "{verb} INTO entities ({ENTITY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
        ),
        params![
            e.id,
            e.name,
            e.entity_type.as_str(),
            e.kind,
            e.visibility.as_str(),
            e.language,
            e.file_path,
            e.line_start,
            e.line_end,
            e.signature,
            e.sig_hash,
            e.body_hash,
            e.receiver,
            fields_json,
            e.body_text,
            e.doc_comment,
            e.skeleton,
            e.status.as_str(),
            e.created_at.to_rfc3339(),
            e.updated_at.to_rfc3339(),
        ],
    )
    .map_err(sq)
}

/// Get a single entity by id. Typed NotFound on miss.
pub fn get(conn: &Connection, id: &str) -> Result<Entity, StorageError> {
    let result = conn
        .query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
            params![id],
            row_to_entity,
        )
        .optional()
        .map_err(sq)?;
    result.ok_or_else(|| StorageError::not_found("entity", id))
}

/// Query entities by filter. The default view is active-only.
pub fn query(conn: &Connection, filter: &EntityFilter) -> Result<Vec<Entity>, StorageError> {
    let mut sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    apply_filter(&mut sql, &mut args, filter);
    sql.push_str(" ORDER BY file_path, line_start");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        args.push(Box::new(limit as i64));
    }

    let mut stmt = conn.prepare(&sql).map_err(sq)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())), row_to_entity)
        .map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

/// Count entities matching a filter.
pub fn count(conn: &Connection, filter: &EntityFilter) -> Result<i64, StorageError> {
    let mut sql = "SELECT COUNT(*) FROM entities WHERE 1=1".to_string();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    apply_filter(&mut sql, &mut args, filter);

    conn.query_row(
        &sql,
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        |row| row.get(0),
    )
    .map_err(sq)
}

fn apply_filter(sql: &mut String, args: &mut Vec<Box<dyn rusqlite::ToSql>>, filter: &EntityFilter) {
    match filter.status {
        Some(status) => {
            sql.push_str(" AND status = ?");
            args.push(Box::new(status.as_str().to_string()));
        }
        None if !filter.include_archived => {
            sql.push_str(" AND status = 'active'");
        }
        None => {}
    }
    if let Some(entity_type) = filter.entity_type {
        sql.push_str(" AND entity_type = ?");
        args.push(Box::new(entity_type.as_str().to_string()));
    }
    if let Some(ref file_path) = filter.file_path {
        sql.push_str(" AND file_path = ?");
        args.push(Box::new(file_path.clone()));
    }
    if let Some(ref name_like) = filter.name_like {
        sql.push_str(" AND name LIKE ?");
        args.push(Box::new(format!("%{name_like}%")));
    }
    if let Some(ref language) = filter.language {
        sql.push_str(" AND language = ?");
        args.push(Box::new(language.clone()));
    }
}

/// Apply a partial update; hashes are recomputed for changed sources.
pub fn update(conn: &Connection, id: &str, patch: &EntityPatch) -> Result<(), StorageError> {
    let mut entity = get(conn, id)?;

    if let Some(ref signature) = patch.signature {
        entity.sig_hash = ident::sig_hash(signature);
        entity.signature = signature.clone();
    }
    if let Some(ref body) = patch.body_text {
        entity.body_hash = ident::body_hash(body.as_bytes());
        entity.body_text = Some(body.clone());
    }
    if let Some(ref doc) = patch.doc_comment {
        entity.doc_comment = Some(doc.clone());
    }
    if let Some(line_start) = patch.line_start {
        entity.line_start = line_start;
    }
    if let Some(line_end) = patch.line_end {
        entity.line_end = line_end;
    }
    if let Some(visibility) = patch.visibility {
        entity.visibility = visibility;
    }
    if let Some(status) = patch.status {
        entity.status = status;
    }
    entity.updated_at = Utc::now();

    let rows = conn
        .execute(
            "UPDATE entities SET
                signature = ?2, sig_hash = ?3, body_hash = ?4, body_text = ?5,
                doc_comment = ?6, line_start = ?7, line_end = ?8,
                visibility = ?9, status = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                id,
                entity.signature,
                entity.sig_hash,
                entity.body_hash,
                entity.body_text,
                entity.doc_comment,
                entity.line_start,
                entity.line_end,
                entity.visibility.as_str(),
                entity.status.as_str(),
                entity.updated_at.to_rfc3339(),
            ],
        )
        .map_err(sq)?;

    if rows == 0 {
        return Err(StorageError::not_found("entity", id));
    }
    Ok(())
}

/// Soft delete: the row stays addressable but leaves active views.
pub fn archive(conn: &Connection, id: &str) -> Result<(), StorageError> {
    let rows = conn
        .execute(
            "UPDATE entities SET status = 'archived', updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )
        .map_err(sq)?;
    if rows == 0 {
        return Err(StorageError::not_found("entity", id));
    }
    Ok(())
}

/// Hard delete all entities in a file. Returns rows removed.
pub fn delete_by_file(conn: &Connection, file_path: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM entities WHERE file_path = ?1", params![file_path])
        .map_err(sq)
}

/// Archive all entities in a file (archive-mode staging).
pub fn archive_by_file(conn: &Connection, file_path: &str) -> Result<usize, StorageError> {
    conn.execute(
        "UPDATE entities SET status = 'archived', updated_at = ?2 WHERE file_path = ?1",
        params![file_path, Utc::now().to_rfc3339()],
    )
    .map_err(sq)
}

pub(crate) fn row_to_entity(row: &rusqlite::Row<'_>) -> Result<Entity, rusqlite::Error> {
    let entity_type_str: String = row.get(2)?;
    let visibility_str: String = row.get(4)?;
    let fields_json: Option<String> = row.get(13)?;
    let status_str: String = row.get(17)?;
    let created_at_str: String = row.get(18)?;
    let updated_at_str: String = row.get(19)?;

    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        entity_type: EntityType::parse(&entity_type_str).unwrap_or(EntityType::Function),
        kind: row.get(3)?,
        visibility: Visibility::parse(&visibility_str),
        language: row.get(5)?,
        file_path: row.get(6)?,
        line_start: row.get(7)?,
        line_end: row.get(8)?,
        signature: row.get(9)?,
        sig_hash: row.get(10)?,
        body_hash: row.get(11)?,
        receiver: row.get(12)?,
        fields: fields_json.and_then(|s| serde_json::from_str(&s).ok()),
        body_text: row.get(14)?,
        doc_comment: row.get(15)?,
        skeleton: row.get(16)?,
        status: EntityStatus::parse(&status_str),
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

/// Parse a stored RFC3339 timestamp, surfacing corruption as a SQL
/// conversion failure instead of masking it.
pub(crate) fn parse_dt(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
