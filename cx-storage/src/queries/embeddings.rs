//! Embedding storage: replace-on-write current rows, append-only history
//! for time-travel, linear cosine top-K search.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use cx_core::errors::StorageError;

use super::entities::parse_dt;
use super::OptionalRow;
use crate::sq;

/// One stored embedding.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRow {
    pub entity_id: String,
    pub vector: Vec<f32>,
    pub model_version: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A similarity hit from `find_similar`.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarHit {
    pub entity_id: String,
    pub similarity: f64,
}

/// Replace the current embedding for an entity and append a history row.
pub fn save(
    conn: &Connection,
    entity_id: &str,
    vector: &[f32],
    model_version: &str,
    content_hash: &str,
) -> Result<(), StorageError> {
    let blob = encode_vector(vector);
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO entity_embeddings
            (entity_id, vector, dims, model_version, content_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![entity_id, blob, vector.len() as i64, model_version, content_hash, now],
    )
    .map_err(sq)?;
    conn.execute(
        "INSERT INTO embedding_history
            (entity_id, vector, dims, model_version, content_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![entity_id, blob, vector.len() as i64, model_version, content_hash, now],
    )
    .map_err(sq)?;
    Ok(())
}

/// Current embedding for an entity.
pub fn get(conn: &Connection, entity_id: &str) -> Result<Option<EmbeddingRow>, StorageError> {
    conn.query_row(
        "SELECT entity_id, vector, model_version, content_hash, created_at
         FROM entity_embeddings WHERE entity_id = ?1",
        params![entity_id],
        row_to_embedding,
    )
    .optional()
    .map_err(sq)
}

/// Linear pass over all stored vectors, cosine similarity, top-K
/// descending. Degenerate vectors (zero norm, length mismatch) score 0.
pub fn find_similar(
    conn: &Connection,
    query: &[f32],
    k: usize,
) -> Result<Vec<SimilarHit>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT entity_id, vector FROM entity_embeddings")
        .map_err(sq)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })
        .map_err(sq)?;

    let mut hits = Vec::new();
    for row in rows {
        let (entity_id, blob) = row.map_err(sq)?;
        let vector = decode_vector(&blob);
        let similarity = cosine(query, &vector);
        hits.push(SimilarHit {
            entity_id,
            similarity,
        });
    }

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(k);
    Ok(hits)
}

/// Ids of active entities with no embedding or a different model version.
pub fn needs_embedding(
    conn: &Connection,
    model_version: &str,
) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT e.id FROM entities e
             LEFT JOIN entity_embeddings emb ON emb.entity_id = e.id
             WHERE e.status = 'active'
               AND (emb.entity_id IS NULL OR emb.model_version != ?1)
             ORDER BY e.id",
        )
        .map_err(sq)?;
    let rows = stmt
        .query_map(params![model_version], |row| row.get(0))
        .map_err(sq)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sq)
}

/// Newest history row at or before the given instant (time-travel read;
/// the instant comes from a resolved commit).
pub fn get_at_time(
    conn: &Connection,
    entity_id: &str,
    before: &str,
) -> Result<Option<EmbeddingRow>, StorageError> {
    conn.query_row(
        "SELECT entity_id, vector, model_version, content_hash, created_at
         FROM embedding_history
         WHERE entity_id = ?1 AND created_at <= ?2
         ORDER BY created_at DESC, history_id DESC
         LIMIT 1",
        params![entity_id, before],
        row_to_embedding,
    )
    .optional()
    .map_err(sq)
}

fn row_to_embedding(row: &rusqlite::Row<'_>) -> Result<EmbeddingRow, rusqlite::Error> {
    let blob: Vec<u8> = row.get(1)?;
    let created_at_str: String = row.get(4)?;
    Ok(EmbeddingRow {
        entity_id: row.get(0)?,
        vector: decode_vector(&blob),
        model_version: row.get(2)?,
        content_hash: row.get(3)?,
        created_at: parse_dt(&created_at_str)?,
    })
}

/// Little-endian f32 packing.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity; 0 for mismatched lengths or zero-norm inputs.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
        norm_a += *x as f64 * *x as f64;
        norm_b += *y as f64 * *y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
