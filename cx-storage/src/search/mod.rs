//! Full-text search over entities: FTS5 retrieval, BM25 normalization,
//! PageRank blending, exact-name boost.

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use cx_core::config::SearchConfig;
use cx_core::errors::StorageError;

use crate::sq;

/// Words too generic to discriminate code searches. A query that is all
/// stopwords falls back to its first original token.
const CODE_STOPWORDS: &[&str] = &[
    "code", "source", "file", "function", "method", "class", "implement", "feature", "new",
    "existing", "current", "project", "codebase", "logic", "system", "module", "component",
];

/// One ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub entity_id: String,
    pub name: String,
    pub entity_type: String,
    pub file_path: String,
    pub line_start: u32,
    /// Normalized textual score in [0, 1).
    pub fts_score: f64,
    pub pagerank: f64,
    pub combined_score: f64,
    pub snippet: Option<String>,
}

/// Rebuild the FTS index from active entities. Idempotent: a full
/// delete-and-repopulate.
pub fn reindex(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM entity_fts", []).map_err(sq)?;
    let inserted = conn
        .execute(
            "INSERT INTO entity_fts (id, name, body_text, doc_comment, file_path)
             SELECT id, name, COALESCE(body_text, ''), COALESCE(doc_comment, ''), file_path
             FROM entities WHERE status = 'active'",
            [],
        )
        .map_err(sq)?;
    debug!("reindexed {inserted} entities into fts");
    Ok(inserted)
}

/// Search active entities. Results are non-increasing in combined score
/// and truncated to `limit` after threshold filtering.
pub fn search(
    conn: &Connection,
    query: &str,
    limit: usize,
    config: &SearchConfig,
) -> Result<Vec<SearchHit>, StorageError> {
    let original = query.trim();
    if original.is_empty() {
        return Err(StorageError::InvalidInput {
            message: "empty search query".to_string(),
        });
    }

    let match_expr = match build_match_expr(original) {
        Some(expr) => expr,
        None => return Ok(Vec::new()),
    };

    let candidate_cap = (limit.max(1) * 3) as i64;
    let mut stmt = conn
        .prepare(
            "SELECT entity_fts.id, e.name, e.entity_type, e.file_path, e.line_start,
                    bm25(entity_fts) AS score,
                    COALESCE(m.pagerank, 0.0),
                    COALESCE(e.doc_comment, e.signature)
             FROM entity_fts
             JOIN entities e ON e.id = entity_fts.id AND e.status = 'active'
             LEFT JOIN entity_metrics m ON m.entity_id = entity_fts.id
             WHERE entity_fts MATCH ?1
             ORDER BY score
             LIMIT ?2",
        )
        .map_err(sq)?;

    let rows = stmt
        .query_map(params![match_expr, candidate_cap], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })
        .map_err(sq)?;

    let mut hits = Vec::new();
    for row in rows {
        let (entity_id, name, entity_type, file_path, line_start, bm25, pagerank, snippet) =
            row.map_err(sq)?;

        // FTS5's bm25() is better-is-more-negative; flip it positive then
        // shape into [0, 1) so excellent matches approach 1.
        let raw = (-bm25).max(0.0);
        let fts_score = raw / (raw + 5.0);
        let mut combined = config.boost_fts * fts_score + config.boost_pagerank * pagerank;
        if name.eq_ignore_ascii_case(original) {
            combined *= config.boost_exact_name;
        }

        if combined >= config.min_combined_score {
            hits.push(SearchHit {
                entity_id,
                name,
                entity_type,
                file_path,
                line_start,
                fts_score,
                pagerank,
                combined_score: combined,
                snippet: snippet.map(|s| s.lines().next().unwrap_or("").to_string()),
            });
        }
    }

    hits.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    hits.truncate(limit);
    Ok(hits)
}

/// Shape a user query into an FTS5 MATCH expression: sanitized tokens,
/// stopwords dropped, prefix match per token, OR-joined. All-stopword
/// queries fall back to the first original token.
pub fn build_match_expr(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(sanitize_token)
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return None;
    }

    let surviving: Vec<&String> = tokens
        .iter()
        .filter(|t| !CODE_STOPWORDS.contains(&t.to_lowercase().as_str()))
        .collect();

    let chosen: Vec<&String> = if surviving.is_empty() {
        vec![&tokens[0]]
    } else {
        surviving
    };

    Some(
        chosen
            .iter()
            .map(|t| format!("{t}*"))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

/// Strip FTS5 operator characters; keep word characters only.
fn sanitize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
