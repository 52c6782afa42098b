//! Ref validation and resolution.
//!
//! Every user string that parameterizes a versioned query passes through
//! `validate_ref` before any SQL is built. The character class is exact:
//! `[A-Za-z0-9_.\-/~^]+`.

use rusqlite::{params, Connection};

use cx_core::errors::StorageError;

use crate::queries::OptionalRow;
use crate::sq;

/// Reject anything outside the allowed ref character class.
pub fn validate_ref(reference: &str) -> Result<(), StorageError> {
    if reference.is_empty() {
        return Err(StorageError::InvalidRef {
            reference: reference.to_string(),
            reason: "empty ref".to_string(),
        });
    }
    if let Some(bad) = reference
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/' | '~' | '^')))
    {
        return Err(StorageError::InvalidRef {
            reference: reference.to_string(),
            reason: format!("illegal character '{bad}'"),
        });
    }
    Ok(())
}

/// Resolve a ref to a concrete commit hash.
///
/// Supports `HEAD`, `HEAD~N` (and `<ref>~N` generally), named refs, full
/// hashes, and unique short-hash prefixes. Insufficient history or an
/// unknown name resolves to `None`, never an error, so that diff/log on
/// a young repository degrade to empty results.
pub fn resolve_ref(conn: &Connection, reference: &str) -> Result<Option<String>, StorageError> {
    validate_ref(reference)?;

    let (base, back) = split_tilde(reference)?;
    let mut current = match resolve_base(conn, base)? {
        Some(hash) => hash,
        None => return Ok(None),
    };

    for _ in 0..back {
        match parent_of(conn, &current)? {
            Some(parent) => current = parent,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Split a trailing `~N` suffix. Bare `~` means one step.
fn split_tilde(reference: &str) -> Result<(&str, u32), StorageError> {
    match reference.rsplit_once('~') {
        None => Ok((reference, 0)),
        Some((base, "")) => Ok((base, 1)),
        Some((base, n)) => {
            let back = n.parse::<u32>().map_err(|_| StorageError::InvalidRef {
                reference: reference.to_string(),
                reason: format!("bad ancestry count '{n}'"),
            })?;
            Ok((base, back))
        }
    }
}

fn resolve_base(conn: &Connection, base: &str) -> Result<Option<String>, StorageError> {
    // Named refs first (HEAD lives here too).
    if let Some(hash) = lookup_named(conn, base)? {
        return Ok(Some(hash));
    }

    // Exact hash.
    let exact: Option<String> = conn
        .query_row(
            "SELECT hash FROM commits WHERE hash = ?1",
            params![base],
            |row| row.get(0),
        )
        .optional()
        .map_err(sq)?;
    if exact.is_some() {
        return Ok(exact);
    }

    // Unique short-hash prefix. Prefix matching with LIKE is safe here
    // because the ref already passed the character-class check.
    let mut stmt = conn
        .prepare("SELECT hash FROM commits WHERE hash LIKE ?1 LIMIT 2")
        .map_err(sq)?;
    let matches: Vec<String> = stmt
        .query_map(params![format!("{base}%")], |row| row.get(0))
        .map_err(sq)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sq)?;

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches.into_iter().next().unwrap())),
        _ => Err(StorageError::InvalidRef {
            reference: base.to_string(),
            reason: "ambiguous short hash".to_string(),
        }),
    }
}

fn lookup_named(conn: &Connection, name: &str) -> Result<Option<String>, StorageError> {
    conn.query_row(
        "SELECT commit_hash FROM refs WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .map_err(sq)
}

fn parent_of(conn: &Connection, hash: &str) -> Result<Option<String>, StorageError> {
    let parent: Option<Option<String>> = conn
        .query_row(
            "SELECT parent FROM commits WHERE hash = ?1",
            params![hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(sq)?;
    Ok(parent.flatten())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ref_character_class() {
        for ok in ["HEAD", "HEAD~3", "main", "v1.2.3", "feature/x-y", "abc123", "a^b"] {
            assert!(validate_ref(ok).is_ok(), "{ok} should validate");
        }
    }

    #[test]
    fn rejects_out_of_class_characters() {
        for bad in ["", "a b", "x;DROP", "a'b", "ref\"", "héad", "a%"] {
            assert!(validate_ref(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn tilde_splitting() {
        assert_eq!(split_tilde("HEAD~3").unwrap(), ("HEAD", 3));
        assert_eq!(split_tilde("HEAD~").unwrap(), ("HEAD", 1));
        assert_eq!(split_tilde("main").unwrap(), ("main", 0));
        assert!(split_tilde("HEAD~x").is_err());
    }
}
