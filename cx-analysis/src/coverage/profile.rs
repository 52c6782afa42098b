//! Coverage profile ingestion.
//!
//! Two input shapes: the line-based text profile (`mode:` header, then
//! `path:sl.sc,el.ec numStmt count` lines) and the binary directory
//! layout (`covmeta.*` + `covcounters.*` files, optionally one
//! subdirectory per test), which is converted to text with
//! `go tool covdata textfmt` before parsing.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::warn;

use cx_core::errors::CoverageError;
use cx_core::model::coverage::CoverageBlock;

/// What a coverage input path turned out to contain.
#[derive(Debug, Clone)]
pub enum CoverageLayout {
    /// A single text profile file.
    TextProfile(PathBuf),
    /// One directory of covmeta/covcounters files.
    BinaryDir(PathBuf),
    /// A parent directory with one binary subdirectory per test.
    PerTestDirs(Vec<(String, PathBuf)>),
}

/// Classify a coverage input path.
pub fn detect_layout(path: &Path) -> Result<CoverageLayout, CoverageError> {
    if path.is_file() {
        return Ok(CoverageLayout::TextProfile(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(CoverageError::InvalidInput {
            message: format!("coverage input '{}' does not exist", path.display()),
        });
    }

    if has_covmeta(path)? {
        return Ok(CoverageLayout::BinaryDir(path.to_path_buf()));
    }

    let mut per_test = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let sub = entry.path();
        if sub.is_dir() && has_covmeta(&sub)? {
            let name = entry.file_name().to_string_lossy().to_string();
            per_test.push((name, sub));
        }
    }
    if per_test.is_empty() {
        return Err(CoverageError::InvalidInput {
            message: format!(
                "'{}' holds neither covmeta files nor per-test subdirectories",
                path.display()
            ),
        });
    }
    per_test.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(CoverageLayout::PerTestDirs(per_test))
}

fn has_covmeta(dir: &Path) -> Result<bool, CoverageError> {
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        if name.to_string_lossy().starts_with("covmeta.") {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Convert one binary coverage directory to blocks via
/// `go tool covdata textfmt`.
pub fn convert_binary_dir(dir: &Path) -> Result<Vec<CoverageBlock>, CoverageError> {
    let tmp = tempfile::NamedTempFile::new()?;
    let output = Command::new("go")
        .args(["tool", "covdata", "textfmt"])
        .arg(format!("-i={}", dir.display()))
        .arg(format!("-o={}", tmp.path().display()))
        .output()
        .map_err(|e| CoverageError::ConversionFailed {
            message: format!("spawn go tool covdata: {e}"),
        })?;

    if !output.status.success() {
        return Err(CoverageError::ConversionFailed {
            message: format!(
                "go tool covdata textfmt on '{}': {}",
                dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let text = std::fs::read_to_string(tmp.path())?;
    parse_profile_str(&text)
}

/// Parse a text profile from a file.
pub fn parse_profile_file(path: &Path) -> Result<Vec<CoverageBlock>, CoverageError> {
    let text = std::fs::read_to_string(path)?;
    parse_profile_str(&text)
}

/// Parse a text profile. The first non-empty line must be a `mode:`
/// header; malformed block lines are logged and skipped so one bad line
/// cannot halt an import.
pub fn parse_profile_str(input: &str) -> Result<Vec<CoverageBlock>, CoverageError> {
    let mut lines = input.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or_else(|| CoverageError::InvalidInput {
        message: "empty coverage profile".to_string(),
    })?;
    let mode = header
        .strip_prefix("mode:")
        .map(str::trim)
        .ok_or_else(|| CoverageError::InvalidInput {
            message: format!("missing 'mode:' header, got '{header}'"),
        })?;
    if !matches!(mode, "set" | "count" | "atomic") {
        return Err(CoverageError::InvalidInput {
            message: format!("unknown coverage mode '{mode}'"),
        });
    }

    let mut blocks = Vec::new();
    for line in lines {
        match parse_block_line(line) {
            Some(block) => blocks.push(block),
            None => warn!("skipping malformed coverage line: {line}"),
        }
    }
    Ok(blocks)
}

/// One block line: `path:startLine.startCol,endLine.endCol numStmt count`.
fn parse_block_line(line: &str) -> Option<CoverageBlock> {
    let (file, rest) = line.rsplit_once(':')?;
    let mut parts = rest.split_whitespace();
    let range = parts.next()?;
    let num_stmt: u32 = parts.next()?.parse().ok()?;
    let count: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let (start, end) = range.split_once(',')?;
    let (start_line, start_col) = parse_position(start)?;
    let (end_line, end_col) = parse_position(end)?;

    Some(CoverageBlock {
        file: file.to_string(),
        start_line,
        start_col,
        end_line,
        end_col,
        num_stmt,
        count,
    })
}

fn parse_position(s: &str) -> Option<(u32, u32)> {
    let (line, col) = s.split_once('.')?;
    Some((line.parse().ok()?, col.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_block_line() {
        let profile = "mode: set\n\
            github.com/user/project/internal/auth/login.go:45.1,67.2 5 1\n";
        let blocks = parse_profile_str(profile).unwrap();
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.file, "github.com/user/project/internal/auth/login.go");
        assert_eq!((b.start_line, b.start_col), (45, 1));
        assert_eq!((b.end_line, b.end_col), (67, 2));
        assert_eq!(b.num_stmt, 5);
        assert_eq!(b.count, 1);
        assert!(b.is_covered());
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let profile = "mode: count\n\
            good.go:1.1,2.2 1 3\n\
            not a coverage line\n\
            also/bad.go:1.1 2\n\
            good.go:3.1,4.2 1 0\n";
        let blocks = parse_profile_str(profile).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(!blocks[1].is_covered());
    }

    #[test]
    fn missing_mode_header_is_invalid() {
        assert!(matches!(
            parse_profile_str("foo.go:1.1,2.2 1 1\n"),
            Err(CoverageError::InvalidInput { .. })
        ));
        assert!(matches!(
            parse_profile_str("mode: bogus\n"),
            Err(CoverageError::InvalidInput { .. })
        ));
        assert!(matches!(
            parse_profile_str(""),
            Err(CoverageError::InvalidInput { .. })
        ));
    }
}
