//! Auto-detection of dependency/artifact directories worth excluding
//! from scans, driven by ecosystem marker files.

use std::path::Path;

use tracing::debug;

use cx_core::errors::ScanError;

/// Directory names never descended into, marker or not.
const HARD_SKIPS: &[&str] = &["vendor", "node_modules", "target"];

/// One excluded directory, relative to the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excluded {
    pub path: String,
    pub reason: String,
}

/// Walk `root` looking for marker files and collect their sibling
/// artifact directories:
///
/// - `Cargo.toml` → sibling `target/`
/// - `package.json` → sibling `node_modules/`
/// - `go.mod` → sibling `vendor/` iff `vendor/modules.txt` exists
/// - `composer.json` → sibling `vendor/` iff `vendor/autoload.php` exists
/// - `pyvenv.cfg` → the directory containing it
///
/// Directories already under an excluded path are not re-recorded. The
/// result is de-duplicated and sorted.
pub fn detect_excludes(root: &Path) -> Result<Vec<Excluded>, ScanError> {
    let mut excluded: Vec<Excluded> = Vec::new();

    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .sort_by_file_name(std::ffi::OsStr::cmp)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !HARD_SKIPS.contains(&name.as_ref())
        })
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| ScanError::WalkFailed {
            root: root.display().to_string(),
            message: e.to_string(),
        })?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some(parent) = entry.path().parent() else {
            continue;
        };

        let candidate = match file_name.as_str() {
            "Cargo.toml" => sibling(parent, "target")
                .map(|p| (p, "build artifacts next to Cargo.toml".to_string())),
            "package.json" => sibling(parent, "node_modules")
                .map(|p| (p, "installed npm packages next to package.json".to_string())),
            "go.mod" => {
                let vendor = parent.join("vendor");
                vendor
                    .join("modules.txt")
                    .is_file()
                    .then(|| (vendor, "vendored Go modules (vendor/modules.txt)".to_string()))
            }
            "composer.json" => {
                let vendor = parent.join("vendor");
                vendor
                    .join("autoload.php")
                    .is_file()
                    .then(|| (vendor, "composer packages (vendor/autoload.php)".to_string()))
            }
            "pyvenv.cfg" => Some((
                parent.to_path_buf(),
                "python virtual environment (pyvenv.cfg)".to_string(),
            )),
            _ => None,
        };

        let Some((dir, reason)) = candidate else {
            continue;
        };
        let Some(relative) = relative_to(root, &dir) else {
            continue;
        };
        if is_covered(&excluded, &relative) {
            continue;
        }
        debug!("auto-exclude {relative}: {reason}");
        excluded.push(Excluded {
            path: relative,
            reason,
        });
    }

    excluded.sort_by(|a, b| a.path.cmp(&b.path));
    excluded.dedup_by(|a, b| a.path == b.path);
    Ok(excluded)
}

fn sibling(parent: &Path, name: &str) -> Option<std::path::PathBuf> {
    let dir = parent.join(name);
    dir.is_dir().then_some(dir)
}

fn relative_to(root: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let s = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    (!s.is_empty()).then_some(s)
}

/// A candidate already under an excluded path is skipped.
fn is_covered(excluded: &[Excluded], candidate: &str) -> bool {
    excluded.iter().any(|e| {
        candidate == e.path || candidate.starts_with(&format!("{}/", e.path))
    })
}
