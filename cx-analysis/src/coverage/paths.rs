//! Coverage path normalization.
//!
//! Profiles report module-qualified paths
//! (`github.com/user/project/internal/auth/login.go`); entities store
//! repo-relative paths (`internal/auth/login.go`).

/// Root markers, searched for their *last* occurrence.
const ROOT_MARKERS: &[&str] = &["/internal/", "/pkg/", "/cmd/", "/src/"];

/// Normalize a profile path to the entity convention: the suffix from
/// the last root marker, else relative to `base`, else unchanged.
pub fn normalize(file: &str, base: Option<&str>) -> String {
    let mut best: Option<usize> = None;
    for marker in ROOT_MARKERS {
        if let Some(pos) = file.rfind(marker) {
            best = Some(best.map_or(pos, |b: usize| b.max(pos)));
        }
    }
    if let Some(pos) = best {
        return file[pos + 1..].to_string();
    }

    if let Some(base) = base {
        let base = base.trim_end_matches('/');
        if let Some(rest) = file.strip_prefix(base) {
            return rest.trim_start_matches('/').to_string();
        }
    }

    file.to_string()
}
