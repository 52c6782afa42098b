//! # cx-scan
//!
//! Scan-side bookkeeping: content-hash freshness decisions over the
//! store's file index, and the marker-file detector that auto-excludes
//! dependency directories from scans.

pub mod autoexclude;
pub mod freshness;

pub use autoexclude::{detect_excludes, Excluded};
pub use freshness::{changed_files, hash_file, is_file_changed, prune_stale};
