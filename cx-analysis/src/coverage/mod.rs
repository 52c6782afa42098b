//! Coverage subsystem: profile parsing (text and binary-directory
//! layouts), path normalization, and line-granular mapping onto entities.

pub mod mapper;
pub mod paths;
pub mod profile;

pub use mapper::{import_per_test, import_profile, map_blocks, CoverageSummary};
pub use profile::{detect_layout, parse_profile_str, CoverageLayout};
