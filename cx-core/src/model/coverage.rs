//! Coverage records: raw profile blocks, per-entity line coverage, and the
//! test→entity attribution map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One block from a line-based coverage profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageBlock {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub num_stmt: u32,
    pub count: u64,
}

impl CoverageBlock {
    /// A block covers its lines iff it was executed at least once.
    pub fn is_covered(&self) -> bool {
        self.count > 0
    }
}

/// Line-granular coverage mapped onto one entity.
///
/// Invariants: covered and uncovered are disjoint, both within
/// `[line_start, line_end]`, and `0 <= coverage_percent <= 100`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCoverage {
    pub entity_id: String,
    pub coverage_percent: f64,
    pub covered_lines: Vec<u32>,
    pub uncovered_lines: Vec<u32>,
    pub last_run: DateTime<Utc>,
}

impl EntityCoverage {
    /// Percent from line sets: 100·c/(c+u), or 0 when there is no data.
    pub fn percent_of(covered: usize, uncovered: usize) -> f64 {
        let total = covered + uncovered;
        if total == 0 {
            0.0
        } else {
            100.0 * covered as f64 / total as f64
        }
    }
}

/// One row of the test→entity map, rebuilt in bulk on per-test import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEntityLink {
    pub test_file: String,
    pub test_name: String,
    pub entity_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_bounds() {
        assert_eq!(EntityCoverage::percent_of(0, 0), 0.0);
        assert_eq!(EntityCoverage::percent_of(5, 0), 100.0);
        assert_eq!(EntityCoverage::percent_of(1, 3), 25.0);
    }
}
