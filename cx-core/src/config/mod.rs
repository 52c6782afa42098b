//! Workspace configuration, loaded from `.cx/config.yaml`.
//!
//! Every section tolerates missing fields (serde defaults) and the loader
//! tolerates a missing file entirely. No global state: the config value is
//! threaded from process start.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CxError;
use crate::paths;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CxConfig {
    pub scan: ScanConfig,
    pub metrics: MetricsConfig,
    pub search: SearchConfig,
    pub coverage: CoverageConfig,
    pub daemon: DaemonConfig,
    pub output: OutputConfig,
    pub guard: GuardConfig,
}

impl CxConfig {
    /// Load from `<root>/.cx/config.yaml`. A missing file yields defaults;
    /// a malformed file is an error.
    pub fn load(project_root: &Path) -> Result<Self, CxError> {
        let path = paths::config_path(project_root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| CxError::Config {
            message: format!("read {}: {e}", path.display()),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| CxError::Config {
            message: format!("parse {}: {e}", path.display()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Languages to scan; empty means all supported.
    pub languages: Vec<String>,
    /// Glob patterns excluded from scanning.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub pagerank_damping: f64,
    pub pagerank_iterations: u32,
    pub pagerank_tolerance: f64,
    /// Absolute PageRank value at or above which an entity is a keystone.
    pub keystone_threshold: f64,
    /// Betweenness value at or above which an entity is a bottleneck.
    pub bottleneck_threshold: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: 0.85,
            pagerank_iterations: 100,
            pagerank_tolerance: 1e-6,
            keystone_threshold: 0.30,
            bottleneck_threshold: 0.20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight on the normalized textual score.
    pub boost_fts: f64,
    /// Weight on PageRank in the combined score.
    pub boost_pagerank: f64,
    /// Multiplier when the entity name equals the original query.
    pub boost_exact_name: f64,
    /// Results below this combined score are dropped.
    pub min_combined_score: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            boost_fts: 0.7,
            boost_pagerank: 0.3,
            boost_exact_name: 2.0,
            min_combined_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Entities at or above this percent are not reported as gaps.
    pub gap_threshold: f64,
    /// Base used when normalizing absolute coverage paths.
    pub base_path: Option<String>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            gap_threshold: 75.0,
            base_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub use_daemon: bool,
    /// Fall back to a direct store on connect-time failures.
    pub with_fallback: bool,
    /// Idle seconds before graceful shutdown. Zero disables.
    pub idle_timeout_secs: u64,
    /// Upper bound on waiting for a spawned daemon to become healthy.
    pub start_timeout_ms: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            use_daemon: true,
            with_fallback: true,
            idle_timeout_secs: 30 * 60,
            start_timeout_ms: 5_000,
            read_timeout_secs: 30,
            write_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDensity {
    Sparse,
    Medium,
    Dense,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_density: OutputDensity,
    pub default_hops: u32,
    pub max_tokens: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_density: OutputDensity::Medium,
            default_hops: 1,
            max_tokens: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    pub fail_on_coverage_regression: bool,
    pub min_coverage_for_keystones: Option<f64>,
    pub fail_on_warnings: bool,
}
