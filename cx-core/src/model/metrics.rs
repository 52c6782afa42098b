//! Per-entity graph metrics, latest pass only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Centrality metrics for one entity. Written back in bulk after a
/// metrics pass; readers see either the whole pass or the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub entity_id: String,
    /// Normalized to sum to 1 across active entities.
    pub pagerank: f64,
    pub in_degree: i64,
    pub out_degree: i64,
    /// Brandes betweenness, normalized by (N-1)(N-2). Zero when N < 3.
    pub betweenness: f64,
    pub computed_at: DateTime<Utc>,
}

impl EntityMetrics {
    /// Keystone iff pagerank is at or above the configured rank threshold.
    /// The threshold is an absolute rank value chosen by the operator, not a
    /// fraction of the rank mass.
    pub fn is_keystone(&self, threshold: f64) -> bool {
        self.pagerank >= threshold
    }

    /// Bottleneck iff betweenness is at or above the configured threshold.
    pub fn is_bottleneck(&self, threshold: f64) -> bool {
        self.betweenness >= threshold
    }
}
