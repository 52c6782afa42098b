//! The metrics engine: PageRank, betweenness, degrees over a built
//! graph, persisted back through the store in one transaction.

pub mod betweenness;
pub mod pagerank;

use chrono::Utc;
use tracing::info;

use cx_core::config::MetricsConfig;
use cx_core::errors::AnalysisError;
use cx_core::model::metrics::EntityMetrics;
use cx_storage::Store;

use crate::graph::CodeGraph;

/// Computes all per-entity metrics for one graph snapshot.
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Compute PageRank, betweenness, and degrees for every node.
    /// Pure with respect to the store; ordering follows graph indices.
    pub fn compute(&self, graph: &CodeGraph) -> Vec<EntityMetrics> {
        let adjacency = graph.forward_adjacency();

        let ranks = pagerank::compute(
            &adjacency,
            self.config.pagerank_damping,
            self.config.pagerank_iterations,
            self.config.pagerank_tolerance,
        );
        let centrality = betweenness::compute(&adjacency);

        let computed_at = Utc::now();
        graph
            .graph
            .node_indices()
            .map(|idx| {
                let entity_id = graph.entity_id(idx).to_string();
                EntityMetrics {
                    pagerank: ranks[idx.index()],
                    betweenness: centrality[idx.index()],
                    in_degree: graph.in_degree(&entity_id),
                    out_degree: graph.out_degree(&entity_id),
                    entity_id,
                    computed_at,
                }
            })
            .collect()
    }

    /// Compute-then-persist: the save is a single bulk transaction, so
    /// readers observe a whole pass or the previous one, never a mix.
    pub fn compute_and_save(
        &self,
        store: &Store,
        graph: &CodeGraph,
    ) -> Result<Vec<EntityMetrics>, AnalysisError> {
        let metrics = self.compute(graph);
        store.save_bulk_metrics(&metrics)?;
        info!(
            "metrics pass saved for {} entities ({} edges)",
            metrics.len(),
            graph.edge_count()
        );
        Ok(metrics)
    }
}
