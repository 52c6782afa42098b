//! In-memory directed graph materialized from the dependency table over
//! active entities. Immutable for the lifetime of a metrics pass.

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use cx_core::errors::AnalysisError;
use cx_core::model::entity::EntityFilter;
use cx_storage::Store;

/// Snapshot adjacency over active entities. Node weights are entity ids;
/// edges are deduplicated across dependency types for path algorithms,
/// while raw in/out counts keep type-distinct edges (exact degrees).
pub struct CodeGraph {
    pub graph: DiGraph<String, ()>,
    node_ids: FxHashMap<String, NodeIndex>,
    in_counts: FxHashMap<String, i64>,
    out_counts: FxHashMap<String, i64>,
    built_at: DateTime<Utc>,
}

impl CodeGraph {
    /// Single read-only pass over the store: all active entities become
    /// nodes (isolated ones included), all active edges become arcs.
    pub fn build(store: &Store) -> Result<Self, AnalysisError> {
        let entities = store.query_entities(&EntityFilter::default())?;
        let edges = store.active_edges()?;

        let mut graph = DiGraph::with_capacity(entities.len(), edges.len());
        let mut node_ids = FxHashMap::default();
        for entity in &entities {
            let idx = graph.add_node(entity.id.clone());
            node_ids.insert(entity.id.clone(), idx);
        }

        let mut in_counts: FxHashMap<String, i64> = FxHashMap::default();
        let mut out_counts: FxHashMap<String, i64> = FxHashMap::default();
        let mut seen: FxHashSet<(NodeIndex, NodeIndex)> = FxHashSet::default();

        for edge in &edges {
            let (Some(&from), Some(&to)) = (node_ids.get(&edge.from_id), node_ids.get(&edge.to_id))
            else {
                continue;
            };
            *out_counts.entry(edge.from_id.clone()).or_default() += 1;
            *in_counts.entry(edge.to_id.clone()).or_default() += 1;
            if seen.insert((from, to)) {
                graph.add_edge(from, to, ());
            }
        }

        debug!(
            "built graph: {} nodes, {} unique edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self {
            graph,
            node_ids,
            in_counts,
            out_counts,
            built_at: Utc::now(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get_node(&self, entity_id: &str) -> Option<NodeIndex> {
        self.node_ids.get(entity_id).copied()
    }

    pub fn entity_id(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Exact in-degree over the active dependency set (type-distinct
    /// edges counted separately).
    pub fn in_degree(&self, entity_id: &str) -> i64 {
        self.in_counts.get(entity_id).copied().unwrap_or(0)
    }

    /// Exact out-degree over the active dependency set.
    pub fn out_degree(&self, entity_id: &str) -> i64 {
        self.out_counts.get(entity_id).copied().unwrap_or(0)
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Dense forward adjacency (indices 0..n), for the metric kernels.
    pub(crate) fn forward_adjacency(&self) -> Vec<Vec<usize>> {
        let n = self.graph.node_count();
        let mut adj = vec![Vec::new(); n];
        for edge in self.graph.edge_references() {
            adj[edge.source().index()].push(edge.target().index());
        }
        adj
    }
}
