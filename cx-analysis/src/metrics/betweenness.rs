//! Betweenness centrality via Brandes' algorithm (unweighted BFS),
//! sources parallelized with rayon.

use rayon::prelude::*;

/// Compute normalized betweenness for a dense adjacency (indices 0..n).
///
/// Pair dependencies accumulate as `δ[v] += (σ[v]/σ[w])·(1+δ[w])` in
/// reverse BFS order, summed into `BC[v]` for `v ≠ s`. Normalization
/// divides by `(n-1)(n-2)` (directed). Graphs with fewer than 3 nodes
/// are all-zero by convention.
pub fn compute(adjacency: &[Vec<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    if n < 3 {
        return vec![0.0; n];
    }

    let bc = (0..n)
        .into_par_iter()
        .map(|source| single_source_dependencies(adjacency, source))
        .reduce(
            || vec![0.0; n],
            |mut acc, partial| {
                for (a, p) in acc.iter_mut().zip(partial.iter()) {
                    *a += p;
                }
                acc
            },
        );

    let scale = ((n - 1) * (n - 2)) as f64;
    bc.into_iter().map(|v| v / scale).collect()
}

/// One Brandes source: BFS forward pass, reverse accumulation.
fn single_source_dependencies(adjacency: &[Vec<usize>], source: usize) -> Vec<f64> {
    let n = adjacency.len();
    let mut sigma = vec![0.0f64; n];
    let mut dist = vec![-1i64; n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);
    let mut queue = std::collections::VecDeque::new();

    sigma[source] = 1.0;
    dist[source] = 0;
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        order.push(v);
        for &w in &adjacency[v] {
            if dist[w] < 0 {
                dist[w] = dist[v] + 1;
                queue.push_back(w);
            }
            if dist[w] == dist[v] + 1 {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    let mut local = vec![0.0f64; n];
    for &w in order.iter().rev() {
        for &v in &predecessors[w] {
            delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
        }
        if w != source {
            local[w] += delta[w];
        }
    }
    local
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_graphs_are_all_zero() {
        assert!(compute(&[]).is_empty());
        assert_eq!(compute(&[vec![]]), vec![0.0]);
        assert_eq!(compute(&[vec![1], vec![0]]), vec![0.0, 0.0]);
    }

    #[test]
    fn middle_of_a_path_carries_all_traffic() {
        // 0 → 1 → 2: only node 1 lies on a shortest path.
        let adj = vec![vec![1], vec![2], vec![]];
        let bc = compute(&adj);
        assert_eq!(bc[0], 0.0);
        assert_eq!(bc[2], 0.0);
        // One pair (0→2) routed through 1, scale (3-1)(3-2) = 2.
        assert!((bc[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn bounds_hold_on_a_cycle() {
        let adj = vec![vec![1], vec![2], vec![3], vec![0]];
        for v in compute(&adj) {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn split_shortest_paths_share_credit() {
        // 0 → {1, 2} → 3: two equal-length paths split the pair weight.
        let adj = vec![vec![1, 2], vec![3], vec![3], vec![]];
        let bc = compute(&adj);
        assert!((bc[1] - bc[2]).abs() < 1e-9);
        assert!(bc[1] > 0.0);
    }
}
