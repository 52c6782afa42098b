//! PageRank by power iteration over the directed dependency graph.

/// Compute PageRank for a dense adjacency (indices 0..n).
///
/// Each iteration: `new = (1-d)/n + d * (inbound mass + dangling mass/n)`,
/// where dangling nodes spread their rank uniformly. Stops when the
/// L1-norm between successive vectors drops below `tolerance` or after
/// `max_iterations`. The result is normalized to sum to 1.
pub fn compute(
    adjacency: &[Vec<usize>],
    damping: f64,
    max_iterations: u32,
    tolerance: f64,
) -> Vec<f64> {
    let n = adjacency.len();
    if n == 0 {
        return Vec::new();
    }

    let n_f = n as f64;
    let mut ranks = vec![1.0 / n_f; n];
    let mut next = vec![0.0; n];

    for _ in 0..max_iterations {
        let dangling_mass: f64 = adjacency
            .iter()
            .zip(ranks.iter())
            .filter(|(out, _)| out.is_empty())
            .map(|(_, r)| r)
            .sum();

        let base = (1.0 - damping) / n_f + damping * dangling_mass / n_f;
        next.iter_mut().for_each(|r| *r = base);

        for (node, out) in adjacency.iter().enumerate() {
            if out.is_empty() {
                continue;
            }
            let share = damping * ranks[node] / out.len() as f64;
            for &target in out {
                next[target] += share;
            }
        }

        let delta: f64 = ranks
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        std::mem::swap(&mut ranks, &mut next);

        if delta < tolerance {
            break;
        }
    }

    // Dangling redistribution keeps the sum at 1 analytically; normalize
    // anyway so persisted ranks satisfy the sum invariant exactly.
    let total: f64 = ranks.iter().sum();
    if total > 0.0 {
        for r in &mut ranks {
            *r /= total;
        }
    }
    ranks
}
