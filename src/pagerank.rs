//! PageRank centrality.
//!
//! Edges are treated as having non-negative weights, and a node's outgoing mass is split
//! proportionally to incident edge weights.
//!
//! This matches the Markov chain transition:
//! \[
//!   P(u \to v) = \frac{w(u,v)}{\sum_x w(u,x)}
//! \]
//!
//! Nodes with no (positive-weight) edges are dangling: their mass is spread uniformly,
//! the same way restart mass is. The result therefore sums to 1 on any non-empty graph.

use crate::graph::WeightedGraph;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRankConfig {
    /// Probability of following an edge (`alpha`); `1 - damping` restarts uniformly.
    pub damping: f64,
    pub max_iterations: usize,
    /// Stop once the L1 change between iterations drops below this.
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self { damping: 0.85, max_iterations: 100, tolerance: 1e-6 }
    }
}

/// Scores plus convergence bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankRun {
    pub scores: Vec<f64>,
    pub iterations: usize,
    /// `false` when `max_iterations` ran out first; `scores` is then the last iterate.
    pub converged: bool,
}

pub fn pagerank<G: WeightedGraph>(graph: &G, config: PageRankConfig) -> Vec<f64> {
    pagerank_run(graph, config).scores
}

/// Like [`pagerank`], but rejects `damping` outside `(0, 1)` and non-positive `tolerance`.
pub fn pagerank_checked<G: WeightedGraph>(graph: &G, config: PageRankConfig) -> Result<Vec<f64>> {
    validate(config)?;
    Ok(pagerank(graph, config))
}

fn validate(config: PageRankConfig) -> Result<()> {
    if !(config.damping > 0.0 && config.damping < 1.0) {
        return Err(Error::InvalidParameter(format!("damping must be in (0, 1), got {}", config.damping)));
    }
    if !(config.tolerance > 0.0) {
        return Err(Error::InvalidParameter(format!("tolerance must be > 0, got {}", config.tolerance)));
    }
    Ok(())
}

pub fn pagerank_run<G: WeightedGraph>(graph: &G, config: PageRankConfig) -> PageRankRun {
    let n = graph.node_count();
    if n == 0 {
        return PageRankRun { scores: Vec::new(), iterations: 0, converged: true };
    }

    let n_f64 = n as f64;
    let mut scores = vec![1.0 / n_f64; n];
    let mut new_scores = vec![0.0; n];

    // Precompute neighbors and weights once; `edge_weight` may be a lookup.
    let neighbors: Vec<Vec<(usize, f64)>> = (0..n)
        .map(|u| {
            graph
                .neighbors(u)
                .into_iter()
                .map(|v| (v, graph.edge_weight(u, v).max(0.0)))
                .filter(|&(_, w)| w > 0.0)
                .collect()
        })
        .collect();
    let out_wsum: Vec<f64> = neighbors.iter().map(|nb| nb.iter().map(|&(_, w)| w).sum()).collect();

    let mut iterations = 0;
    let mut converged = false;
    let mut diff = f64::INFINITY;

    while iterations < config.max_iterations {
        iterations += 1;
        let dangling_sum: f64 = out_wsum
            .iter()
            .enumerate()
            .filter(|(_, &ws)| ws == 0.0)
            .map(|(i, _)| scores[i])
            .sum();

        let dangling_contrib = config.damping * dangling_sum / n_f64;
        let teleport = (1.0 - config.damping) / n_f64;
        new_scores.fill(teleport + dangling_contrib);

        for u in 0..n {
            let ws = out_wsum[u];
            if ws > 0.0 {
                for &(v, w) in &neighbors[u] {
                    new_scores[v] += config.damping * scores[u] * (w / ws);
                }
            }
        }

        diff = scores
            .iter()
            .zip(new_scores.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();
        std::mem::swap(&mut scores, &mut new_scores);
        if diff < config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        tracing::debug!(n, iterations, "pagerank converged");
    } else {
        tracing::warn!(n, iterations, residual = diff, "pagerank hit max_iterations before tolerance");
    }

    PageRankRun { scores, iterations, converged }
}
