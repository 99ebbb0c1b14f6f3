//! Degree and closeness centrality.
//!
//! Closeness uses hop distances. For disconnected graphs the default is the
//! Wasserman–Faust variant, which scores a node only against what it can
//! reach and then scales by the reachable fraction:
//!
//! ```text
//! C(v) = (r - 1) / Σ d(v, u)  ·  (r - 1) / (n - 1)
//! ```
//!
//! where `r` counts the nodes reachable from `v` (itself included). Harmonic
//! closeness, `Σ 1/d(v, u) / (n - 1)`, is available through [`ClosenessConfig`].

use std::collections::VecDeque;

use crate::distance::{bfs_hops, UNREACHED};
use crate::graph::{GraphRef, WeightedGraphRef};

/// `degree / (n - 1)`; all zeros for graphs with fewer than two nodes.
pub fn degree_centrality<G: GraphRef>(graph: &G) -> Vec<f64> {
    let n = graph.node_count();
    if n < 2 {
        return vec![0.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n).map(|u| graph.neighbors_ref(u).len() as f64 / denom).collect()
}

/// Weighted degree: sum of incident edge weights.
pub fn strength<G: WeightedGraphRef>(graph: &G) -> Vec<f64> {
    (0..graph.node_count()).map(|u| graph.strength(u)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClosenessConfig {
    /// Use harmonic closeness instead of Wasserman–Faust.
    pub harmonic: bool,
}

/// Closeness centrality of every node. Isolated nodes score 0.
pub fn closeness_centrality<G: GraphRef>(graph: &G, config: ClosenessConfig) -> Vec<f64> {
    let n = graph.node_count();
    if n < 2 {
        return vec![0.0; n];
    }
    let denom = (n - 1) as f64;

    let mut dist = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    let mut out = Vec::with_capacity(n);

    for source in 0..n {
        bfs_hops(graph, source, &mut dist, &mut queue);
        let reached = dist.iter().filter(|&&d| d != UNREACHED && d > 0);

        let score = if config.harmonic {
            reached.map(|&d| 1.0 / d as f64).sum::<f64>() / denom
        } else {
            let (count, total) = reached.fold((0usize, 0usize), |(c, t), &d| (c + 1, t + d));
            if total == 0 {
                0.0
            } else {
                let r1 = count as f64;
                (r1 / total as f64) * (r1 / denom)
            }
        };
        out.push(score);
    }
    out
}
