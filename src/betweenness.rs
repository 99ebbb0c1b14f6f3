//! Betweenness centrality.
//!
//! Public invariant:
//! - The output vector is indexed by node index (stable ordering).
//! - Disconnected graphs are allowed; unreachable pairs contribute 0.
//!
//! Notes:
//! - This is Brandes' algorithm for **undirected, unweighted** graphs.
//! - Every unordered pair is accumulated from both endpoints, so the raw sum is
//!   scaled by \(1/((n-1)(n-2))\) for \(n \ge 3\), which is the undirected
//!   normalization \(2/((n-1)(n-2))\) applied to the halved sum.

use std::collections::VecDeque;

use crate::graph::GraphRef;

/// Normalized betweenness centrality (Brandes), one score per node.
pub fn betweenness_centrality<G: GraphRef>(graph: &G) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 2 {
        return vec![0.0; n];
    }

    let mut betweenness = vec![0.0; n];

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut pred: Vec<Vec<usize>> = vec![vec![]; n];
    let mut sigma = vec![0.0f64; n];
    let mut dist: Vec<i64> = vec![-1; n];
    let mut delta = vec![0.0f64; n];
    let mut queue: VecDeque<usize> = VecDeque::new();

    for s in 0..n {
        stack.clear();
        for p in &mut pred {
            p.clear();
        }
        sigma.fill(0.0);
        dist.fill(-1);
        delta.fill(0.0);

        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in graph.neighbors_ref(v) {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    pred[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &pred[w] {
                // sigma[w] can be 0 for disconnected nodes; guard division.
                let sigma_w = sigma[w];
                if sigma_w > 0.0 {
                    delta[v] += (sigma[v] / sigma_w) * (1.0 + delta[w]);
                }
            }
            if w != s {
                betweenness[w] += delta[w];
            }
        }
    }

    let norm = 1.0 / ((n - 1) * (n - 2)) as f64;
    for b in &mut betweenness {
        *b *= norm;
    }
    betweenness
}
