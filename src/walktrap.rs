//! Walktrap community detection (Pons & Latapy, 2005).
//!
//! Nodes whose short random walks end up in similar places belong together.
//! Each node gets a self-loop, then its `t`-step transition distribution
//! \(P^t_{i\cdot}\) is computed. Starting from singletons, the pair of adjacent
//! communities with the smallest increase in within-community variance
//!
//! \[
//!   \Delta\sigma(C_1, C_2) = \frac{1}{n} \frac{|C_1||C_2|}{|C_1|+|C_2|}
//!     \sum_k \frac{(P^t_{C_1 k} - P^t_{C_2 k})^2}{d(k)}
//! \]
//!
//! is merged, until either the smallest \(\Delta\sigma\) exceeds a threshold or
//! nothing adjacent remains. Without a threshold the dendrogram level with the
//! highest modularity is returned.
//!
//! Determinism: no randomness is involved; equal \(\Delta\sigma\) are broken by
//! the lower community ids.
//!
//! Distributions are kept sparse, so memory follows the size of the
//! `steps`-hop neighborhoods rather than \(n^2\).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ordered_float::OrderedFloat;

use crate::graph::WeightedGraphRef;
use crate::partition::Partition;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalktrapConfig {
    /// Random-walk length `t`.
    pub steps: usize,
    /// Stop merging once the best Δσ exceeds this. `None` cuts at maximum modularity.
    pub max_delta_sigma: Option<f64>,
}

impl Default for WalktrapConfig {
    fn default() -> Self {
        Self { steps: 4, max_delta_sigma: None }
    }
}

type Sparse = Vec<(usize, f64)>;

struct Community {
    size: usize,
    prob: Sparse,
    /// Edge weight to each adjacent community.
    links: BTreeMap<usize, f64>,
    /// Sum of member strengths (no self-loops), for modularity.
    total: f64,
}

pub fn walktrap<G: WeightedGraphRef>(graph: &G, config: WalktrapConfig) -> Partition {
    let n = graph.node_count();
    if n == 0 {
        return Partition::default();
    }
    let strength: Vec<f64> = (0..n).map(|u| graph.strength(u)).collect();
    let two_m: f64 = strength.iter().sum();
    if two_m <= 0.0 {
        return Partition::singletons(n);
    }

    // Self-loop weight: mean incident weight, or 1 when there is nothing to average.
    let loops: Vec<f64> = (0..n)
        .map(|u| {
            let deg = graph.neighbors_and_weights_ref(u).0.len();
            let mean = if deg > 0 { strength[u] / deg as f64 } else { 0.0 };
            if mean > 0.0 { mean } else { 1.0 }
        })
        .collect();
    let d: Vec<f64> = strength.iter().zip(&loops).map(|(s, l)| s + l).collect();

    let mut walker = Walker::new(n);
    let mut comms: Vec<Option<Community>> = (0..n)
        .map(|u| {
            let (nbrs, wts) = graph.neighbors_and_weights_ref(u);
            let mut links = BTreeMap::new();
            for (&v, &w) in nbrs.iter().zip(wts) {
                if v != u {
                    *links.entry(v).or_insert(0.0) += f64::from(w);
                }
            }
            Some(Community {
                size: 1,
                prob: walker.distribution(graph, &loops, &d, u, config.steps),
                links,
                total: strength[u],
            })
        })
        .collect();

    let n_f64 = n as f64;
    let delta_sigma = |a: &Community, b: &Community| -> f64 {
        let (sa, sb) = (a.size as f64, b.size as f64);
        (sa * sb / (sa + sb)) * weighted_sq_dist(&a.prob, &b.prob, &d) / n_f64
    };

    let mut queue: BTreeSet<(OrderedFloat<f64>, usize, usize)> = BTreeSet::new();
    let mut deltas: HashMap<(usize, usize), OrderedFloat<f64>> = HashMap::new();
    for a in 0..n {
        let Some(ca) = comms[a].as_ref() else { continue };
        for &b in ca.links.keys().filter(|&&b| a < b) {
            if let Some(cb) = comms[b].as_ref() {
                let ds = OrderedFloat(delta_sigma(ca, cb));
                queue.insert((ds, a, b));
                deltas.insert((a, b), ds);
            }
        }
    }

    let mut q: f64 = -strength.iter().map(|k| (k / two_m).powi(2)).sum::<f64>();
    let mut best_q = q;
    let mut best_len = 0usize;
    let mut merges: Vec<(usize, usize)> = Vec::new();

    while let Some((ds, a, b)) = queue.pop_first() {
        if let Some(limit) = config.max_delta_sigma {
            if ds.0 > limit {
                break;
            }
        }

        let (Some(ca), Some(cb)) = (comms[a].take(), comms[b].take()) else {
            continue;
        };
        for (x, y, other) in [(a, b, &ca), (b, a, &cb)] {
            for &z in other.links.keys() {
                if z != y {
                    let key = (x.min(z), x.max(z));
                    if let Some(old) = deltas.remove(&key) {
                        queue.remove(&(old, key.0, key.1));
                    }
                }
            }
        }
        deltas.remove(&(a, b));

        let w_ab = ca.links.get(&b).copied().unwrap_or(0.0);
        q += 2.0 * w_ab / two_m - 2.0 * ca.total * cb.total / (two_m * two_m);

        let c = comms.len();
        let size = ca.size + cb.size;
        let prob = weighted_mean(&ca.prob, ca.size as f64, &cb.prob, cb.size as f64);
        let mut links: BTreeMap<usize, f64> = BTreeMap::new();
        for (&z, &w) in ca.links.iter().chain(cb.links.iter()) {
            if z != a && z != b {
                *links.entry(z).or_insert(0.0) += w;
            }
        }
        for (&z, &w) in &links {
            if let Some(cz) = comms[z].as_mut() {
                cz.links.remove(&a);
                cz.links.remove(&b);
                cz.links.insert(c, w);
            }
        }
        let merged = Community { size, prob, links, total: ca.total + cb.total };
        for &z in merged.links.keys() {
            if let Some(cz) = comms[z].as_ref() {
                let ds = OrderedFloat(delta_sigma(cz, &merged));
                queue.insert((ds, z, c));
                deltas.insert((z, c), ds);
            }
        }
        comms.push(Some(merged));
        merges.push((a, b));

        if q > best_q + 1e-12 {
            best_q = q;
            best_len = merges.len();
        }
    }

    let keep = if config.max_delta_sigma.is_some() { merges.len() } else { best_len };
    let partition = replay(n, &merges[..keep]);
    tracing::debug!(
        n,
        merges = merges.len(),
        kept = keep,
        communities = partition.community_count(),
        modularity = best_q,
        "walktrap finished"
    );
    partition
}

/// Apply the first `merges` to singletons. Merge `i` creates community `n + i`.
fn replay(n: usize, merges: &[(usize, usize)]) -> Partition {
    let mut parent: Vec<usize> = (0..n + merges.len()).collect();
    for (i, &(a, b)) in merges.iter().enumerate() {
        parent[a] = n + i;
        parent[b] = n + i;
    }
    let labels: Vec<usize> = (0..n)
        .map(|u| {
            let mut r = u;
            while parent[r] != r {
                r = parent[r];
            }
            r
        })
        .collect();
    Partition::from_labels(&labels)
}

/// Scratch space for sparse distribution propagation.
struct Walker {
    acc: Vec<f64>,
    touched: Vec<usize>,
}

impl Walker {
    fn new(n: usize) -> Self {
        Self { acc: vec![0.0; n], touched: Vec::new() }
    }

    /// \(P^t_{u\cdot}\) over the graph with self-loops, sorted by node.
    fn distribution<G: WeightedGraphRef>(&mut self, graph: &G, loops: &[f64], d: &[f64], u: usize, steps: usize) -> Sparse {
        let mut cur: Sparse = vec![(u, 1.0)];
        for _ in 0..steps {
            for &(j, p) in &cur {
                let share = p / d[j];
                self.add(j, share * loops[j]);
                let (nbrs, wts) = graph.neighbors_and_weights_ref(j);
                for (&k, &w) in nbrs.iter().zip(wts) {
                    self.add(k, share * f64::from(w));
                }
            }
            self.touched.sort_unstable();
            cur = self.touched.iter().map(|&k| (k, self.acc[k])).collect();
            for &k in &self.touched {
                self.acc[k] = 0.0;
            }
            self.touched.clear();
        }
        cur
    }

    fn add(&mut self, k: usize, x: f64) {
        if x == 0.0 {
            return;
        }
        if self.acc[k] == 0.0 {
            self.touched.push(k);
        }
        self.acc[k] += x;
    }
}

/// \(\sum_k (a_k - b_k)^2 / d_k\) over two sorted sparse vectors.
fn weighted_sq_dist(a: &[(usize, f64)], b: &[(usize, f64)], d: &[f64]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() || j < b.len() {
        let (k, diff) = match (a.get(i), b.get(j)) {
            (Some(&(ka, va)), Some(&(kb, vb))) if ka == kb => {
                i += 1;
                j += 1;
                (ka, va - vb)
            }
            (Some(&(ka, va)), Some(&(kb, _))) if ka < kb => {
                i += 1;
                (ka, va)
            }
            (Some(&(ka, va)), None) => {
                i += 1;
                (ka, va)
            }
            (_, Some(&(kb, vb))) => {
                j += 1;
                (kb, vb)
            }
            (None, None) => break,
        };
        sum += diff * diff / d[k];
    }
    sum
}

/// Size-weighted mean of two sorted sparse vectors.
fn weighted_mean(a: &[(usize, f64)], wa: f64, b: &[(usize, f64)], wb: f64) -> Sparse {
    let total = wa + wb;
    let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
    for &(k, v) in a {
        *merged.entry(k).or_insert(0.0) += v * wa / total;
    }
    for &(k, v) in b {
        *merged.entry(k).or_insert(0.0) += v * wb / total;
    }
    merged.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TrackGraph;

    fn barbell() -> TrackGraph {
        let mut b = TrackGraph::builder();
        for i in 0..11 {
            b.add_node(format!("n{i}"));
        }
        for base in [0, 5] {
            for i in 0..5 {
                for j in (i + 1)..5 {
                    b.add_edge_indices(base + i, base + j, 1.0).unwrap();
                }
            }
        }
        b.add_edge_indices(4, 5, 1.0).unwrap();
        b.build()
    }

    #[test]
    fn distributions_are_stochastic() {
        let g = barbell();
        let n = g.node_count();
        let strength: Vec<f64> = (0..n).map(|u| g.strength(u)).collect();
        let loops = vec![1.0; n];
        let d: Vec<f64> = strength.iter().map(|s| s + 1.0).collect();
        let mut w = Walker::new(n);
        for u in 0..n {
            let p = w.distribution(&g, &loops, &d, u, 3);
            let s: f64 = p.iter().map(|&(_, x)| x).sum();
            assert!((s - 1.0).abs() < 1e-12);
            assert!(p.windows(2).all(|x| x[0].0 < x[1].0));
        }
    }

    #[test]
    fn sparse_distance_matches_dense() {
        let a = vec![(0, 0.5), (2, 0.5)];
        let b = vec![(1, 0.25), (2, 0.75)];
        let d = vec![1.0, 2.0, 4.0];
        let expected = 0.25 / 1.0 + 0.0625 / 2.0 + 0.0625 / 4.0;
        assert!((weighted_sq_dist(&a, &b, &d) - expected).abs() < 1e-12);
        assert_eq!(weighted_sq_dist(&a, &a, &d), 0.0);
        assert_eq!(weighted_mean(&a, 1.0, &b, 3.0), vec![(0, 0.125), (1, 0.1875), (2, 0.6875)]);
    }

    #[test]
    fn finds_the_two_cliques() {
        let g = barbell();
        let p = walktrap(&g, WalktrapConfig::default());
        assert_eq!(p.len(), 11);
        assert_eq!(p.community_count(), 3);
        let l = p.labels();
        assert!(l[..5].iter().all(|&c| c == l[0]));
        assert!(l[5..10].iter().all(|&c| c == l[5]));
        assert_ne!(l[0], l[5]);
    }

    #[test]
    fn deterministic() {
        let g = barbell();
        let cfg = WalktrapConfig { steps: 3, max_delta_sigma: None };
        assert_eq!(walktrap(&g, cfg), walktrap(&g, cfg));
    }

    #[test]
    fn zero_threshold_keeps_singletons() {
        let g = barbell();
        let p = walktrap(&g, WalktrapConfig { steps: 4, max_delta_sigma: Some(0.0) });
        assert_eq!(p.community_count(), 11);
    }

    #[test]
    fn huge_threshold_merges_each_component() {
        let g = barbell();
        let p = walktrap(&g, WalktrapConfig { steps: 4, max_delta_sigma: Some(f64::MAX) });
        // everything adjacent merges; the isolated node stays alone
        assert_eq!(p.community_count(), 2);
        assert_ne!(p.label(10), p.label(0));
    }

    #[test]
    fn empty_and_edgeless() {
        assert!(walktrap(&TrackGraph::default(), WalktrapConfig::default()).is_empty());
        let mut b = TrackGraph::builder();
        b.add_node("a");
        b.add_node("b");
        assert_eq!(walktrap(&b.build(), WalktrapConfig::default()).community_count(), 2);
    }
}
