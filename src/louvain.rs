//! Louvain community detection.
//!
//! Two phases repeated until nothing moves:
//!
//! 1. **Local moves**: visit nodes in shuffled order and move each into the
//!    neighboring community with the largest modularity gain
//!    \[
//!      \Delta Q \propto k_{i,C} - \gamma \frac{\Sigma_C \, k_i}{2m}
//!    \]
//!    (`k_{i,C}` weight from `i` into `C`, `Σ_C` total strength of `C`).
//! 2. **Aggregation**: collapse each community into one node; internal weight
//!    becomes a self-loop.
//!
//! `resolution` (\(\gamma\)) below 1 yields fewer, larger communities; above 1
//! more, smaller ones. Nodes only ever join communities they share an edge
//! with, so communities never span connected components.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::graph::WeightedGraphRef;
use crate::partition::Partition;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LouvainConfig {
    pub resolution: f64,
    /// Upper bound on aggregation rounds.
    pub max_levels: usize,
    /// `None` shuffles from entropy; runs are then not reproducible.
    pub seed: Option<u64>,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self { resolution: 1.0, max_levels: 32, seed: None }
    }
}

const MIN_GAIN: f64 = 1e-12;
const MAX_PASSES: usize = 1_000;

/// Aggregated graph: off-diagonal adjacency (both directions) plus the weight
/// of each node's self-loop, counted once.
struct Level {
    adj: Vec<Vec<(usize, f64)>>,
    loops: Vec<f64>,
}

impl Level {
    fn from_graph<G: WeightedGraphRef>(graph: &G) -> Self {
        let n = graph.node_count();
        let adj = (0..n)
            .map(|u| {
                let (nbrs, wts) = graph.neighbors_and_weights_ref(u);
                nbrs.iter().zip(wts).filter(|&(&v, _)| v != u).map(|(&v, &w)| (v, f64::from(w))).collect()
            })
            .collect();
        Self { adj, loops: vec![0.0; n] }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    /// Strength with self-loops counted twice.
    fn strengths(&self) -> Vec<f64> {
        self.adj
            .iter()
            .zip(&self.loops)
            .map(|(row, &l)| row.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * l)
            .collect()
    }

    fn aggregate(&self, comm: &[usize], count: usize) -> Self {
        let mut rows: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut loops = vec![0.0; count];
        for u in 0..self.len() {
            let cu = comm[u];
            loops[cu] += self.loops[u];
            for &(v, w) in &self.adj[u] {
                let cv = comm[v];
                if cu == cv {
                    // seen from both endpoints
                    loops[cu] += w / 2.0;
                } else {
                    *rows[cu].entry(cv).or_insert(0.0) += w;
                }
            }
        }
        Self { adj: rows.into_iter().map(|r| r.into_iter().collect()).collect(), loops }
    }
}

/// Partition `graph` by greedy modularity optimization.
pub fn louvain<G: WeightedGraphRef>(graph: &G, config: LouvainConfig) -> Partition {
    let n = graph.node_count();
    if n == 0 {
        return Partition::default();
    }

    let mut level = Level::from_graph(graph);
    let two_m: f64 = level.strengths().iter().sum();
    if two_m <= 0.0 {
        return Partition::singletons(n);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
    // membership[original node] = node of the current level
    let mut membership: Vec<usize> = (0..n).collect();
    let mut levels = 0;

    while levels < config.max_levels {
        let (comm, count, moved) = local_moves(&level, two_m, config.resolution, &mut rng);
        levels += 1;
        if !moved {
            break;
        }
        for m in &mut membership {
            *m = comm[*m];
        }
        level = level.aggregate(&comm, count);
    }

    let partition = Partition::from_labels(&membership);
    tracing::debug!(n, levels, communities = partition.community_count(), "louvain finished");
    partition
}

/// One local-move phase. Returns dense community ids, their count, and whether
/// any node changed community.
fn local_moves<R: Rng>(level: &Level, two_m: f64, resolution: f64, rng: &mut R) -> (Vec<usize>, usize, bool) {
    let n = level.len();
    let k = level.strengths();
    let mut comm: Vec<usize> = (0..n).collect();
    let mut tot: Vec<f64> = k.clone();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    // scratch: weight from the current node into each community
    let mut link = vec![0.0f64; n];
    let mut touched: Vec<usize> = Vec::new();
    let mut moved_any = false;

    for _ in 0..MAX_PASSES {
        let mut moved = false;
        for &i in &order {
            let home = comm[i];
            let ki = k[i];

            touched.clear();
            for &(j, w) in &level.adj[i] {
                let c = comm[j];
                if link[c] == 0.0 {
                    touched.push(c);
                }
                link[c] += w;
            }

            tot[home] -= ki;
            let gain = |c: usize, link_c: f64| link_c - resolution * tot[c] * ki / two_m;

            let mut best = home;
            let mut best_gain = gain(home, link[home]);
            for &c in &touched {
                let g = gain(c, link[c]);
                if g > best_gain + MIN_GAIN {
                    best = c;
                    best_gain = g;
                }
            }
            tot[best] += ki;

            for &c in &touched {
                link[c] = 0.0;
            }

            if best != home {
                comm[i] = best;
                moved = true;
                moved_any = true;
            }
        }
        if !moved {
            break;
        }
    }

    let dense = Partition::from_labels(&comm);
    let count = dense.community_count();
    (dense.labels().to_vec(), count, moved_any)
}
