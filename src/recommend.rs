//! Random walk with restart for track recommendation.
//!
//! A single walk starts at a seed track and takes exactly `walk_length` steps.
//! Each step either restarts at the seed (probability `teleport`) or moves to a
//! neighbor drawn by cumulative-weight sampling. Visit counts of every landed
//! node except the seed form the recommendation set.
//!
//! Transition weights come from a [`TransitionBias`]:
//! - [`OccurrenceBias`]: raw edge weight (pure topology).
//! - [`ContentBias`]: inverse Euclidean distance between min-max scaled audio
//!   features of the two endpoints.
//!
//! Invariants:
//! - the seed node never appears in the output
//! - at most `walk_length` distinct nodes are returned
//! - a step with no usable neighbor restarts instead of moving, so the loop
//!   always finishes in `walk_length` steps

use std::collections::HashMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::features::FeatureKey;
use crate::graph::WeightedGraphRef;
use crate::store::TrackGraph;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkConfig {
    /// Number of steps (restarts included).
    pub walk_length: usize,
    /// Per-step restart probability in `[0, 1]`.
    pub teleport: f64,
    /// `None` draws a fresh seed per call.
    pub seed: Option<u64>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { walk_length: 20, teleport: 1e-4, seed: None }
    }
}

impl WalkConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.teleport) {
            return Err(Error::InvalidParameter(format!("teleport must be in [0, 1], got {}", self.teleport)));
        }
        Ok(())
    }

    fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed.unwrap_or_else(rand::random))
    }
}

/// How neighbor weights are derived, at the track-graph level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WalkMode {
    /// Edge weight.
    #[default]
    Occurrence,
    /// Audio-feature similarity over the listed keys.
    Content(Vec<FeatureKey>),
}

/// Supplies the unnormalized transition weight for `from -> to`.
///
/// A weight of zero (or less) means the move is not allowed.
pub trait TransitionBias {
    fn weight(&self, from: usize, to: usize, edge_weight: f32) -> f32;
}

/// Transition weight = edge weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccurrenceBias;

impl TransitionBias for OccurrenceBias {
    fn weight(&self, _from: usize, _to: usize, edge_weight: f32) -> f32 {
        edge_weight
    }
}

/// Transition weight = `1 / (1 + d)` where `d` is the Euclidean distance of the
/// endpoints' feature vectors, each feature min-max scaled over the graph.
///
/// Nodes without audio features have no vector; any move touching them gets
/// weight zero.
#[derive(Debug, Clone)]
pub struct ContentBias {
    vectors: Vec<Option<Vec<f64>>>,
}

impl ContentBias {
    pub fn new(graph: &TrackGraph, keys: &[FeatureKey]) -> Self {
        let raw: Vec<Option<Vec<f64>>> =
            graph.iter().map(|(_, _, a)| a.features.as_ref().map(|f| f.project(keys))).collect();
        Self::from_raw(raw, keys.len())
    }

    /// Build from unscaled per-node vectors of equal length `dim`.
    pub fn from_raw(mut vectors: Vec<Option<Vec<f64>>>, dim: usize) -> Self {
        let mut lo = vec![f64::INFINITY; dim];
        let mut hi = vec![f64::NEG_INFINITY; dim];
        for v in vectors.iter().flatten() {
            for (k, &x) in v.iter().enumerate().take(dim) {
                lo[k] = lo[k].min(x);
                hi[k] = hi[k].max(x);
            }
        }
        for v in vectors.iter_mut().flatten() {
            v.truncate(dim);
            for (k, x) in v.iter_mut().enumerate() {
                let span = hi[k] - lo[k];
                *x = if span > 0.0 { (*x - lo[k]) / span } else { 0.0 };
            }
        }
        Self { vectors }
    }

    pub fn similarity(&self, a: usize, b: usize) -> Option<f64> {
        let va = self.vectors.get(a)?.as_ref()?;
        let vb = self.vectors.get(b)?.as_ref()?;
        let d2: f64 = va.iter().zip(vb).map(|(x, y)| (x - y) * (x - y)).sum();
        Some(1.0 / (1.0 + d2.sqrt()))
    }
}

impl TransitionBias for ContentBias {
    fn weight(&self, from: usize, to: usize, _edge_weight: f32) -> f32 {
        self.similarity(from, to).map_or(0.0, |s| s as f32)
    }
}

/// Sparse visit counts keyed by node index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recommendations {
    pub start: usize,
    pub visits: HashMap<usize, u32>,
}

impl Recommendations {
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn contains(&self, node: usize) -> bool {
        self.visits.contains_key(&node)
    }

    /// Nodes by visit count, most visited first; ties by ascending index.
    pub fn ranked(&self) -> Vec<(usize, u32)> {
        let mut out: Vec<(usize, u32)> = self.visits.iter().map(|(&n, &c)| (n, c)).collect();
        out.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Visit shares summing to 1 (empty stays empty).
    pub fn normalized(&self) -> HashMap<usize, f64> {
        let total: u32 = self.visits.values().sum();
        self.visits.iter().map(|(&n, &c)| (n, f64::from(c) / f64::from(total.max(1)))).collect()
    }
}

/// Run one walk with restart from `start`.
pub fn recommend<G, B>(graph: &G, start: usize, config: &WalkConfig, bias: &B) -> Result<Recommendations>
where
    G: WeightedGraphRef,
    B: TransitionBias,
{
    if start >= graph.node_count() {
        return Err(Error::NodeOutOfBounds(start));
    }
    config.validate()?;
    let mut rng = config.rng();
    Ok(walk_with_restart(graph, start, config, bias, &mut rng))
}

fn walk_with_restart<G, B, R>(graph: &G, start: usize, config: &WalkConfig, bias: &B, rng: &mut R) -> Recommendations
where
    G: WeightedGraphRef,
    B: TransitionBias,
    R: Rng,
{
    let mut visits: HashMap<usize, u32> = HashMap::new();
    let mut buf: Vec<f32> = Vec::new();
    let mut curr = start;
    let mut restarts = 0usize;

    for _ in 0..config.walk_length {
        if rng.random::<f64>() < config.teleport {
            curr = start;
            restarts += 1;
            continue;
        }

        let (nbrs, wts) = graph.neighbors_and_weights_ref(curr);
        buf.clear();
        buf.extend(nbrs.iter().zip(wts).map(|(&v, &w)| bias.weight(curr, v, w).max(0.0)));

        match sample_cdf(rng, nbrs, &buf) {
            Some(next) => {
                curr = next;
                if next != start {
                    *visits.entry(next).or_insert(0) += 1;
                }
            }
            None => {
                curr = start;
                restarts += 1;
            }
        }
    }

    tracing::debug!(start, steps = config.walk_length, restarts, distinct = visits.len(), "walk finished");
    Recommendations { start, visits }
}

/// Cumulative-weight sampling over `nbrs` in slice order.
///
/// Returns `None` when there is nothing to move to (no neighbors, or all
/// weights zero).
fn sample_cdf<R: Rng>(rng: &mut R, nbrs: &[usize], weights: &[f32]) -> Option<usize> {
    debug_assert_eq!(nbrs.len(), weights.len());
    // f64 so that large finite f32 weights cannot sum to inf
    let sum: f64 = weights.iter().map(|&w| f64::from(w)).sum();
    if !(sum > 0.0) {
        return None;
    }

    let mut r = rng.random::<f64>() * sum;
    for (i, &w) in weights.iter().enumerate() {
        let w = f64::from(w);
        if w > 0.0 && r < w {
            return Some(nbrs[i]);
        }
        r -= w;
    }
    // Float round-off: fall back to the last usable neighbor.
    weights.iter().rposition(|&w| w > 0.0).map(|i| nbrs[i])
}

/// Independent walks from several start nodes.
///
/// When seeded, start `i` uses seed `seed + i`, so results do not depend on
/// how the work is scheduled.
pub fn recommend_many<G, B>(graph: &G, starts: &[usize], config: &WalkConfig, bias: &B) -> Result<Vec<Recommendations>>
where
    G: WeightedGraphRef + Sync,
    B: TransitionBias + Sync,
{
    config.validate()?;
    if let Some(&bad) = starts.iter().find(|&&s| s >= graph.node_count()) {
        return Err(Error::NodeOutOfBounds(bad));
    }
    let run = |(i, &start): (usize, &usize)| {
        let cfg = WalkConfig { seed: config.seed.map(|s| s.wrapping_add(i as u64)), ..*config };
        let mut rng = cfg.rng();
        walk_with_restart(graph, start, &cfg, bias, &mut rng)
    };

    #[cfg(feature = "parallel")]
    let out: Vec<Recommendations> = {
        use rayon::prelude::*;
        starts.par_iter().enumerate().map(run).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let out: Vec<Recommendations> = starts.iter().enumerate().map(run).collect();
    Ok(out)
}

/// Recommendations keyed by URI, most visited first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedTracks {
    pub start: String,
    pub tracks: Vec<(String, u32)>,
}

impl RankedTracks {
    pub fn uris(&self) -> impl Iterator<Item = &str> + '_ {
        self.tracks.iter().map(|(u, _)| u.as_str())
    }
}

impl TrackGraph {
    /// URI-level entry point: walk from `start_uri` in the given mode.
    pub fn recommend(&self, start_uri: &str, config: &WalkConfig, mode: &WalkMode) -> Result<RankedTracks> {
        let start = self.require(start_uri)?;
        let recs = match mode {
            WalkMode::Occurrence => recommend(self, start, config, &OccurrenceBias)?,
            WalkMode::Content(keys) => recommend(self, start, config, &ContentBias::new(self, keys))?,
        };
        Ok(self.rank(&recs))
    }

    /// Attach URIs to index-level recommendations.
    pub fn rank(&self, recs: &Recommendations) -> RankedTracks {
        RankedTracks {
            start: self.uri(recs.start).unwrap_or_default().to_string(),
            tracks: recs
                .ranked()
                .into_iter()
                .filter_map(|(n, c)| self.uri(n).map(|u| (u.to_string(), c)))
                .collect(),
        }
    }
}
