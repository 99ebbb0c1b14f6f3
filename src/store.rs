//! In-memory track co-occurrence graph.
//!
//! [`TrackGraph`] is an immutable CSR snapshot: nodes are addressed by dense
//! indices `0..n` (assigned in first-reference order while building), each with
//! a catalog URI and typed [`NodeAttrs`]. Edges are undirected and weighted.
//!
//! Topology is fixed once [`TrackGraphBuilder::build`] returns. The only
//! mutable surface afterwards is [`TrackGraph::attrs_mut`], used by enrichment
//! before any analysis runs.

use std::collections::{BTreeMap, HashMap};

use crate::features::NodeAttrs;
use crate::graph::{Graph, GraphRef, WeightedGraph, WeightedGraphRef};
use crate::{Error, Result};

/// Incremental builder for [`TrackGraph`].
#[derive(Debug, Clone, Default)]
pub struct TrackGraphBuilder {
    uris: Vec<String>,
    attrs: Vec<NodeAttrs>,
    index: HashMap<String, usize>,
    // Keyed by (min, max) so both directions accumulate into one edge.
    edges: BTreeMap<(usize, usize), f32>,
}

impl TrackGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `uri`, creating the node on first reference.
    pub fn add_node(&mut self, uri: impl Into<String>) -> usize {
        let uri = uri.into();
        if let Some(&idx) = self.index.get(&uri) {
            return idx;
        }
        let idx = self.uris.len();
        self.attrs.push(NodeAttrs::for_uri(&uri));
        self.index.insert(uri.clone(), idx);
        self.uris.push(uri);
        idx
    }

    /// Add a node and replace its attributes.
    pub fn add_node_with(&mut self, uri: impl Into<String>, attrs: NodeAttrs) -> usize {
        let idx = self.add_node(uri);
        self.attrs[idx] = attrs;
        idx
    }

    /// Add `weight` to the undirected edge `a -- b`, creating nodes as needed.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f32) -> Result<()> {
        let u = self.add_node(a);
        let v = self.add_node(b);
        self.add_edge_indices(u, v, weight)
    }

    pub fn add_edge_indices(&mut self, u: usize, v: usize, weight: f32) -> Result<()> {
        let n = self.uris.len();
        if u >= n {
            return Err(Error::NodeOutOfBounds(u));
        }
        if v >= n {
            return Err(Error::NodeOutOfBounds(v));
        }
        if u == v {
            return Err(Error::InvalidParameter(format!("self-loop on `{}`", self.uris[u])));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidParameter(format!("edge weight must be finite and >= 0, got {weight}")));
        }
        let key = (u.min(v), u.max(v));
        let total = self.edges.get(&key).copied().unwrap_or(0.0) + weight;
        if !total.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "accumulated weight of `{}` -- `{}` overflows f32",
                self.uris[key.0], self.uris[key.1]
            )));
        }
        self.edges.insert(key, total);
        Ok(())
    }

    /// Record one co-occurrence list (e.g. a playlist): every distinct pair
    /// gains weight 1.
    pub fn add_cooccurrence<I, S>(&mut self, uris: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut members: Vec<usize> = uris.into_iter().map(|u| self.add_node(u.as_ref())).collect();
        members.sort_unstable();
        members.dedup();
        for (i, &u) in members.iter().enumerate() {
            for &v in &members[i + 1..] {
                self.add_edge_indices(u, v, 1.0)?;
            }
        }
        Ok(())
    }

    pub fn build(self) -> TrackGraph {
        let n = self.uris.len();
        let mut degree = vec![0usize; n];
        for &(u, v) in self.edges.keys() {
            degree[u] += 1;
            degree[v] += 1;
        }

        let mut offsets = vec![0usize; n + 1];
        for i in 0..n {
            offsets[i + 1] = offsets[i] + degree[i];
        }

        let total = offsets[n];
        let mut neighbors = vec![0usize; total];
        let mut weights = vec![0.0f32; total];
        let mut cursor = offsets.clone();
        for (&(u, v), &w) in &self.edges {
            neighbors[cursor[u]] = v;
            weights[cursor[u]] = w;
            cursor[u] += 1;
        }
        for (&(u, v), &w) in &self.edges {
            neighbors[cursor[v]] = u;
            weights[cursor[v]] = w;
            cursor[v] += 1;
        }
        for i in 0..n {
            let (lo, hi) = (offsets[i], offsets[i + 1]);
            let mut pairs: Vec<(usize, f32)> =
                neighbors[lo..hi].iter().copied().zip(weights[lo..hi].iter().copied()).collect();
            pairs.sort_by_key(|(nb, _)| *nb);
            for (j, (nb, w)) in pairs.into_iter().enumerate() {
                neighbors[lo + j] = nb;
                weights[lo + j] = w;
            }
        }

        TrackGraph {
            uris: self.uris,
            attrs: self.attrs,
            index: self.index,
            offsets,
            neighbors,
            weights,
        }
    }
}

/// Immutable undirected weighted graph of catalog nodes.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Snapshot", into = "Snapshot"))]
pub struct TrackGraph {
    uris: Vec<String>,
    attrs: Vec<NodeAttrs>,
    index: HashMap<String, usize>,
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
    weights: Vec<f32>,
}

impl TrackGraph {
    pub fn builder() -> TrackGraphBuilder {
        TrackGraphBuilder::new()
    }

    pub fn node_count(&self) -> usize {
        self.uris.len()
    }

    pub fn edge_count(&self) -> usize {
        self.neighbors.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    pub fn index_of(&self, uri: &str) -> Option<usize> {
        self.index.get(uri).copied()
    }

    /// Like [`index_of`](Self::index_of), but an absent URI is an error.
    pub fn require(&self, uri: &str) -> Result<usize> {
        self.index_of(uri).ok_or_else(|| Error::UnknownNode(uri.to_string()))
    }

    pub fn uri(&self, node: usize) -> Option<&str> {
        self.uris.get(node).map(String::as_str)
    }

    pub fn attrs(&self, node: usize) -> Option<&NodeAttrs> {
        self.attrs.get(node)
    }

    /// Mutable attribute access. Topology stays untouched.
    pub fn attrs_mut(&mut self, node: usize) -> Option<&mut NodeAttrs> {
        self.attrs.get_mut(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &NodeAttrs)> + '_ {
        self.uris.iter().zip(&self.attrs).enumerate().map(|(i, (u, a))| (i, u.as_str(), a))
    }

    /// Each undirected edge once, as `(u, v, weight)` with `u < v`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..self.node_count()).flat_map(move |u| {
            let (nbrs, wts) = self.neighbors_and_weights_ref(u);
            nbrs.iter().zip(wts).filter(move |&(&v, _)| u < v).map(move |(&v, &w)| (u, v, w))
        })
    }

    pub fn weight(&self, u: usize, v: usize) -> Option<f32> {
        if u >= self.node_count() {
            return None;
        }
        let (nbrs, wts) = self.neighbors_and_weights_ref(u);
        nbrs.binary_search(&v).ok().map(|i| wts[i])
    }

    fn row(&self, node: usize) -> std::ops::Range<usize> {
        match (self.offsets.get(node), self.offsets.get(node + 1)) {
            (Some(&lo), Some(&hi)) => lo..hi,
            _ => 0..0,
        }
    }
}

impl GraphRef for TrackGraph {
    fn node_count(&self) -> usize {
        self.uris.len()
    }

    fn neighbors_ref(&self, node: usize) -> &[usize] {
        &self.neighbors[self.row(node)]
    }
}

impl WeightedGraphRef for TrackGraph {
    fn node_count(&self) -> usize {
        self.uris.len()
    }

    fn neighbors_and_weights_ref(&self, node: usize) -> (&[usize], &[f32]) {
        let r = self.row(node);
        (&self.neighbors[r.clone()], &self.weights[r])
    }
}

impl Graph for TrackGraph {
    fn node_count(&self) -> usize {
        self.uris.len()
    }

    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.neighbors_ref(node).to_vec()
    }
}

impl WeightedGraph for TrackGraph {
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        self.weight(source, target).map_or(0.0, f64::from)
    }
}

/// Serialized form: node list plus edge list. Rebuilding through the builder
/// re-validates edges and restores the URI index.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct Snapshot {
    nodes: Vec<(String, NodeAttrs)>,
    edges: Vec<(usize, usize, f32)>,
}

#[cfg(feature = "serde")]
impl From<TrackGraph> for Snapshot {
    fn from(g: TrackGraph) -> Self {
        let edges = g.edges().collect();
        Self { nodes: g.uris.into_iter().zip(g.attrs).collect(), edges }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<Snapshot> for TrackGraph {
    type Error = Error;

    fn try_from(s: Snapshot) -> Result<Self> {
        let mut b = TrackGraphBuilder::new();
        for (uri, attrs) in s.nodes {
            if b.index.contains_key(&uri) {
                return Err(Error::InvalidParameter(format!("duplicate node `{uri}`")));
            }
            b.add_node_with(uri, attrs);
        }
        for (u, v, w) in s.edges {
            b.add_edge_indices(u, v, w)?;
        }
        Ok(b.build())
    }
}
