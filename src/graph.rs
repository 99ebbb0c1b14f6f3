//! Minimal graph adapter traits.
//!
//! Every analyzer in this crate is written against these traits rather than a
//! concrete store, so the same PageRank or walk code runs over a
//! [`TrackGraph`](crate::TrackGraph), a dense [`AdjacencyMatrix`] in tests, or a
//! `petgraph::Graph` (feature `petgraph`).
//!
//! All graphs are read as **undirected**: implementors must list `v` among the
//! neighbors of `u` whenever they list `u` among the neighbors of `v`.

pub trait Graph {
    fn node_count(&self) -> usize;
    fn neighbors(&self, node: usize) -> Vec<usize>;
    fn out_degree(&self, node: usize) -> usize {
        self.neighbors(node).len()
    }
}

/// A graph view that can return **borrowed** neighbor slices.
///
/// This is the “cache-friendly” adapter: BFS-heavy analyzers (components,
/// eccentricity, betweenness) call it once per visited node and must not
/// allocate per call.
pub trait GraphRef {
    fn node_count(&self) -> usize;
    fn neighbors_ref(&self, node: usize) -> &[usize];
    fn out_degree(&self, node: usize) -> usize {
        self.neighbors_ref(node).len()
    }
}

pub trait WeightedGraph: Graph {
    fn edge_weight(&self, source: usize, target: usize) -> f64;
}

/// A weighted graph view that can return **borrowed** neighbor + weight slices.
///
/// CSR-style: a node has a contiguous neighbor list and a contiguous weight
/// list, with matching indices.
pub trait WeightedGraphRef {
    fn node_count(&self) -> usize;

    /// Return `(neighbors, weights)` for a node.
    ///
    /// Requirements:
    /// - `neighbors.len() == weights.len()`
    /// - neighbors are sorted ascending (walks rely on this for a stable
    ///   sampling order under a fixed seed)
    /// - weights are non-negative
    fn neighbors_and_weights_ref(&self, node: usize) -> (&[usize], &[f32]);

    fn out_degree(&self, node: usize) -> usize {
        self.neighbors_and_weights_ref(node).0.len()
    }

    /// Sum of incident edge weights.
    fn strength(&self, node: usize) -> f64 {
        self.neighbors_and_weights_ref(node).1.iter().map(|&w| f64::from(w)).sum()
    }
}

/// Dense adjacency matrix view. Row `i` holds the weights of node `i`'s edges;
/// zero means no edge.
pub struct AdjacencyMatrix<'a>(pub &'a [Vec<f64>]);

impl<'a> Graph for AdjacencyMatrix<'a> {
    fn node_count(&self) -> usize {
        self.0.len()
    }
    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.0[node].iter().enumerate().filter(|(_, &w)| w > 0.0).map(|(i, _)| i).collect()
    }
}

impl<'a> WeightedGraph for AdjacencyMatrix<'a> {
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        self.0[source][target]
    }
}

#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> Graph for petgraph::Graph<N, E, Ty, Ix>
where
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    fn node_count(&self) -> usize {
        self.node_count()
    }
    fn neighbors(&self, node: usize) -> Vec<usize> {
        let mut out: Vec<usize> =
            self.neighbors(petgraph::graph::NodeIndex::new(node)).map(|idx| idx.index()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> WeightedGraph for petgraph::Graph<N, E, Ty, Ix>
where
    E: Copy + Into<f64>,
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    /// Sum of the weights of all parallel edges between `source` and `target`.
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        use petgraph::visit::EdgeRef;
        let t = petgraph::graph::NodeIndex::new(target);
        self.edges(petgraph::graph::NodeIndex::new(source))
            .filter(|e| e.target() == t || e.source() == t)
            .map(|e| (*e.weight()).into())
            .sum()
    }
}
