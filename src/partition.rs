//! Node partitions: connected components, community assignments, modularity.

use std::cmp::Ordering;

use crate::graph::{GraphRef, WeightedGraphRef};

/// A total, non-overlapping assignment of nodes `0..n` to communities `0..k`.
///
/// Labels are dense and numbered in order of first appearance by node index,
/// so two partitions with the same grouping compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Partition {
    labels: Vec<usize>,
    count: usize,
}

impl Partition {
    /// Renumber arbitrary labels densely.
    pub fn from_labels(raw: &[usize]) -> Self {
        let mut remap: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
        let labels = raw
            .iter()
            .map(|r| {
                let next = remap.len();
                *remap.entry(*r).or_insert(next)
            })
            .collect();
        Self { labels, count: remap.len() }
    }

    pub fn singletons(n: usize) -> Self {
        Self { labels: (0..n).collect(), count: n }
    }

    pub fn label(&self, node: usize) -> Option<usize> {
        self.labels.get(node).copied()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn community_count(&self) -> usize {
        self.count
    }

    /// Number of nodes covered.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Members of each community, ascending, indexed by label.
    pub fn communities(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.count];
        for (node, &c) in self.labels.iter().enumerate() {
            out[c].push(node);
        }
        out
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut out = vec![0; self.count];
        for &c in &self.labels {
            out[c] += 1;
        }
        out
    }
}

/// Newman–Girvan modularity with a resolution parameter.
///
/// \[
///   Q = \sum_c \left[ \frac{L_c}{m} - \gamma \left(\frac{d_c}{2m}\right)^2 \right]
/// \]
///
/// where `L_c` is the internal edge weight of community `c` and `d_c` the sum of
/// its members' strengths. Graphs with no edge weight score 0, as does a
/// partition whose length differs from the node count.
pub fn modularity<G: WeightedGraphRef>(graph: &G, partition: &Partition, resolution: f64) -> f64 {
    let n = graph.node_count();
    if n != partition.len() {
        return 0.0;
    }
    let mut internal = vec![0.0f64; partition.community_count()];
    let mut total = vec![0.0f64; partition.community_count()];
    let mut two_m = 0.0;

    for u in 0..n {
        let cu = partition.labels[u];
        let (nbrs, wts) = graph.neighbors_and_weights_ref(u);
        for (&v, &w) in nbrs.iter().zip(wts) {
            let w = f64::from(w);
            two_m += w;
            total[cu] += w;
            if partition.labels[v] == cu {
                // each internal edge is seen from both ends
                internal[cu] += w;
            }
        }
    }
    if two_m <= 0.0 {
        return 0.0;
    }

    internal
        .iter()
        .zip(&total)
        .map(|(&l2, &d)| l2 / two_m - resolution * (d / two_m) * (d / two_m))
        .sum()
}

// Union-Find helper functions
fn uf_find(parent: &mut [usize], i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    // path compression
    let mut cur = i;
    while parent[cur] != root {
        let next = parent[cur];
        parent[cur] = root;
        cur = next;
    }
    root
}

fn uf_union(parent: &mut [usize], rank: &mut [usize], x: usize, y: usize) {
    let px = uf_find(parent, x);
    let py = uf_find(parent, y);
    if px == py {
        return;
    }
    // Union by rank
    match rank[px].cmp(&rank[py]) {
        Ordering::Less => parent[px] = py,
        Ordering::Greater => parent[py] = px,
        Ordering::Equal => {
            parent[py] = px;
            rank[px] += 1;
        }
    }
}

/// Maximal connected subgraphs.
///
/// Components are ordered by size (largest first), ties by smallest member;
/// members are ascending. Empty graph gives an empty list.
pub fn connected_components<G: GraphRef>(graph: &G) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let mut parent: Vec<usize> = (0..n).collect();
    let mut rank: Vec<usize> = vec![0; n];
    for u in 0..n {
        for &v in graph.neighbors_ref(u) {
            uf_union(&mut parent, &mut rank, u, v);
        }
    }

    let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); n];
    for u in 0..n {
        let root = uf_find(&mut parent, u);
        by_root[root].push(u);
    }

    let mut components: Vec<Vec<usize>> = by_root.into_iter().filter(|c| !c.is_empty()).collect();
    components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
    components
}

/// Partition whose communities are the connected components.
pub fn component_partition<G: GraphRef>(graph: &G) -> Partition {
    let mut raw = vec![0usize; graph.node_count()];
    for (c, members) in connected_components(graph).iter().enumerate() {
        for &u in members {
            raw[u] = c;
        }
    }
    Partition::from_labels(&raw)
}

/// Statistics about connected components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentStats {
    pub num_components: usize,
    pub max_component_size: usize,
    pub min_component_size: usize,
    pub avg_component_size: f64,
    /// Fraction of nodes in the largest component.
    pub largest_component_fraction: f64,
}

/// Zeroed stats for an empty component list.
pub fn component_stats(components: &[Vec<usize>]) -> ComponentStats {
    if components.is_empty() {
        return ComponentStats::default();
    }

    let sizes: Vec<usize> = components.iter().map(Vec::len).collect();
    let total: usize = sizes.iter().sum();
    let max_size = sizes.iter().copied().max().unwrap_or(0);
    let min_size = sizes.iter().copied().min().unwrap_or(0);

    ComponentStats {
        num_components: components.len(),
        max_component_size: max_size,
        min_component_size: min_size,
        avg_component_size: total as f64 / components.len() as f64,
        largest_component_fraction: if total > 0 { max_size as f64 / total as f64 } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TrackGraph;

    fn two_triangles_and_a_loner() -> TrackGraph {
        let mut b = TrackGraph::builder();
        for (x, y) in [("a", "b"), ("b", "c"), ("c", "a"), ("d", "e"), ("e", "f"), ("f", "d")] {
            b.add_edge(x, y, 1.0).unwrap();
        }
        b.add_node("g");
        b.build()
    }

    #[test]
    fn components_of_disconnected_graph() {
        let g = two_triangles_and_a_loner();
        let comps = connected_components(&g);
        assert_eq!(comps, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);

        let stats = component_stats(&comps);
        assert_eq!(stats.num_components, 3);
        assert_eq!(stats.max_component_size, 3);
        assert_eq!(stats.min_component_size, 1);
        assert!((stats.avg_component_size - 7.0 / 3.0).abs() < 1e-12);
        assert!((stats.largest_component_fraction - 3.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn empty_graph_has_no_components() {
        let g = TrackGraph::default();
        assert!(connected_components(&g).is_empty());
        assert_eq!(component_stats(&[]), ComponentStats::default());
    }

    #[test]
    fn labels_are_renumbered_by_first_appearance() {
        let p = Partition::from_labels(&[7, 7, 2, 9, 2]);
        assert_eq!(p.labels(), &[0, 0, 1, 2, 1]);
        assert_eq!(p.community_count(), 3);
        assert_eq!(p.communities(), vec![vec![0, 1], vec![2, 4], vec![3]]);
        assert_eq!(p.sizes(), vec![2, 2, 1]);
    }

    #[test]
    fn modularity_of_natural_split() {
        let g = two_triangles_and_a_loner();
        let split = component_partition(&g);
        // two disjoint triangles: each holds half of the weight
        let q = modularity(&g, &split, 1.0);
        assert!((q - 0.5).abs() < 1e-12, "q={q}");

        let lumped = Partition::from_labels(&[0; 7]);
        assert!(modularity(&g, &lumped, 1.0).abs() < 1e-12);
        assert_eq!(modularity(&TrackGraph::default(), &Partition::default(), 1.0), 0.0);
    }

    #[test]
    fn mismatched_partition_scores_zero() {
        let g = two_triangles_and_a_loner();
        assert_eq!(modularity(&g, &Partition::singletons(3), 1.0), 0.0);
        assert_eq!(modularity(&g, &Partition::singletons(9), 1.0), 0.0);
    }
}
