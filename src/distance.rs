//! Hop-distance metrics: eccentricity, diameter, radius.
//!
//! Distances count edges and ignore weights. Eccentricity is only defined
//! within a connected component, so the whole-graph entry point refuses
//! disconnected input instead of reporting infinity.

use std::collections::VecDeque;

use crate::graph::GraphRef;
use crate::partition::connected_components;
use crate::{Error, Result};

pub(crate) const UNREACHED: usize = usize::MAX;

/// BFS from `source`, writing hop counts into `dist` (`UNREACHED` elsewhere).
///
/// `dist` and `queue` are caller-owned so repeated calls reuse the buffers.
pub(crate) fn bfs_hops<G: GraphRef>(graph: &G, source: usize, dist: &mut Vec<usize>, queue: &mut VecDeque<usize>) {
    dist.clear();
    dist.resize(graph.node_count(), UNREACHED);
    queue.clear();
    dist[source] = 0;
    queue.push_back(source);
    while let Some(u) = queue.pop_front() {
        let du = dist[u];
        for &v in graph.neighbors_ref(u) {
            if dist[v] == UNREACHED {
                dist[v] = du + 1;
                queue.push_back(v);
            }
        }
    }
}

/// Eccentricity of every node of a connected graph.
///
/// Fails with [`Error::Disconnected`] when the graph has more than one
/// component; use [`component_eccentricity`] per component instead.
pub fn eccentricity<G: GraphRef>(graph: &G) -> Result<Vec<usize>> {
    let components = connected_components(graph);
    match components.len() {
        0 => Ok(Vec::new()),
        1 => component_eccentricity(graph, &components[0]),
        k => Err(Error::Disconnected { components: k }),
    }
}

/// Eccentricity of each node in `component`, aligned with its order.
///
/// `component` must be exactly one connected component (any order).
pub fn component_eccentricity<G: GraphRef>(graph: &G, component: &[usize]) -> Result<Vec<usize>> {
    let n = graph.node_count();
    if let Some(&bad) = component.iter().find(|&&u| u >= n) {
        return Err(Error::NodeOutOfBounds(bad));
    }
    if component.is_empty() {
        return Ok(Vec::new());
    }

    let mut dist = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    let mut out = Vec::with_capacity(component.len());

    for (i, &source) in component.iter().enumerate() {
        bfs_hops(graph, source, &mut dist, &mut queue);
        if i == 0 {
            let reached = dist.iter().filter(|&&d| d != UNREACHED).count();
            let mut members = component.to_vec();
            members.sort_unstable();
            members.dedup();
            let closed = members.len() == component.len()
                && reached == members.len()
                && members.iter().all(|&u| dist[u] != UNREACHED);
            if !closed {
                return Err(Error::InvalidParameter(
                    "node set is not exactly one connected component".to_string(),
                ));
            }
        }
        let ecc = component.iter().map(|&u| dist[u]).max().unwrap_or(0);
        out.push(ecc);
    }
    Ok(out)
}

/// Largest eccentricity (0 for an empty slice).
pub fn diameter(eccentricities: &[usize]) -> usize {
    eccentricities.iter().copied().max().unwrap_or(0)
}

/// Smallest eccentricity (0 for an empty slice).
pub fn radius(eccentricities: &[usize]) -> usize {
    eccentricities.iter().copied().min().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TrackGraph;

    fn path(n: usize) -> TrackGraph {
        let mut b = TrackGraph::builder();
        for i in 0..n {
            b.add_node(format!("n{i}"));
        }
        for i in 1..n {
            b.add_edge_indices(i - 1, i, 1.0).unwrap();
        }
        b.build()
    }

    #[test]
    fn path_eccentricity() {
        let g = path(5);
        let ecc = eccentricity(&g).unwrap();
        assert_eq!(ecc, vec![4, 3, 2, 3, 4]);
        assert_eq!(diameter(&ecc), 4);
        assert_eq!(radius(&ecc), 2);
    }

    #[test]
    fn disconnected_graph_is_refused() {
        let mut b = TrackGraph::builder();
        b.add_edge("a", "b", 1.0).unwrap();
        b.add_node("c");
        let g = b.build();
        assert!(matches!(eccentricity(&g), Err(Error::Disconnected { components: 2 })));

        // per component works
        assert_eq!(component_eccentricity(&g, &[1, 0]).unwrap(), vec![1, 1]);
        assert_eq!(component_eccentricity(&g, &[2]).unwrap(), vec![0]);
    }

    #[test]
    fn partial_or_mixed_components_are_rejected() {
        let g = path(4);
        assert!(matches!(component_eccentricity(&g, &[0, 1]), Err(Error::InvalidParameter(_))));
        assert!(matches!(component_eccentricity(&g, &[0, 1, 2, 3, 3]), Err(Error::InvalidParameter(_))));
        assert!(matches!(component_eccentricity(&g, &[0, 10]), Err(Error::NodeOutOfBounds(10))));
    }

    #[test]
    fn empty_graph() {
        assert!(eccentricity(&TrackGraph::default()).unwrap().is_empty());
    }
}
