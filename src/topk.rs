//! Ranking utilities for per-node score vectors (PageRank, centrality).

use ordered_float::NotNan;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::store::TrackGraph;

/// The `k` highest positive, finite scores as `(node, score)`, best first.
///
/// Equal scores are ordered by ascending node index.
pub fn top_k(scores: &[f64], k: usize) -> Vec<(usize, f64)> {
    if k == 0 || scores.is_empty() {
        return Vec::new();
    }
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (i, &score) in scores.iter().enumerate() {
        if !score.is_finite() || score <= 0.0 {
            continue;
        }
        let Ok(s) = NotNan::new(score) else { continue };
        // min-heap on (score, Reverse(index)): evicts the lowest score, then the highest index
        let entry = Reverse((s, Reverse(i)));
        if heap.len() < k {
            heap.push(entry);
        } else if let Some(min) = heap.peek() {
            if entry < *min {
                heap.pop();
                heap.push(entry);
            }
        }
    }
    let mut results: Vec<(NotNan<f64>, usize)> = heap.into_iter().map(|Reverse((s, Reverse(i)))| (s, i)).collect();
    results.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    results.into_iter().map(|(s, i)| (i, s.into_inner())).collect()
}

/// Scale in place to sum to 1. All-zero input is left alone.
pub fn normalize(scores: &mut [f64]) {
    let sum: f64 = scores.iter().sum();
    if sum > 0.0 {
        for s in scores {
            *s /= sum;
        }
    }
}

impl TrackGraph {
    /// [`top_k`] with node indices resolved to URIs.
    pub fn top_tracks(&self, scores: &[f64], k: usize) -> Vec<(&str, f64)> {
        top_k(scores, k).into_iter().filter_map(|(i, s)| self.uri(i).map(|u| (u, s))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_prefer_lower_index() {
        let scores = [1.0, 3.0, 1.0, 3.0, 2.0];
        assert_eq!(top_k(&scores, 3), vec![(1, 3.0), (3, 3.0), (4, 2.0)]);
        assert_eq!(top_k(&scores, 4), vec![(1, 3.0), (3, 3.0), (4, 2.0), (0, 1.0)]);
    }

    #[test]
    fn uris_follow_ranking() {
        let mut b = TrackGraph::builder();
        b.add_edge("spotify:track:a", "spotify:track:b", 1.0).unwrap();
        b.add_edge("spotify:track:b", "spotify:track:c", 1.0).unwrap();
        let g = b.build();
        let top = g.top_tracks(&[0.2, 0.5, 0.3], 2);
        assert_eq!(top, vec![("spotify:track:b", 0.5), ("spotify:track:c", 0.3)]);
    }
}
