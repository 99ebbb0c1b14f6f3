//! Set-overlap similarity between recommendation results.

use std::collections::HashSet;
use std::hash::Hash;

use crate::recommend::{RankedTracks, Recommendations};

/// `|A ∩ B| / |A ∪ B|`, defined as 0 when both sets are empty.
pub fn jaccard_index<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f64 / union as f64
}

/// Jaccard similarity of the node sets of two walks (scores ignored).
pub fn jaccard_similarity(a: &Recommendations, b: &Recommendations) -> f64 {
    let sa: HashSet<usize> = a.visits.keys().copied().collect();
    let sb: HashSet<usize> = b.visits.keys().copied().collect();
    jaccard_index(&sa, &sb)
}

/// Jaccard similarity of two URI-level results.
pub fn jaccard_similarity_ranked(a: &RankedTracks, b: &RankedTracks) -> f64 {
    let sa: HashSet<&str> = a.uris().collect();
    let sb: HashSet<&str> = b.uris().collect();
    jaccard_index(&sa, &sb)
}
