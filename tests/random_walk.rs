use proptest::prelude::*;
use trackwalk::{
    jaccard_similarity, jaccard_similarity_ranked, recommend, recommend_many, AudioFeatures, ContentBias,
    FeatureKey, NodeAttrs, OccurrenceBias, Recommendations, TrackGraph, WalkConfig, WalkMode, WeightedGraphRef,
};

#[derive(Debug, Clone)]
struct WeightedAdjListGraph {
    adj: Vec<Vec<usize>>,
    wts: Vec<Vec<f32>>,
}

impl WeightedAdjListGraph {
    /// Undirected graph from an edge list; parallel edges are summed.
    fn from_edges(n: usize, edges: &[(usize, usize, f32)]) -> Self {
        let mut rows: Vec<std::collections::BTreeMap<usize, f32>> = vec![Default::default(); n];
        for &(u, v, w) in edges {
            if u == v {
                continue;
            }
            *rows[u].entry(v).or_insert(0.0) += w;
            *rows[v].entry(u).or_insert(0.0) += w;
        }
        let adj = rows.iter().map(|r| r.keys().copied().collect()).collect();
        let wts = rows.iter().map(|r| r.values().copied().collect()).collect();
        Self { adj, wts }
    }
}

impl WeightedGraphRef for WeightedAdjListGraph {
    fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn neighbors_and_weights_ref(&self, node: usize) -> (&[usize], &[f32]) {
        let nbrs = self.adj.get(node).map(Vec::as_slice).unwrap_or(&[]);
        let wts = self.wts.get(node).map(Vec::as_slice).unwrap_or(&[]);
        (nbrs, wts)
    }
}

fn seeded(walk_length: usize, teleport: f64, seed: u64) -> WalkConfig {
    WalkConfig { walk_length, teleport, seed: Some(seed) }
}

fn assert_recs_sane<G: WeightedGraphRef>(g: &G, recs: &Recommendations, walk_length: usize) {
    assert!(recs.len() <= walk_length, "more distinct nodes than steps");
    assert!(!recs.contains(recs.start), "start node must never be recommended");
    let total: u32 = recs.visits.values().sum();
    assert!(total as usize <= walk_length, "more visits than steps");
    for &v in recs.visits.keys() {
        assert!(v < g.node_count(), "visit out of range: {v}");
    }
}

/// Membership of `start`'s connected component.
fn reachable(g: &WeightedAdjListGraph, start: usize) -> Vec<bool> {
    let mut seen = vec![false; g.node_count()];
    let mut stack = vec![start];
    seen[start] = true;
    while let Some(u) = stack.pop() {
        for &v in g.neighbors_and_weights_ref(u).0 {
            if !seen[v] {
                seen[v] = true;
                stack.push(v);
            }
        }
    }
    seen
}

fn uniform_features() -> AudioFeatures {
    AudioFeatures { danceability: 0.5, energy: 0.5, speechiness: 0.1, loudness: -6.0, valence: 0.4, ..Default::default() }
}

/// Three tracks on one playlist, all with the same audio features.
fn xyz() -> TrackGraph {
    let mut b = TrackGraph::builder();
    for uri in ["spotify:track:x", "spotify:track:y", "spotify:track:z"] {
        let mut attrs = NodeAttrs::for_uri(uri);
        attrs.features = Some(uniform_features());
        b.add_node_with(uri, attrs);
    }
    b.add_cooccurrence(["spotify:track:x", "spotify:track:y", "spotify:track:z"]).unwrap();
    b.build()
}

const KEYS: [FeatureKey; 5] =
    [FeatureKey::Danceability, FeatureKey::Energy, FeatureKey::Speechiness, FeatureKey::Loudness, FeatureKey::Valence];

#[test]
fn xyz_walks_only_reach_the_other_two() {
    let g = xyz();
    let cfg = seeded(20, 1e-4, 11);
    let recs = g.recommend("spotify:track:x", &cfg, &WalkMode::Occurrence).unwrap();
    let mut uris: Vec<&str> = recs.uris().collect();
    uris.sort_unstable();
    assert_eq!(uris, vec!["spotify:track:y", "spotify:track:z"]);
    assert_eq!(recs.start, "spotify:track:x");
}

#[test]
fn occurrence_and_content_agree_on_uniform_features() {
    let g = xyz();
    let cfg = seeded(20, 1e-4, 5);
    let occ = g.recommend("spotify:track:x", &cfg, &WalkMode::Occurrence).unwrap();
    let content = g.recommend("spotify:track:x", &cfg, &WalkMode::Content(KEYS.to_vec())).unwrap();
    assert!((jaccard_similarity_ranked(&occ, &content) - 1.0).abs() < 1e-12);
}

#[test]
fn full_teleport_recommends_nothing() {
    let g = xyz();
    let recs = g.recommend("spotify:track:y", &seeded(50, 1.0, 3), &WalkMode::Occurrence).unwrap();
    assert!(recs.tracks.is_empty());
}

#[test]
fn isolated_start_terminates_empty() {
    let g = WeightedAdjListGraph::from_edges(3, &[(1, 2, 1.0)]);
    let recs = recommend(&g, 0, &seeded(1_000, 0.0, 9), &OccurrenceBias).unwrap();
    assert!(recs.is_empty());
}

#[test]
fn reproducible_given_seed() {
    let g = WeightedAdjListGraph::from_edges(5, &[(0, 1, 1.0), (1, 2, 3.0), (2, 3, 1.0), (3, 4, 2.0), (4, 0, 1.0)]);
    let cfg = seeded(40, 0.15, 123);
    let a = recommend(&g, 2, &cfg, &OccurrenceBias).unwrap();
    let b = recommend(&g, 2, &cfg, &OccurrenceBias).unwrap();
    assert_eq!(a, b, "same seed should yield identical visit counts");
}

#[test]
fn content_bias_over_adapter_graph() {
    // 0 is a hub; 1 is close to it in feature space, 2 is far, 3 has no features.
    let g = WeightedAdjListGraph::from_edges(4, &[(0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0)]);
    let bias = ContentBias::from_raw(vec![Some(vec![0.0]), Some(vec![0.1]), Some(vec![1.0]), None], 1);
    let recs = recommend(&g, 0, &seeded(4_000, 0.0, 17), &bias).unwrap();
    assert!(!recs.contains(3));
    let c1 = recs.visits.get(&1).copied().unwrap_or(0);
    let c2 = recs.visits.get(&2).copied().unwrap_or(0);
    assert!(c1 > c2, "closer neighbor should be visited more often ({c1} vs {c2})");
}

#[test]
fn many_starts_match_single_runs() {
    let g = WeightedAdjListGraph::from_edges(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
    let cfg = seeded(30, 0.1, 40);
    let many = recommend_many(&g, &[0, 3], &cfg, &OccurrenceBias).unwrap();
    let first = recommend(&g, 0, &cfg, &OccurrenceBias).unwrap();
    let second = recommend(&g, 3, &WalkConfig { seed: Some(41), ..cfg }, &OccurrenceBias).unwrap();
    assert_eq!(many, vec![first, second]);
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_is_thread_count_invariant() {
    let g = WeightedAdjListGraph::from_edges(
        6,
        &[(0, 1, 1.0), (1, 2, 2.0), (2, 3, 1.0), (3, 4, 1.0), (4, 5, 3.0), (5, 0, 1.0), (1, 4, 1.0)],
    );
    let cfg = seeded(25, 0.2, 999);
    let starts: Vec<usize> = (0..6).collect();

    let pool1 = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let pool4 = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let r1 = pool1.install(|| recommend_many(&g, &starts, &cfg, &OccurrenceBias)).unwrap();
    let r4 = pool4.install(|| recommend_many(&g, &starts, &cfg, &OccurrenceBias)).unwrap();
    assert_eq!(r1, r4, "parallel output must be thread-count invariant");
}

proptest! {
    // Property: visits are in range, never the start, bounded by walk length,
    // and confined to the start's connected component.
    #[test]
    fn prop_walks_stay_in_component(
        n in 1usize..10,
        edges in prop::collection::vec((0usize..10, 0usize..10, 0.1f32..5.0), 0..20),
        start in 0usize..10,
        walk_length in 0usize..40,
        teleport in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let edges: Vec<(usize, usize, f32)> = edges.into_iter().map(|(u, v, w)| (u % n, v % n, w)).collect();
        let g = WeightedAdjListGraph::from_edges(n, &edges);
        let start = start % n;

        let recs = recommend(&g, start, &seeded(walk_length, teleport, seed), &OccurrenceBias).unwrap();
        assert_recs_sane(&g, &recs, walk_length);
        let seen = reachable(&g, start);
        for &v in recs.visits.keys() {
            prop_assert!(seen[v], "visited {v} outside the component of {start}");
        }
    }

    #[test]
    fn prop_jaccard_is_symmetric_and_bounded(
        a in prop::collection::hash_map(0usize..20, 1u32..5, 0..10),
        b in prop::collection::hash_map(0usize..20, 1u32..5, 0..10),
    ) {
        let ra = Recommendations { start: 99, visits: a };
        let rb = Recommendations { start: 99, visits: b };
        let ab = jaccard_similarity(&ra, &rb);
        prop_assert_eq!(ab, jaccard_similarity(&rb, &ra));
        prop_assert!((0.0..=1.0).contains(&ab));
        if !ra.is_empty() {
            prop_assert_eq!(jaccard_similarity(&ra, &ra), 1.0);
        }
    }
}
