//! End-to-end run over a handful of playlists.
//!
//! ```text
//! RUST_LOG=trackwalk=debug cargo run --example recommend
//! ```

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;
use trackwalk::enrich::{
    genre_counts, merge_artist_details, merge_audio_features, merge_track_details, parse_page, top_genres,
    ArtistsPage, AudioFeatureObject, AudioFeaturesPage, TracksPage, DEFAULT_GENRES,
};
use trackwalk::{
    component_eccentricity, component_stats, connected_components, jaccard_similarity_ranked, louvain,
    pagerank_run, walktrap, AudioFeatures, BatchKind, FeatureKey, LouvainConfig, PageRankConfig, TrackGraph,
    WalkConfig, WalkMode, WalktrapConfig,
};

const PLAYLISTS: &[&[&str]] = &[
    &["t01", "t02", "t03", "t04"],
    &["t02", "t03", "t05"],
    &["t03", "t04", "t05", "t06"],
    &["t07", "t08", "t09"],
    &["t08", "t09", "t10", "t06"],
    &["t11", "t12"],
];

const TRACKS: &str = r#"{"tracks": [
    {"uri": "spotify:track:t01", "popularity": 64, "duration_ms": 210000, "artists": [{"uri": "spotify:artist:a1"}]},
    {"uri": "spotify:track:t02", "popularity": 51, "duration_ms": 187000, "artists": [{"uri": "spotify:artist:a1"}]},
    {"uri": "spotify:track:t07", "popularity": 80, "duration_ms": 233000, "artists": [{"uri": "spotify:artist:a2"}]},
    null
]}"#;

const ARTISTS: &str = r#"{"artists": [
    {"uri": "spotify:artist:a1", "popularity": 70, "genres": ["indie pop", "bedroom pop"]},
    {"uri": "spotify:artist:a2", "popularity": 85, "genres": ["trap latino", "hip hop"]}
]}"#;

fn uri(id: &str) -> String {
    format!("spotify:track:{id}")
}

fn build_graph() -> trackwalk::Result<TrackGraph> {
    let mut b = TrackGraph::builder();
    for playlist in PLAYLISTS {
        b.add_cooccurrence(playlist.iter().map(|id| uri(id)))?;
    }
    Ok(b.build())
}

/// Stand-in for the catalog's audio-features endpoint.
fn synthetic_features(graph: &TrackGraph) -> AudioFeaturesPage {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let audio_features = graph
        .iter()
        .map(|(_, uri, _)| {
            let features = AudioFeatures {
                danceability: rng.random(),
                energy: rng.random(),
                speechiness: rng.random::<f64>() * 0.3,
                loudness: -20.0 + 18.0 * rng.random::<f64>(),
                valence: rng.random(),
                ..AudioFeatures::default()
            };
            Some(AudioFeatureObject { uri: uri.to_string(), features })
        })
        .collect();
    AudioFeaturesPage { audio_features }
}

fn main() -> trackwalk::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut graph = build_graph()?;
    println!("graph: {} tracks, {} edges", graph.node_count(), graph.edge_count());
    for batch in graph.node_batch(BatchKind::Tracks, 5) {
        println!("  request batch: {batch}");
    }

    let tracks: TracksPage = parse_page(TRACKS)?;
    let artists: ArtistsPage = parse_page(ARTISTS)?;
    merge_track_details(&mut graph, std::slice::from_ref(&tracks));
    let counts = genre_counts(std::slice::from_ref(&artists), &DEFAULT_GENRES);
    let vocabulary = top_genres(&counts, 20);
    let vocabulary: Vec<&str> = vocabulary.iter().map(String::as_str).collect();
    merge_artist_details(&mut graph, &[artists], &vocabulary);
    let features = synthetic_features(&graph);
    merge_audio_features(&mut graph, &[features]);

    let lv = louvain(&graph, LouvainConfig { resolution: 0.8, seed: Some(1), ..LouvainConfig::default() });
    println!("louvain: {} communities", lv.community_count());
    let wt = walktrap(&graph, WalktrapConfig::default());
    println!("walktrap: {} communities", wt.community_count());

    let components = connected_components(&graph);
    let stats = component_stats(&components);
    println!(
        "components: {} (largest {} nodes, {:.0}% of graph)",
        stats.num_components,
        stats.max_component_size,
        100.0 * stats.largest_component_fraction
    );
    if let Some(giant) = components.first() {
        let ecc = component_eccentricity(&graph, giant)?;
        println!("giant component diameter: {}", trackwalk::diameter(&ecc));
    }

    let pr = pagerank_run(&graph, PageRankConfig { damping: 0.85, max_iterations: 500, tolerance: 1e-4 });
    println!("pagerank ({} iterations):", pr.iterations);
    for (track, score) in graph.top_tracks(&pr.scores, 3) {
        println!("  {track}  {score:.4}");
    }

    let config = WalkConfig { walk_length: 20, teleport: 1e-4, seed: Some(42) };
    let keys = vec![
        FeatureKey::Danceability,
        FeatureKey::Energy,
        FeatureKey::Speechiness,
        FeatureKey::Loudness,
        FeatureKey::Valence,
    ];
    let start = uri("t03");
    let occurrence = graph.recommend(&start, &config, &WalkMode::Occurrence)?;
    let content = graph.recommend(&start, &config, &WalkMode::Content(keys))?;
    for (label, recs) in [("occurrence", &occurrence), ("content", &content)] {
        println!("{label} walk from {start}:");
        for (track, visits) in &recs.tracks {
            println!("  {track}  x{visits}");
        }
    }
    println!("jaccard(occurrence, content) = {:.3}", jaccard_similarity_ranked(&occurrence, &content));
    Ok(())
}
