//! Merging catalog metadata into node attributes.
//!
//! The catalog's bulk endpoints return pages of objects keyed by `uri`. This
//! module parses those pages and writes the fields the analyzers use into
//! [`NodeAttrs`](crate::NodeAttrs). It is the only code that mutates a built
//! [`TrackGraph`], and it must run before any walk or analysis.
//!
//! Fetching the pages (credentials, HTTP, retries) is the caller's business;
//! [`TrackGraph::node_batch`] produces the id lists to request.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::features::AudioFeatures;
use crate::store::TrackGraph;
use crate::Result;

/// Genre vocabulary free-text tags are folded into.
pub const DEFAULT_GENRES: [&str; 11] =
    ["Hip Hop", "Pop", "Rock", "Country", "Rap", "EDM", "Indie", "R&B", "Trap", "Electro", "Mellow"];

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub uri: String,
}

/// One page of the `tracks` endpoint. Unknown ids come back as `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct TracksPage {
    pub tracks: Vec<Option<TrackObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub uri: String,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub artists: Vec<ObjectRef>,
    pub album: Option<ObjectRef>,
}

/// One page of the `audio-features` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesPage {
    pub audio_features: Vec<Option<AudioFeatureObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeatureObject {
    pub uri: String,
    #[serde(flatten)]
    pub features: AudioFeatures,
}

/// One page of the `artists` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistsPage {
    pub artists: Vec<Option<ArtistObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub uri: String,
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Parse one JSON page.
pub fn parse_page<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Set popularity, duration, primary artist and album. Returns nodes updated.
pub fn merge_track_details(graph: &mut TrackGraph, pages: &[TracksPage]) -> usize {
    let mut updated = 0;
    for track in pages.iter().flat_map(|p| p.tracks.iter().flatten()) {
        let Some(idx) = graph.index_of(&track.uri) else { continue };
        let Some(attrs) = graph.attrs_mut(idx) else { continue };
        attrs.track.popularity = track.popularity.or(attrs.track.popularity);
        attrs.track.duration_ms = track.duration_ms.or(attrs.track.duration_ms);
        if let Some(primary) = track.artists.first() {
            attrs.track.artist_uri = Some(primary.uri.clone());
        }
        if let Some(album) = &track.album {
            attrs.track.album_uri = Some(album.uri.clone());
        }
        updated += 1;
    }
    tracing::debug!(updated, "merged track details");
    updated
}

/// Attach audio features. Returns nodes updated.
pub fn merge_audio_features(graph: &mut TrackGraph, pages: &[AudioFeaturesPage]) -> usize {
    let mut updated = 0;
    for obj in pages.iter().flat_map(|p| p.audio_features.iter().flatten()) {
        if let Some(attrs) = graph.index_of(&obj.uri).and_then(|i| graph.attrs_mut(i)) {
            attrs.features = Some(obj.features);
            updated += 1;
        }
    }
    tracing::debug!(updated, "merged audio features");
    updated
}

/// First vocabulary entry contained in `tag`, ignoring case.
fn canonical_genre<'a>(tag: &str, vocabulary: &[&'a str]) -> Option<&'a str> {
    let tag = tag.to_lowercase();
    vocabulary.iter().copied().find(|g| tag.contains(&g.to_lowercase()))
}

/// Every vocabulary entry contained in any of `raw`, ignoring case.
pub fn normalize_genres<S: AsRef<str>>(raw: &[S], vocabulary: &[&str]) -> BTreeSet<String> {
    let lowered: Vec<String> = raw.iter().map(|t| t.as_ref().to_lowercase()).collect();
    vocabulary
        .iter()
        .filter(|g| {
            let g = g.to_lowercase();
            lowered.iter().any(|t| t.contains(&g))
        })
        .map(|g| g.to_string())
        .collect()
}

/// Count genre tags across all artists. A tag is counted under its first
/// matching vocabulary entry, or under its own text when nothing matches.
pub fn genre_counts(pages: &[ArtistsPage], vocabulary: &[&str]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for artist in pages.iter().flat_map(|p| p.artists.iter().flatten()) {
        for tag in &artist.genres {
            let key = canonical_genre(tag, vocabulary).map_or_else(|| tag.clone(), str::to_string);
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// The `k` most frequent genres, ties by name.
pub fn top_genres(counts: &BTreeMap<String, usize>, k: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    ranked.into_iter().take(k).map(|(g, _)| g.clone()).collect()
}

/// Set artist popularity and normalized genres on every node whose primary
/// artist appears in `pages`. Returns nodes updated.
pub fn merge_artist_details(graph: &mut TrackGraph, pages: &[ArtistsPage], vocabulary: &[&str]) -> usize {
    let by_uri: HashMap<&str, &ArtistObject> =
        pages.iter().flat_map(|p| p.artists.iter().flatten()).map(|a| (a.uri.as_str(), a)).collect();

    let targets: Vec<(usize, Option<u32>, BTreeSet<String>)> = graph
        .iter()
        .filter_map(|(idx, _, attrs)| {
            let artist = by_uri.get(attrs.track.artist_uri.as_deref()?)?;
            Some((idx, artist.popularity, normalize_genres(&artist.genres, vocabulary)))
        })
        .collect();

    let updated = targets.len();
    for (idx, popularity, genres) in targets {
        if let Some(attrs) = graph.attrs_mut(idx) {
            attrs.track.artist_popularity = popularity;
            attrs.track.genres = genres;
        }
    }
    tracing::debug!(updated, "merged artist details");
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchKind;
    use crate::Error;

    const TRACKS: &str = r#"{
        "tracks": [
            {"uri": "spotify:track:t1", "popularity": 71, "duration_ms": 201000,
             "artists": [{"uri": "spotify:artist:a1"}, {"uri": "spotify:artist:a9"}],
             "album": {"uri": "spotify:album:b1"}},
            null,
            {"uri": "spotify:track:unknown", "popularity": 5, "duration_ms": 1, "artists": []}
        ]
    }"#;

    const FEATURES: &str = r#"{
        "audio_features": [
            {"uri": "spotify:track:t2", "acousticness": 0.1, "danceability": 0.8, "duration_ms": 180000,
             "energy": 0.7, "instrumentalness": 0.0, "key": 5, "liveness": 0.1, "loudness": -5.2,
             "mode": 1, "speechiness": 0.05, "tempo": 120.0, "time_signature": 4, "valence": 0.6,
             "type": "audio_features", "id": "t2"}
        ]
    }"#;

    const ARTISTS: &str = r#"{
        "artists": [
            {"uri": "spotify:artist:a1", "popularity": 88, "genres": ["dance pop", "Canadian Hip Hop", "polka"]},
            {"uri": "spotify:artist:a2", "popularity": 10, "genres": ["indie rock"]}
        ]
    }"#;

    fn graph() -> TrackGraph {
        let mut b = TrackGraph::builder();
        b.add_edge("spotify:track:t1", "spotify:track:t2", 1.0).unwrap();
        b.build()
    }

    #[test]
    fn tracks_then_artists() {
        let mut g = graph();
        let tracks: TracksPage = parse_page(TRACKS).unwrap();
        assert_eq!(merge_track_details(&mut g, &[tracks]), 1);

        let t1 = &g.attrs(0).unwrap().track;
        assert_eq!(t1.popularity, Some(71));
        assert_eq!(t1.duration_ms, Some(201_000));
        assert_eq!(t1.artist_uri.as_deref(), Some("spotify:artist:a1"));
        assert_eq!(t1.album_uri.as_deref(), Some("spotify:album:b1"));
        assert_eq!(g.node_batch(BatchKind::Artists, 50), vec!["a1"]);

        let artists: ArtistsPage = parse_page(ARTISTS).unwrap();
        assert_eq!(merge_artist_details(&mut g, &[artists], &DEFAULT_GENRES), 1);
        let t1 = &g.attrs(0).unwrap().track;
        assert_eq!(t1.artist_popularity, Some(88));
        let genres: Vec<&str> = t1.genres.iter().map(String::as_str).collect();
        assert_eq!(genres, vec!["Hip Hop", "Pop"]);
        assert!(g.attrs(1).unwrap().track.genres.is_empty());
    }

    #[test]
    fn audio_features_are_attached() {
        let mut g = graph();
        let page: AudioFeaturesPage = parse_page(FEATURES).unwrap();
        assert_eq!(merge_audio_features(&mut g, &[page]), 1);
        let f = g.attrs(1).unwrap().features.unwrap();
        assert_eq!(f.key, 5.0);
        assert_eq!(f.loudness, -5.2);
        assert!(g.attrs(0).unwrap().features.is_none());
    }

    #[test]
    fn genre_counting_folds_into_vocabulary() {
        let artists: ArtistsPage = parse_page(ARTISTS).unwrap();
        let counts = genre_counts(&[artists], &DEFAULT_GENRES);
        assert_eq!(counts.get("Pop"), Some(&1));
        assert_eq!(counts.get("Hip Hop"), Some(&1));
        // earlier vocabulary entries win: "indie rock" counts as Rock
        assert_eq!(counts.get("Rock"), Some(&1));
        assert_eq!(counts.get("Indie"), None);
        assert_eq!(counts.get("polka"), Some(&1));
        assert_eq!(top_genres(&counts, 2), vec!["Hip Hop", "Pop"]);
    }

    #[test]
    fn normalization_is_case_insensitive() {
        let g = normalize_genres(&["UK POP", "country rap"], &DEFAULT_GENRES);
        let g: Vec<&str> = g.iter().map(String::as_str).collect();
        assert_eq!(g, vec!["Country", "Pop", "Rap"]);
    }

    #[test]
    fn malformed_page_is_a_payload_error() {
        let err = parse_page::<TracksPage>("{\"tracks\": 3}").unwrap_err();
        assert!(matches!(err, Error::Payload(_)));
    }
}
