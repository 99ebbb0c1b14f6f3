//! Typed node attributes: track metadata and audio features.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// What a catalog URI names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NodeKind {
    #[default]
    Track,
    Artist,
    Playlist,
}

impl NodeKind {
    /// Infer the kind from the middle segment of `scheme:kind:id`.
    ///
    /// Anything that is not recognizably an artist or playlist is a track.
    pub fn from_uri(uri: &str) -> Self {
        let mut parts = uri.split(':');
        match (parts.next(), parts.next()) {
            (Some(_), Some("artist")) => Self::Artist,
            (Some(_), Some("playlist")) => Self::Playlist,
            _ => Self::Track,
        }
    }
}

/// Catalog id: the last `:`-separated segment of a URI.
pub fn catalog_id(uri: &str) -> &str {
    uri.rsplit(':').next().unwrap_or(uri)
}

/// Metadata merged in from the catalog. Every field is optional until enriched.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackMeta {
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    pub artist_uri: Option<String>,
    pub album_uri: Option<String>,
    pub playlist_uri: Option<String>,
    pub artist_popularity: Option<u32>,
    pub genres: BTreeSet<String>,
}

/// All attributes a node can carry.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeAttrs {
    pub kind: NodeKind,
    pub track: TrackMeta,
    pub features: Option<AudioFeatures>,
}

impl NodeAttrs {
    pub fn for_uri(uri: &str) -> Self {
        Self { kind: NodeKind::from_uri(uri), ..Self::default() }
    }
}

/// Per-track audio features as reported by the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioFeatures {
    pub acousticness: f64,
    pub danceability: f64,
    pub duration_ms: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub key: f64,
    pub liveness: f64,
    pub loudness: f64,
    pub mode: f64,
    pub speechiness: f64,
    pub tempo: f64,
    pub time_signature: f64,
    pub valence: f64,
}

impl AudioFeatures {
    pub fn get(&self, key: FeatureKey) -> f64 {
        match key {
            FeatureKey::Acousticness => self.acousticness,
            FeatureKey::Danceability => self.danceability,
            FeatureKey::DurationMs => self.duration_ms,
            FeatureKey::Energy => self.energy,
            FeatureKey::Instrumentalness => self.instrumentalness,
            FeatureKey::Key => self.key,
            FeatureKey::Liveness => self.liveness,
            FeatureKey::Loudness => self.loudness,
            FeatureKey::Mode => self.mode,
            FeatureKey::Speechiness => self.speechiness,
            FeatureKey::Tempo => self.tempo,
            FeatureKey::TimeSignature => self.time_signature,
            FeatureKey::Valence => self.valence,
        }
    }

    /// Project onto `keys`, in order.
    pub fn project(&self, keys: &[FeatureKey]) -> Vec<f64> {
        keys.iter().map(|&k| self.get(k)).collect()
    }
}

/// Names of the numeric audio features usable for content weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FeatureKey {
    Acousticness,
    Danceability,
    DurationMs,
    Energy,
    Instrumentalness,
    Key,
    Liveness,
    Loudness,
    Mode,
    Speechiness,
    Tempo,
    TimeSignature,
    Valence,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 13] = [
        Self::Acousticness,
        Self::Danceability,
        Self::DurationMs,
        Self::Energy,
        Self::Instrumentalness,
        Self::Key,
        Self::Liveness,
        Self::Loudness,
        Self::Mode,
        Self::Speechiness,
        Self::Tempo,
        Self::TimeSignature,
        Self::Valence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acousticness => "acousticness",
            Self::Danceability => "danceability",
            Self::DurationMs => "duration_ms",
            Self::Energy => "energy",
            Self::Instrumentalness => "instrumentalness",
            Self::Key => "key",
            Self::Liveness => "liveness",
            Self::Loudness => "loudness",
            Self::Mode => "mode",
            Self::Speechiness => "speechiness",
            Self::Tempo => "tempo",
            Self::TimeSignature => "time_signature",
            Self::Valence => "valence",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown audio feature `{s}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_id_from_uri() {
        assert_eq!(NodeKind::from_uri("spotify:track:abc"), NodeKind::Track);
        assert_eq!(NodeKind::from_uri("spotify:artist:abc"), NodeKind::Artist);
        assert_eq!(NodeKind::from_uri("spotify:playlist:abc"), NodeKind::Playlist);
        assert_eq!(NodeKind::from_uri("plain-id"), NodeKind::Track);
        assert_eq!(catalog_id("spotify:track:6O6M7pJLABmfBRoGZMu76Y"), "6O6M7pJLABmfBRoGZMu76Y");
        assert_eq!(catalog_id("plain-id"), "plain-id");
    }

    #[test]
    fn feature_key_names_round_trip() {
        for k in FeatureKey::ALL {
            assert_eq!(k.as_str().parse::<FeatureKey>().unwrap(), k);
        }
        assert!("bpm".parse::<FeatureKey>().is_err());
    }

    #[test]
    fn project_keeps_key_order() {
        let f = AudioFeatures { energy: 0.9, valence: 0.1, ..AudioFeatures::default() };
        assert_eq!(f.project(&[FeatureKey::Valence, FeatureKey::Energy]), vec![0.1, 0.9]);
    }
}
