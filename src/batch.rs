//! Catalog-id batching for bulk metadata lookups.
//!
//! The metadata provider accepts at most [`MAX_BATCH_SIZE`] comma-joined ids
//! per request. Every batch produced here respects that ceiling whatever size
//! the caller asks for.

use crate::features::catalog_id;
use crate::store::TrackGraph;

/// Hard ceiling on ids per provider request.
pub const MAX_BATCH_SIZE: usize = 50;

/// Which catalog object a batch addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BatchKind {
    Tracks,
    Artists,
    Albums,
    Playlists,
}

/// Split `ids` into comma-joined chunks of at most `batch_size` ids.
///
/// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
pub fn batch<S: AsRef<str>>(ids: &[S], batch_size: usize) -> Vec<String> {
    let size = batch_size.clamp(1, MAX_BATCH_SIZE);
    ids.chunks(size)
        .map(|chunk| chunk.iter().map(|s| s.as_ref()).collect::<Vec<&str>>().join(","))
        .collect()
}

impl TrackGraph {
    /// Catalog ids of `kind` for every node that has one, in node order.
    ///
    /// For [`BatchKind::Tracks`] the node's own URI is used. The other kinds read
    /// the matching metadata URI; nodes without it are skipped.
    pub fn catalog_ids(&self, kind: BatchKind) -> Vec<&str> {
        self.iter()
            .filter_map(|(_, uri, attrs)| {
                let source = match kind {
                    BatchKind::Tracks => Some(uri),
                    BatchKind::Artists => attrs.track.artist_uri.as_deref(),
                    BatchKind::Albums => attrs.track.album_uri.as_deref(),
                    BatchKind::Playlists => attrs.track.playlist_uri.as_deref(),
                };
                source.map(catalog_id)
            })
            .collect()
    }

    /// [`catalog_ids`](Self::catalog_ids) split into provider-sized batches.
    pub fn node_batch(&self, kind: BatchKind, batch_size: usize) -> Vec<String> {
        let ids = self.catalog_ids(kind);
        let batches = batch(&ids, batch_size);
        tracing::debug!(?kind, ids = ids.len(), batches = batches.len(), "built catalog batches");
        batches
    }
}
