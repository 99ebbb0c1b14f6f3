//! # trackwalk
//!
//! Track recommendation by biased random walks over a co-occurrence graph,
//! plus the network analysis that goes with it.
//!
//! A [`TrackGraph`] is an immutable snapshot: URIs, typed node attributes and
//! undirected weighted edges. Everything else borrows it.
//!
//! - **Recommendation**: [`recommend`] walks with restart from a seed node and
//!   counts visits. [`WalkMode::Occurrence`] follows edge weights;
//!   [`WalkMode::Content`] also favors neighbors with similar audio features.
//!   [`jaccard_similarity`] compares the two.
//! - **Communities**: [`louvain`] and [`walktrap`], both returning a
//!   [`Partition`].
//! - **Connectivity and centrality**: [`connected_components`],
//!   [`eccentricity`], [`degree_centrality`], [`closeness_centrality`],
//!   [`betweenness_centrality`], [`pagerank`].
//! - **Catalog plumbing**: [`TrackGraph::node_batch`] builds id batches for
//!   the catalog's bulk endpoints; with the `serde` feature, [`enrich`] merges
//!   the returned pages back into node attributes.
//!
//! Algorithms are generic over the adapter traits in [`graph`], so they also
//! run on [`AdjacencyMatrix`] or (feature `petgraph`) on `petgraph::Graph`.
//!
//! ```
//! use trackwalk::{TrackGraph, WalkConfig, WalkMode};
//!
//! let mut b = TrackGraph::builder();
//! b.add_cooccurrence(["spotify:track:x", "spotify:track:y", "spotify:track:z"]).unwrap();
//! let graph = b.build();
//!
//! let config = WalkConfig { seed: Some(7), ..WalkConfig::default() };
//! let recs = graph.recommend("spotify:track:x", &config, &WalkMode::Occurrence).unwrap();
//! assert!(recs.uris().all(|u| u != "spotify:track:x"));
//! ```

pub mod batch;
pub mod betweenness;
pub mod centrality;
pub mod distance;
#[cfg(feature = "serde")]
pub mod enrich;
pub mod features;
pub mod graph;
pub mod louvain;
pub mod pagerank;
pub mod partition;
pub mod recommend;
pub mod similarity;
pub mod store;
pub mod topk;
pub mod walktrap;

pub use batch::{batch, BatchKind, MAX_BATCH_SIZE};
pub use betweenness::betweenness_centrality;
pub use centrality::{closeness_centrality, degree_centrality, strength, ClosenessConfig};
pub use distance::{component_eccentricity, diameter, eccentricity, radius};
pub use features::{catalog_id, AudioFeatures, FeatureKey, NodeAttrs, NodeKind, TrackMeta};
pub use graph::{AdjacencyMatrix, Graph, GraphRef, WeightedGraph, WeightedGraphRef};
pub use louvain::{louvain, LouvainConfig};
pub use pagerank::{pagerank, pagerank_checked, pagerank_run, PageRankConfig, PageRankRun};
pub use partition::{
    component_partition, component_stats, connected_components, modularity, ComponentStats, Partition,
};
pub use recommend::{
    recommend, recommend_many, ContentBias, OccurrenceBias, RankedTracks, Recommendations, TransitionBias,
    WalkConfig, WalkMode,
};
pub use similarity::{jaccard_index, jaccard_similarity, jaccard_similarity_ranked};
pub use store::{TrackGraph, TrackGraphBuilder};
pub use topk::{normalize, top_k};
pub use walktrap::{walktrap, WalktrapConfig};

/// Errors returned by graph construction, walks and analysis.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("node index {0} out of bounds")]
    NodeOutOfBounds(usize),

    #[error("graph is disconnected ({components} components)")]
    Disconnected { components: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A catalog payload that does not match the expected shape.
    #[cfg(feature = "serde")]
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
