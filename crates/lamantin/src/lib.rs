#![forbid(unsafe_code)]

//! Headless force-directed graph layout.
//!
//! Three models share one input/output contract: Fruchterman-Reingold (repulsion/attraction
//! with a cooling schedule), ForceAtlas2 (adaptive speed driven by swing and traction) and
//! Kamada-Kawai (stress minimized with L-BFGS). Every call is synchronous, owns its scratch
//! state and is reproducible for a given seed.

pub mod algo;
pub mod error;
pub mod graph;
pub mod optimize;
pub mod random;
pub mod rescale;

pub use algo::{
    Algorithm, CommonOptions, ForceAtlas2Options, FruchtermanReingoldOptions, KamadaKawaiOptions,
};
pub use error::{Error, Result};
pub use graph::{
    Edge, Graph, LayoutGraph, LayoutResult, LayoutStats, NodeId, NodeList, Position, PositionMap,
};
pub use random::SeededRandom;
pub use rescale::{rescale, rescale_map};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Headless layout entry point.
pub fn layout<G>(graph: &G, algorithm: Algorithm<G::Node>) -> Result<LayoutResult<G::Node>>
where
    G: LayoutGraph + ?Sized,
{
    match algorithm {
        Algorithm::FruchtermanReingold(opts) => algo::fruchterman_reingold::layout(graph, &opts),
        Algorithm::ForceAtlas2(opts) => algo::forceatlas2::layout(graph, &opts),
        Algorithm::KamadaKawai(opts) => algo::kamada_kawai::layout(graph, &opts),
    }
}
