pub mod forceatlas2;
pub mod fruchterman_reingold;
pub mod kamada_kawai;
mod pairwise;

pub use forceatlas2::ForceAtlas2Options;
pub use fruchterman_reingold::FruchtermanReingoldOptions;
pub use kamada_kawai::KamadaKawaiOptions;

use crate::error::{Error, Result};
use crate::graph::{LayoutGraph, LayoutResult, LayoutStats, NodeId, PositionMap, ResolvedGraph};
use crate::random::SeededRandom;
use nalgebra::DMatrix;

#[derive(Debug, Clone)]
pub enum Algorithm<N> {
    /// Repulsion/attraction simulation with a linear cooling schedule.
    FruchtermanReingold(FruchtermanReingoldOptions<N>),
    /// Adaptive-speed simulation driven by swing and traction.
    ForceAtlas2(ForceAtlas2Options<N>),
    /// Stress majorization minimized with L-BFGS.
    KamadaKawai(KamadaKawaiOptions<N>),
}

/// Placement parameters shared by every algorithm.
#[derive(Debug, Clone)]
pub struct CommonOptions<N> {
    /// Initial positions for some or all nodes. Missing nodes are placed uniformly at random
    /// inside the bounding box of the supplied ones.
    pub pos: Option<PositionMap<N>>,
    pub scale: f64,
    /// Defaults to the origin. Must have exactly `dim` components.
    pub center: Option<Vec<f64>>,
    pub dim: usize,
    pub seed: Option<u64>,
}

impl<N> Default for CommonOptions<N> {
    fn default() -> Self {
        Self {
            pos: None,
            scale: 1.0,
            center: None,
            dim: 2,
            seed: None,
        }
    }
}

pub(crate) struct Setup<N> {
    pub graph: ResolvedGraph<N>,
    pub center: Vec<f64>,
    pub dim: usize,
}

pub(crate) enum Prepared<N> {
    /// Zero or one node: nothing to simulate.
    Trivial(LayoutResult<N>),
    Run(Setup<N>),
}

/// Validates the shared parameters, resolves the graph and short-circuits degenerate node counts.
pub(crate) fn prepare<G>(
    graph: &G,
    common: &CommonOptions<G::Node>,
    weight_attr: Option<&str>,
) -> Result<Prepared<G::Node>>
where
    G: LayoutGraph + ?Sized,
{
    let dim = common.dim;
    if dim == 0 {
        return Err(Error::invalid("dim", "layout dimension must be at least 1"));
    }
    let center = match &common.center {
        Some(c) if c.len() != dim => {
            return Err(Error::CenterDimension { dim, len: c.len() });
        }
        Some(c) => c.clone(),
        None => vec![0.0; dim],
    };
    if center.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid("center", "components must be finite"));
    }
    if !(common.scale.is_finite() && common.scale > 0.0) {
        return Err(Error::invalid(
            "scale",
            format!("{} is not a positive number", common.scale),
        ));
    }
    if let Some(pos) = &common.pos {
        for (id, p) in pos {
            if p.len() != dim {
                return Err(Error::invalid(
                    "pos",
                    format!("{id:?} has {} components, expected {dim}", p.len()),
                ));
            }
            if p.iter().any(|v| !v.is_finite()) {
                return Err(Error::invalid("pos", format!("{id:?} is not finite")));
            }
        }
    }

    let resolved = ResolvedGraph::from_graph(graph, weight_attr)?;
    match resolved.len() {
        0 => Ok(Prepared::Trivial(LayoutResult {
            positions: PositionMap::new(),
            stats: LayoutStats::default(),
        })),
        1 => {
            let mut positions = PositionMap::new();
            positions.insert(resolved.nodes[0].clone(), center);
            Ok(Prepared::Trivial(LayoutResult {
                positions,
                stats: LayoutStats::default(),
            }))
        }
        _ => Ok(Prepared::Run(Setup {
            graph: resolved,
            center,
            dim,
        })),
    }
}

/// Starting positions: supplied ones where present, random inside their bounding box elsewhere,
/// and `fallback` when nothing was supplied.
pub(crate) fn initial_positions<N: NodeId>(
    nodes: &[N],
    pos: Option<&PositionMap<N>>,
    dim: usize,
    rng: &mut SeededRandom,
    fallback: impl FnOnce(&mut SeededRandom) -> DMatrix<f64>,
) -> DMatrix<f64> {
    let Some(pos) = pos.filter(|p| !p.is_empty()) else {
        return fallback(rng);
    };

    let mut min = vec![f64::INFINITY; dim];
    let mut max = vec![f64::NEG_INFINITY; dim];
    for p in pos.values() {
        for c in 0..dim {
            min[c] = min[c].min(p[c]);
            max[c] = max[c].max(p[c]);
        }
    }
    // A flat box would stack every missing node on one hyperplane.
    let extent: Vec<f64> = min
        .iter()
        .zip(&max)
        .map(|(lo, hi)| if hi > lo { hi - lo } else { 1.0 })
        .collect();

    let mut out = DMatrix::<f64>::zeros(nodes.len(), dim);
    for (i, id) in nodes.iter().enumerate() {
        match pos.get(id) {
            Some(p) => {
                for c in 0..dim {
                    out[(i, c)] = p[c];
                }
            }
            None => {
                for c in 0..dim {
                    out[(i, c)] = min[c] + rng.next_f64() * extent[c];
                }
            }
        }
    }
    out
}

pub(crate) fn to_position_map<N: NodeId>(nodes: &[N], pos: &DMatrix<f64>) -> PositionMap<N> {
    nodes
        .iter()
        .cloned()
        .zip(pos.row_iter().map(|row| row.iter().copied().collect::<Vec<f64>>()))
        .collect()
}

/// Per-phase wall-clock timings, collected only when `LAMANTIN_TIMING=1`.
#[derive(Debug, Default, Clone)]
pub(crate) struct LayoutTimings {
    pub resolve: std::time::Duration,
    pub init: std::time::Duration,
    pub simulate: std::time::Duration,
    pub rescale: std::time::Duration,
    pub total: std::time::Duration,
}

pub(crate) fn timing_enabled() -> bool {
    std::env::var("LAMANTIN_TIMING").ok().as_deref() == Some("1")
}

impl LayoutTimings {
    pub fn report(&self, algorithm: &'static str, nodes: usize, edges: usize) {
        tracing::debug!(
            target: "lamantin::timing",
            algorithm,
            nodes,
            edges,
            total = ?self.total,
            resolve = ?self.resolve,
            init = ?self.init,
            simulate = ?self.simulate,
            rescale = ?self.rescale,
            "layout timing"
        );
    }
}
