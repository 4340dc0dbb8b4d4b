//! Fruchterman-Reingold force-directed placement.
//!
//! Every unordered pair repels with magnitude `k^2 / d`; every edge attracts with magnitude
//! `w * d^2 / k`. Per-node displacement is capped by a temperature that cools linearly to zero,
//! so early iterations make large moves and late ones only refine.

use super::pairwise::{PairwiseScratch, add_scaled, row_norm};
use super::{CommonOptions, LayoutTimings, Prepared, initial_positions, prepare, timing_enabled};
use crate::error::{Error, Result};
use crate::graph::{LayoutGraph, LayoutResult, LayoutStats, NodeId};
use crate::random::SeededRandom;
use crate::rescale::rescale;
use nalgebra::DMatrix;

#[derive(Debug, Clone)]
pub struct FruchtermanReingoldOptions<N> {
    /// Optimal distance between nodes. Defaults to `1 / sqrt(n)`.
    pub k: Option<f64>,
    pub iterations: usize,
    /// Stop once the mean per-node displacement of an iteration falls below this value.
    pub threshold: f64,
    /// Edge attribute holding the spring weight. Edges without it weigh 1.
    pub weight: Option<String>,
    /// Nodes that keep their initial position. Each must be a node of the graph with an entry
    /// in `common.pos`. Fixing any node disables rescaling.
    pub fixed: Vec<N>,
    pub common: CommonOptions<N>,
}

impl<N> Default for FruchtermanReingoldOptions<N> {
    fn default() -> Self {
        Self {
            k: None,
            iterations: 50,
            threshold: 1e-4,
            weight: Some("weight".to_string()),
            fixed: Vec::new(),
            common: CommonOptions::default(),
        }
    }
}

const INITIAL_TEMPERATURE: f64 = 0.1;
const MIN_DISTANCE: f64 = 0.1;

pub fn layout<G>(
    graph: &G,
    opts: &FruchtermanReingoldOptions<G::Node>,
) -> Result<LayoutResult<G::Node>>
where
    G: LayoutGraph + ?Sized,
{
    if let Some(k) = opts.k {
        if !(k.is_finite() && k > 0.0) {
            return Err(Error::invalid("k", format!("{k} is not a positive distance")));
        }
    }
    if !(opts.threshold.is_finite() && opts.threshold >= 0.0) {
        return Err(Error::invalid(
            "threshold",
            format!("{} is not a non-negative number", opts.threshold),
        ));
    }
    if !opts.fixed.is_empty() {
        let Some(pos) = &opts.common.pos else {
            return Err(Error::invalid(
                "fixed",
                "nodes are fixed without initial positions",
            ));
        };
        if let Some(id) = opts.fixed.iter().find(|id| !pos.contains_key(*id)) {
            return Err(Error::invalid(
                "fixed",
                format!("{id:?} has no initial position"),
            ));
        }
    }

    let timing = timing_enabled();
    let mut timings = LayoutTimings::default();
    let total_start = timing.then(std::time::Instant::now);

    let resolve_start = timing.then(std::time::Instant::now);
    let setup = match prepare(graph, &opts.common, opts.weight.as_deref())? {
        Prepared::Trivial(result) => {
            let nodes: Vec<G::Node> = result.positions.keys().cloned().collect();
            fixed_mask(&nodes, &opts.fixed)?;
            return Ok(result);
        }
        Prepared::Run(setup) => setup,
    };
    if let Some(s) = resolve_start {
        timings.resolve = s.elapsed();
    }
    let n = setup.graph.len();
    let dim = setup.dim;

    let init_start = timing.then(std::time::Instant::now);
    let mut rng = SeededRandom::new(opts.common.seed);
    let mut pos = initial_positions(
        &setup.graph.nodes,
        opts.common.pos.as_ref(),
        dim,
        &mut rng,
        |rng| rng.fill_matrix(n, dim),
    );
    let fixed = fixed_mask(&setup.graph.nodes, &opts.fixed)?;
    let any_fixed = fixed.iter().any(|&f| f);
    if let Some(s) = init_start {
        timings.init = s.elapsed();
    }

    let simulate_start = timing.then(std::time::Instant::now);
    let k = opts.k.unwrap_or_else(|| (1.0 / n as f64).sqrt());
    let adjacency = setup.graph.adjacency();
    let stats = simulate(&mut pos, &adjacency, &fixed, k, opts.iterations, opts.threshold);
    if let Some(s) = simulate_start {
        timings.simulate = s.elapsed();
    }

    let rescale_start = timing.then(std::time::Instant::now);
    if !any_fixed {
        rescale(&mut pos, opts.common.scale, &setup.center)?;
    }
    if let Some(s) = rescale_start {
        timings.rescale = s.elapsed();
    }

    tracing::debug!(
        target: "lamantin::fruchterman_reingold",
        nodes = n,
        edges = setup.graph.edges.len(),
        iterations = stats.iterations,
        converged = stats.converged,
        k,
        "layout finished"
    );
    if let Some(s) = total_start {
        timings.total = s.elapsed();
        timings.report("fruchterman_reingold", n, setup.graph.edges.len());
    }

    Ok(LayoutResult {
        positions: super::to_position_map(&setup.graph.nodes, &pos),
        stats,
    })
}

fn fixed_mask<N: NodeId>(nodes: &[N], fixed: &[N]) -> Result<Vec<bool>> {
    let mut mask = vec![false; nodes.len()];
    for id in fixed {
        let Some(idx) = nodes.iter().position(|n| n == id) else {
            return Err(Error::invalid(
                "fixed",
                format!("{id:?} is not a node of the graph"),
            ));
        };
        mask[idx] = true;
    }
    Ok(mask)
}

fn simulate(
    pos: &mut DMatrix<f64>,
    adjacency: &DMatrix<f64>,
    fixed: &[bool],
    k: f64,
    iterations: usize,
    threshold: f64,
) -> LayoutStats {
    let (n, dim) = pos.shape();
    let mut scratch = PairwiseScratch::new(n, dim);
    let mut displacement = DMatrix::<f64>::zeros(n, dim);

    let mut temperature = INITIAL_TEMPERATURE;
    let cooling = temperature / (iterations as f64 + 1.0);
    let mut stats = LayoutStats::default();

    for _ in 0..iterations {
        stats.iterations += 1;
        scratch.refresh(pos);
        displacement.fill(0.0);

        for i in 0..n {
            for j in (i + 1)..n {
                let d = scratch.distance(i, j).max(MIN_DISTANCE);
                // Along the unit vector (pos[i] - pos[j]) / d: k^2/d outwards, w*d^2/k inwards.
                let coef = k * k / (d * d) - adjacency[(i, j)] * d / k;
                add_scaled(&mut displacement, i, scratch.delta(i, j), coef);
                add_scaled(&mut displacement, j, scratch.delta(i, j), -coef);
            }
        }

        let mut moved_sq = 0.0;
        for i in 0..n {
            if fixed[i] {
                continue;
            }
            let len = row_norm(&displacement, i);
            let factor = if len > temperature {
                temperature / len
            } else {
                1.0
            };
            for c in 0..dim {
                let step = displacement[(i, c)] * factor;
                pos[(i, c)] += step;
                moved_sq += step * step;
            }
        }

        temperature -= cooling;
        if moved_sq.sqrt() / (n as f64) < threshold {
            stats.converged = true;
            break;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::simulate;
    use nalgebra::DMatrix;

    #[test]
    fn displacement_never_exceeds_temperature() {
        // Two nodes almost on top of each other: the raw repulsion is huge.
        let mut pos = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1e-3, 0.0]);
        let adjacency = DMatrix::zeros(2, 2);
        simulate(&mut pos, &adjacency, &[false, false], 1.0, 1, 0.0);
        assert!((pos[(0, 0)] + 0.1).abs() < 1e-12, "moved {}", pos[(0, 0)]);
        assert!((pos[(1, 0)] - (1e-3 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn fixed_nodes_do_not_move() {
        let mut pos = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 0.5, 0.0, 0.0, 0.5]);
        let mut adjacency = DMatrix::zeros(3, 3);
        adjacency[(0, 1)] = 1.0;
        adjacency[(1, 0)] = 1.0;
        simulate(&mut pos, &adjacency, &[true, false, false], 0.3, 20, 0.0);
        assert_eq!(pos[(0, 0)], 0.0);
        assert_eq!(pos[(0, 1)], 0.0);
        assert_ne!(pos[(1, 0)], 0.5);
    }

    #[test]
    fn springs_settle_near_equilibrium_distance() {
        // Repulsion k^2/d balances attraction d^2/k at d == k.
        let mut pos = DMatrix::from_row_slice(2, 1, &[0.0, 2.0]);
        let mut adjacency = DMatrix::zeros(2, 2);
        adjacency[(0, 1)] = 1.0;
        adjacency[(1, 0)] = 1.0;
        let stats = simulate(&mut pos, &adjacency, &[false, false], 0.5, 500, 0.0);
        assert_eq!(stats.iterations, 500);
        assert!(((pos[(1, 0)] - pos[(0, 0)]) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn heavier_springs_settle_closer() {
        // Balance k^2/d == w*d^2/k puts the pair at k / w^(1/3).
        let mut pos = DMatrix::from_row_slice(2, 1, &[0.0, 2.0]);
        let mut adjacency = DMatrix::zeros(2, 2);
        adjacency[(0, 1)] = 8.0;
        adjacency[(1, 0)] = 8.0;
        simulate(&mut pos, &adjacency, &[false, false], 0.5, 500, 0.0);
        assert!(((pos[(1, 0)] - pos[(0, 0)]) - 0.25).abs() < 2e-3);
    }
}
