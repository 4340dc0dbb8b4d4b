//! ForceAtlas2 (Jacomy et al., 2014).
//!
//! Forces are expressed as coefficients on the pairwise difference vector
//! `pos[i] - pos[j]`:
//!
//! - repulsion: `scaling_ratio * mass[i] * mass[j] / d^2`
//! - attraction: `w` (linear) or `w * ln(1 + d) / d` (lin-log)
//! - gravity towards the centroid: `gravity * mass[i]` on the unit vector, or on the raw offset
//!   with strong gravity
//!
//! A single global speed adapts to the ratio of swing (how much each node's force changed
//! direction since the last iteration) to traction (how much it kept pushing the same way).

use super::pairwise::{PairwiseScratch, add_scaled, row_norm};
use super::{CommonOptions, LayoutTimings, Prepared, initial_positions, prepare, timing_enabled};
use crate::error::{Error, Result};
use crate::graph::{LayoutGraph, LayoutResult, LayoutStats, ResolvedEdge};
use crate::random::SeededRandom;
use crate::rescale::rescale;
use nalgebra::DMatrix;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct ForceAtlas2Options<N> {
    pub max_iter: usize,
    /// Tolerated oscillation; higher values trade precision for speed.
    pub jitter_tolerance: f64,
    pub scaling_ratio: f64,
    pub gravity: f64,
    /// Divide each endpoint's attraction by its own mass.
    pub distributed_attraction: bool,
    /// Gravity grows linearly with the distance from the centroid.
    pub strong_gravity: bool,
    /// Logarithmic attraction, which tightens clusters.
    pub linlog: bool,
    /// Scale each edge's attraction by `mean(mass) / mass[source]`, pushing hubs to the periphery
    /// and their leaves inwards.
    pub dissuade_hubs: bool,
    /// Mass overrides; the default mass is `degree + 1`.
    pub node_mass: FxHashMap<N, f64>,
    /// Size overrides (default 1). Supplying any size enables overlap prevention.
    pub node_size: FxHashMap<N, f64>,
    /// Edge attribute holding the attraction weight; `None` weighs every edge 1.
    pub weight: Option<String>,
    pub common: CommonOptions<N>,
}

impl<N> Default for ForceAtlas2Options<N> {
    fn default() -> Self {
        Self {
            max_iter: 100,
            jitter_tolerance: 1.0,
            scaling_ratio: 2.0,
            gravity: 1.0,
            distributed_attraction: false,
            strong_gravity: false,
            linlog: false,
            dissuade_hubs: false,
            node_mass: FxHashMap::default(),
            node_size: FxHashMap::default(),
            weight: None,
            common: CommonOptions::default(),
        }
    }
}

const MIN_DISTANCE: f64 = 0.01;
const CONVERGENCE_MOVEMENT: f64 = 1e-10;

const MIN_SPEED_EFFICIENCY: f64 = 0.05;
const MAX_JITTER: f64 = 10.0;
const MAX_SPEED_RISE: f64 = 0.5;
const SPEED_CEILING: f64 = 1000.0;
const SIZED_STEP_CAP: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
struct Forces {
    scaling_ratio: f64,
    gravity: f64,
    distributed_attraction: bool,
    strong_gravity: bool,
    linlog: bool,
    dissuade_hubs: bool,
    adjust_sizes: bool,
    jitter_tolerance: f64,
}

pub fn layout<G>(graph: &G, opts: &ForceAtlas2Options<G::Node>) -> Result<LayoutResult<G::Node>>
where
    G: LayoutGraph + ?Sized,
{
    for (name, value) in [
        ("jitter_tolerance", opts.jitter_tolerance),
        ("scaling_ratio", opts.scaling_ratio),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(Error::invalid(name, format!("{value} is not positive")));
        }
    }
    if !(opts.gravity.is_finite() && opts.gravity >= 0.0) {
        return Err(Error::invalid(
            "gravity",
            format!("{} is not a non-negative number", opts.gravity),
        ));
    }
    for (name, overrides) in [("node_mass", &opts.node_mass), ("node_size", &opts.node_size)] {
        if let Some((id, v)) = overrides.iter().find(|(_, v)| !(v.is_finite() && **v > 0.0)) {
            return Err(Error::invalid(name, format!("{id:?} has non-positive value {v}")));
        }
    }

    let timing = timing_enabled();
    let mut timings = LayoutTimings::default();
    let total_start = timing.then(std::time::Instant::now);

    let resolve_start = timing.then(std::time::Instant::now);
    let setup = match prepare(graph, &opts.common, opts.weight.as_deref())? {
        Prepared::Trivial(result) => return Ok(result),
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
    let mass: Vec<f64> = setup
        .graph
        .nodes
        .iter()
        .zip(&setup.graph.degree)
        .map(|(id, &deg)| opts.node_mass.get(id).copied().unwrap_or(deg as f64 + 1.0))
        .collect();
    let size: Vec<f64> = setup
        .graph
        .nodes
        .iter()
        .map(|id| opts.node_size.get(id).copied().unwrap_or(1.0))
        .collect();
    if let Some(s) = init_start {
        timings.init = s.elapsed();
    }

    let forces = Forces {
        scaling_ratio: opts.scaling_ratio,
        gravity: opts.gravity,
        distributed_attraction: opts.distributed_attraction,
        strong_gravity: opts.strong_gravity,
        linlog: opts.linlog,
        dissuade_hubs: opts.dissuade_hubs,
        adjust_sizes: !opts.node_size.is_empty(),
        jitter_tolerance: opts.jitter_tolerance,
    };

    let simulate_start = timing.then(std::time::Instant::now);
    let stats = simulate(
        &mut pos,
        &setup.graph.edges,
        &mass,
        &size,
        &forces,
        opts.max_iter,
    );
    if let Some(s) = simulate_start {
        timings.simulate = s.elapsed();
    }

    let rescale_start = timing.then(std::time::Instant::now);
    rescale(&mut pos, opts.common.scale, &setup.center)?;
    if let Some(s) = rescale_start {
        timings.rescale = s.elapsed();
    }

    tracing::debug!(
        target: "lamantin::forceatlas2",
        nodes = n,
        edges = setup.graph.edges.len(),
        iterations = stats.iterations,
        converged = stats.converged,
        "layout finished"
    );
    if let Some(s) = total_start {
        timings.total = s.elapsed();
        timings.report("forceatlas2", n, setup.graph.edges.len());
    }

    Ok(LayoutResult {
        positions: super::to_position_map(&setup.graph.nodes, &pos),
        stats,
    })
}

/// Global step-size controller.
#[derive(Debug, Clone, Copy)]
struct Speed {
    speed: f64,
    efficiency: f64,
}

impl Speed {
    fn new() -> Self {
        Self {
            speed: 1.0,
            efficiency: 1.0,
        }
    }

    fn adapt(&mut self, n: usize, swing: f64, traction: f64, jitter_tolerance: f64) {
        let n = n as f64;
        let optimal_jitter = 0.05 * n.sqrt();
        let min_jitter = optimal_jitter.sqrt();
        let other = MAX_JITTER.min(optimal_jitter * traction / (n * n));
        let mut jitter = jitter_tolerance * min_jitter.max(other);

        let ratio = if traction > 0.0 { swing / traction } else { 0.0 };
        if ratio > 2.0 {
            if self.efficiency > MIN_SPEED_EFFICIENCY {
                self.efficiency *= 0.5;
            }
            jitter = jitter.max(jitter_tolerance);
        }

        let target = if swing == 0.0 {
            f64::INFINITY
        } else {
            jitter * self.efficiency * traction / swing
        };

        if swing > jitter * traction {
            if self.efficiency > MIN_SPEED_EFFICIENCY {
                self.efficiency *= 0.7;
            }
        } else if self.speed < SPEED_CEILING {
            self.efficiency *= 1.3;
        }

        self.speed += (target - self.speed).min(MAX_SPEED_RISE * self.speed);
    }
}

fn apply_attraction(
    force: &mut DMatrix<f64>,
    scratch: &PairwiseScratch,
    edges: &[ResolvedEdge],
    mass: &[f64],
    mean_mass: f64,
    f: &Forces,
) {
    for e in edges {
        let d = scratch.distance(e.a, e.b).max(MIN_DISTANCE);
        let mut coef = e.weight;
        if f.dissuade_hubs {
            coef *= mean_mass / mass[e.a];
        }
        if f.linlog {
            coef *= (1.0 + d).ln() / d;
        }
        let (coef_a, coef_b) = if f.distributed_attraction {
            (coef / mass[e.a], coef / mass[e.b])
        } else {
            (coef, coef)
        };
        let delta = scratch.delta(e.a, e.b);
        add_scaled(force, e.a, delta, -coef_a);
        add_scaled(force, e.b, delta, coef_b);
    }
}

fn apply_repulsion(
    force: &mut DMatrix<f64>,
    scratch: &PairwiseScratch,
    mass: &[f64],
    size: &[f64],
    f: &Forces,
) {
    let n = mass.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let mut d = scratch.distance(i, j);
            if f.adjust_sizes {
                d -= size[i] + size[j];
            }
            let d = d.max(MIN_DISTANCE);
            let coef = f.scaling_ratio * mass[i] * mass[j] / (d * d);
            add_scaled(force, i, scratch.delta(i, j), coef);
            add_scaled(force, j, scratch.delta(i, j), -coef);
        }
    }
}

fn apply_gravity(force: &mut DMatrix<f64>, pos: &DMatrix<f64>, mass: &[f64], f: &Forces) {
    let (n, dim) = pos.shape();
    let centroid = pos.row_mean();
    let mut offset = vec![0.0; dim];
    for i in 0..n {
        for (c, o) in offset.iter_mut().enumerate() {
            *o = pos[(i, c)] - centroid[c];
        }
        let coef = if f.strong_gravity {
            f.gravity * mass[i]
        } else {
            let len = offset.iter().map(|v| v * v).sum::<f64>().sqrt();
            if len > 0.0 {
                f.gravity * mass[i] / len
            } else {
                0.0
            }
        };
        add_scaled(force, i, &offset, -coef);
    }
}

fn simulate(
    pos: &mut DMatrix<f64>,
    edges: &[ResolvedEdge],
    mass: &[f64],
    size: &[f64],
    f: &Forces,
    max_iter: usize,
) -> LayoutStats {
    let (n, dim) = pos.shape();
    let mut scratch = PairwiseScratch::new(n, dim);
    let mut force = DMatrix::<f64>::zeros(n, dim);
    let mut previous = DMatrix::<f64>::zeros(n, dim);
    let mut speed = Speed::new();
    let mut stats = LayoutStats::default();
    let mean_mass = mass.iter().sum::<f64>() / n as f64;

    for _ in 0..max_iter {
        stats.iterations += 1;
        scratch.refresh(pos);
        force.fill(0.0);

        apply_attraction(&mut force, &scratch, edges, mass, mean_mass, f);
        apply_repulsion(&mut force, &scratch, mass, size, f);
        apply_gravity(&mut force, pos, mass, f);

        let mut swing = 0.0;
        let mut traction = 0.0;
        for i in 0..n {
            let mut diff_sq = 0.0;
            let mut sum_sq = 0.0;
            for c in 0..dim {
                let (now, before) = (force[(i, c)], previous[(i, c)]);
                diff_sq += (now - before) * (now - before);
                sum_sq += (now + before) * (now + before);
            }
            swing += mass[i] * diff_sq.sqrt();
            traction += 0.5 * mass[i] * sum_sq.sqrt();
        }
        speed.adapt(n, swing, traction, f.jitter_tolerance);

        let mut movement = 0.0;
        for i in 0..n {
            let df = row_norm(&force, i);
            let factor = if f.adjust_sizes {
                if df > 0.0 {
                    let raw = 0.1 * speed.speed / (1.0 + (speed.speed * mass[i] * df).sqrt());
                    (raw * df).min(SIZED_STEP_CAP) / df
                } else {
                    0.0
                }
            } else {
                speed.speed / (1.0 + (speed.speed * mass[i] * df).sqrt())
            };
            for c in 0..dim {
                let step = force[(i, c)] * factor;
                pos[(i, c)] += step;
                movement += step.abs();
            }
        }

        std::mem::swap(&mut previous, &mut force);
        if movement < CONVERGENCE_MOVEMENT {
            stats.converged = true;
            break;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::{
        Forces, PairwiseScratch, Speed, apply_attraction, apply_gravity, apply_repulsion, simulate,
    };
    use crate::graph::ResolvedEdge;
    use nalgebra::DMatrix;

    fn default_forces() -> Forces {
        Forces {
            scaling_ratio: 2.0,
            gravity: 1.0,
            distributed_attraction: false,
            strong_gravity: false,
            linlog: false,
            dissuade_hubs: false,
            adjust_sizes: false,
            jitter_tolerance: 1.0,
        }
    }

    #[test]
    fn oscillation_halves_efficiency() {
        let mut s = Speed::new();
        s.adapt(10, 30.0, 10.0, 1.0);
        // Halved for swing/traction > 2, then cut by 0.7 for swing > jitter * traction.
        assert!((s.efficiency - 0.35).abs() < 1e-12);
        assert!(s.speed < 1.0);
    }

    #[test]
    fn speed_rises_at_most_fifty_percent() {
        let mut s = Speed::new();
        s.adapt(4, 0.0, 5.0, 1.0);
        assert_eq!(s.speed, 1.5);
        s.adapt(4, 0.0, 5.0, 1.0);
        assert_eq!(s.speed, 2.25);
    }

    #[test]
    fn two_connected_nodes_settle_at_force_balance() {
        // mass 2 each: attraction d + gravity 2 == repulsion 2*2*2/d  =>  d == 2.
        let mut pos = DMatrix::from_row_slice(2, 2, &[0.1, 0.2, 0.7, 0.4]);
        let edges = [ResolvedEdge {
            a: 0,
            b: 1,
            weight: 1.0,
        }];
        let stats = simulate(&mut pos, &edges, &[2.0, 2.0], &[1.0, 1.0], &default_forces(), 10_000);
        assert!(stats.converged, "stopped after {} iterations", stats.iterations);
        assert!(stats.iterations < 10_000);
        let d = (pos.row(0) - pos.row(1)).norm();
        assert!((d - 2.0).abs() < 1e-6, "distance {d}");
    }

    #[test]
    fn sized_steps_are_capped() {
        let mut pos = DMatrix::from_row_slice(2, 1, &[0.0, 1e-6]);
        let before = pos.clone();
        let mut forces = default_forces();
        forces.adjust_sizes = true;
        simulate(&mut pos, &[], &[1.0, 1.0], &[5.0, 5.0], &forces, 1);
        for i in 0..2 {
            assert!((pos[(i, 0)] - before[(i, 0)]).abs() <= 10.0 + 1e-9);
        }
    }

    fn refreshed(pos: &DMatrix<f64>) -> PairwiseScratch {
        let mut scratch = PairwiseScratch::new(pos.nrows(), pos.ncols());
        scratch.refresh(pos);
        scratch
    }

    fn edge(a: usize, b: usize, weight: f64) -> ResolvedEdge {
        ResolvedEdge { a, b, weight }
    }

    fn attraction(
        pos: &DMatrix<f64>,
        edges: &[ResolvedEdge],
        mass: &[f64],
        f: &Forces,
    ) -> DMatrix<f64> {
        let mut force = DMatrix::zeros(pos.nrows(), pos.ncols());
        let mean_mass = mass.iter().sum::<f64>() / mass.len() as f64;
        apply_attraction(&mut force, &refreshed(pos), edges, mass, mean_mass, f);
        force
    }

    #[test]
    fn linear_attraction_is_weight_times_distance() {
        let pos = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 0.0]);
        let force = attraction(&pos, &[edge(0, 1, 2.0)], &[1.0, 1.0], &default_forces());
        assert!((force[(0, 0)] - 6.0).abs() < 1e-12);
        assert!((force[(1, 0)] + 6.0).abs() < 1e-12);
        assert_eq!(force[(0, 1)], 0.0);
    }

    #[test]
    fn linlog_attraction_grows_with_log_distance() {
        let pos = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 0.0]);
        let mut forces = default_forces();
        forces.linlog = true;
        let force = attraction(&pos, &[edge(0, 1, 2.0)], &[1.0, 1.0], &forces);
        // Magnitude w * ln(1 + d) / d along a difference vector of length d.
        let expected = 2.0 * 4.0f64.ln();
        assert!((force[(0, 0)] - expected).abs() < 1e-12);
        assert!((force[(1, 0)] + expected).abs() < 1e-12);
    }

    #[test]
    fn distributed_attraction_divides_by_each_endpoint_mass() {
        let pos = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 0.0]);
        let mut forces = default_forces();
        forces.distributed_attraction = true;
        let force = attraction(&pos, &[edge(0, 1, 1.0)], &[2.0, 4.0], &forces);
        assert!((force[(0, 0)] - 1.5).abs() < 1e-12);
        assert!((force[(1, 0)] + 0.75).abs() < 1e-12);
    }

    #[test]
    fn hub_dissuasion_scales_by_mean_over_source_mass() {
        let pos = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 0.0]);
        let mut forces = default_forces();
        forces.dissuade_hubs = true;
        let mass = [3.0, 1.0];

        // Heavy source: 3 * (2 / 3).
        let from_hub = attraction(&pos, &[edge(0, 1, 1.0)], &mass, &forces);
        assert!((from_hub[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((from_hub[(1, 0)] + 2.0).abs() < 1e-12);

        // Light source: 3 * (2 / 1).
        let to_hub = attraction(&pos, &[edge(1, 0, 1.0)], &mass, &forces);
        assert!((to_hub[(0, 0)] - 6.0).abs() < 1e-12);
        assert!((to_hub[(1, 0)] + 6.0).abs() < 1e-12);

        let plain = attraction(&pos, &[edge(0, 1, 1.0)], &mass, &default_forces());
        assert!((plain[(0, 0)] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn repulsion_is_mass_product_over_squared_distance() {
        let pos = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 2.0, 0.0]);
        let scratch = refreshed(&pos);
        let mut force = DMatrix::zeros(2, 2);
        apply_repulsion(&mut force, &scratch, &[1.0, 2.0], &[0.5, 0.5], &default_forces());
        // 2 * 1 * 2 / 2^2 on a difference vector of length 2.
        assert!((force[(0, 0)] + 2.0).abs() < 1e-12);
        assert!((force[(1, 0)] - 2.0).abs() < 1e-12);

        let mut sized = default_forces();
        sized.adjust_sizes = true;
        force.fill(0.0);
        apply_repulsion(&mut force, &scratch, &[1.0, 2.0], &[0.5, 0.5], &sized);
        // Effective distance 2 - (0.5 + 0.5) = 1.
        assert!((force[(0, 0)] + 8.0).abs() < 1e-12);
    }

    #[test]
    fn strong_gravity_grows_with_offset_from_centroid() {
        // Centroid at x = 2.
        let pos = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 5.0, 0.0]);
        let mass = [1.0, 1.0, 1.0];

        let mut normal = DMatrix::zeros(3, 2);
        apply_gravity(&mut normal, &pos, &mass, &default_forces());
        for (i, expected) in [1.0, 1.0, -1.0].into_iter().enumerate() {
            assert!((normal[(i, 0)] - expected).abs() < 1e-12, "node {i}");
        }

        let mut forces = default_forces();
        forces.strong_gravity = true;
        let mut strong = DMatrix::zeros(3, 2);
        apply_gravity(&mut strong, &pos, &mass, &forces);
        for (i, expected) in [2.0, 1.0, -3.0].into_iter().enumerate() {
            assert!((strong[(i, 0)] - expected).abs() < 1e-12, "node {i}");
        }
    }
}
