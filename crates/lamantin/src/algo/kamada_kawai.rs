//! Kamada-Kawai placement by stress minimization.
//!
//! Target distances are graph-theoretic (Floyd-Warshall over edge weights) unless the caller
//! supplies them. The stress `sum_{i<j} 0.5 * (|p_i - p_j| / d_ij - 1)^2` plus a weak pull of
//! the centroid towards the origin is minimized with L-BFGS over the flattened positions.

use super::{CommonOptions, LayoutTimings, Prepared, initial_positions, prepare, timing_enabled};
use crate::error::{Error, Result};
use crate::graph::{LayoutGraph, LayoutResult, LayoutStats, ResolvedGraph};
use crate::optimize::{Lbfgs, Objective};
use crate::random::SeededRandom;
use crate::rescale::rescale;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct KamadaKawaiOptions<N> {
    /// Target distances, rows and columns in graph node order. Must be symmetric; non-finite
    /// entries mean "unreachable" and the diagonal is ignored. Computed from shortest paths
    /// when absent.
    pub dist: Option<DMatrix<f64>>,
    /// Edge attribute holding the edge length for shortest paths. Edges without it measure 1.
    pub weight: Option<String>,
    pub common: CommonOptions<N>,
}

impl<N> Default for KamadaKawaiOptions<N> {
    fn default() -> Self {
        Self {
            dist: None,
            weight: Some("weight".to_string()),
            common: CommonOptions::default(),
        }
    }
}

/// Distance assigned to pairs with no connecting path.
pub const UNREACHABLE: f64 = 1e6;
const DISTANCE_EPSILON: f64 = 1e-3;
const CENTERING_WEIGHT: f64 = 1e-3;
const SYMMETRY_TOLERANCE: f64 = 1e-9;

pub fn layout<G>(graph: &G, opts: &KamadaKawaiOptions<G::Node>) -> Result<LayoutResult<G::Node>>
where
    G: LayoutGraph + ?Sized,
{
    let timing = timing_enabled();
    let mut timings = LayoutTimings::default();
    let total_start = timing.then(std::time::Instant::now);

    let resolve_start = timing.then(std::time::Instant::now);
    let setup = match prepare(graph, &opts.common, opts.weight.as_deref())? {
        Prepared::Trivial(result) => return Ok(result),
        Prepared::Run(setup) => setup,
    };
    let n = setup.graph.len();
    let dim = setup.dim;
    let dist = match &opts.dist {
        Some(d) => explicit_distances(d, n)?,
        None => shortest_paths(&setup.graph)?,
    };
    if let Some(s) = resolve_start {
        timings.resolve = s.elapsed();
    }

    let init_start = timing.then(std::time::Instant::now);
    let mut rng = SeededRandom::new(opts.common.seed);
    let start = initial_positions(
        &setup.graph.nodes,
        opts.common.pos.as_ref(),
        dim,
        &mut rng,
        |rng| default_start(n, dim, rng),
    );
    // Row-major flattening: node i occupies x[i * dim..(i + 1) * dim].
    let mut x = DVector::from_iterator(n * dim, start.transpose().iter().copied());
    if let Some(s) = init_start {
        timings.init = s.elapsed();
    }

    let simulate_start = timing.then(std::time::Instant::now);
    let mut stress = Stress::new(&dist, dim);
    let report = Lbfgs::default().minimize(&mut stress, &mut x);
    let mut pos = DMatrix::from_row_slice(n, dim, x.as_slice());
    if let Some(s) = simulate_start {
        timings.simulate = s.elapsed();
    }

    let rescale_start = timing.then(std::time::Instant::now);
    rescale(&mut pos, opts.common.scale, &setup.center)?;
    if let Some(s) = rescale_start {
        timings.rescale = s.elapsed();
    }

    tracing::debug!(
        target: "lamantin::kamada_kawai",
        nodes = n,
        edges = setup.graph.edges.len(),
        iterations = report.iterations,
        converged = report.converged,
        stress = report.value,
        gradient_norm = report.gradient_norm,
        "layout finished"
    );
    if let Some(s) = total_start {
        timings.total = s.elapsed();
        timings.report("kamada_kawai", n, setup.graph.edges.len());
    }

    Ok(LayoutResult {
        positions: super::to_position_map(&setup.graph.nodes, &pos),
        stats: LayoutStats {
            iterations: report.iterations,
            converged: report.converged,
        },
    })
}

/// All-pairs shortest paths. Pairs with no connecting path get [`UNREACHABLE`].
pub(crate) fn shortest_paths<N>(graph: &ResolvedGraph<N>) -> Result<DMatrix<f64>> {
    let n = graph.nodes.len();
    let mut dist = DMatrix::from_element(n, n, f64::INFINITY);
    for i in 0..n {
        dist[(i, i)] = 0.0;
    }
    for e in &graph.edges {
        if !(e.weight.is_finite() && e.weight >= 0.0) {
            return Err(Error::invalid(
                "weight",
                format!("edge length {} is not a non-negative number", e.weight),
            ));
        }
        let d = dist[(e.a, e.b)].min(e.weight);
        dist[(e.a, e.b)] = d;
        dist[(e.b, e.a)] = d;
    }

    for k in 0..n {
        for i in 0..n {
            let dik = dist[(i, k)];
            if dik.is_infinite() {
                continue;
            }
            for j in 0..n {
                let through = dik + dist[(k, j)];
                if through < dist[(i, j)] {
                    dist[(i, j)] = through;
                }
            }
        }
    }

    dist.apply(|d| {
        if d.is_infinite() {
            *d = UNREACHABLE;
        }
    });
    Ok(dist)
}

fn explicit_distances(d: &DMatrix<f64>, n: usize) -> Result<DMatrix<f64>> {
    if d.shape() != (n, n) {
        return Err(Error::invalid(
            "dist",
            format!("expected a {n}x{n} matrix, got {}x{}", d.nrows(), d.ncols()),
        ));
    }
    if d.iter().any(|&v| v < 0.0) {
        return Err(Error::invalid("dist", "distances must be non-negative"));
    }
    let mut out = d.map(|v| if v.is_finite() { v } else { UNREACHABLE });
    out.fill_diagonal(0.0);
    for i in 0..n {
        for j in (i + 1)..n {
            let (upper, lower) = (out[(i, j)], out[(j, i)]);
            if (upper - lower).abs() > SYMMETRY_TOLERANCE * upper.max(lower).max(1.0) {
                return Err(Error::invalid(
                    "dist",
                    format!("entry ({i}, {j}) is {upper} but ({j}, {i}) is {lower}"),
                ));
            }
        }
    }
    Ok(out)
}

/// Circle for two dimensions, evenly spaced line for one, seeded hypersphere otherwise.
fn default_start(n: usize, dim: usize, rng: &mut SeededRandom) -> DMatrix<f64> {
    match dim {
        1 => {
            let span = (n.max(2) - 1) as f64;
            DMatrix::from_fn(n, 1, |i, _| i as f64 / span)
        }
        2 => DMatrix::from_fn(n, 2, |i, c| {
            let angle = std::f64::consts::TAU * i as f64 / n as f64;
            if c == 0 { angle.cos() } else { angle.sin() }
        }),
        _ => {
            let mut out = DMatrix::zeros(n, dim);
            for i in 0..n {
                let v: Vec<f64> = (0..dim).map(|_| rng.next_signed()).collect();
                let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (c, x) in v.iter().enumerate() {
                        out[(i, c)] = x / norm;
                    }
                } else {
                    out[(i, 0)] = 1.0;
                }
            }
            out
        }
    }
}

struct Stress {
    inv_dist: DMatrix<f64>,
    dim: usize,
    centroid: Vec<f64>,
}

impl Stress {
    fn new(dist: &DMatrix<f64>, dim: usize) -> Self {
        Self {
            inv_dist: dist.map(|d| 1.0 / (d + DISTANCE_EPSILON)),
            dim,
            centroid: vec![0.0; dim],
        }
    }
}

impl Objective for Stress {
    fn evaluate(&mut self, x: &DVector<f64>, grad: &mut DVector<f64>) -> f64 {
        let dim = self.dim;
        let n = self.inv_dist.nrows();
        grad.fill(0.0);
        let mut cost = 0.0;

        for i in 0..n {
            for j in (i + 1)..n {
                let mut sq = 0.0;
                for c in 0..dim {
                    let d = x[i * dim + c] - x[j * dim + c];
                    sq += d * d;
                }
                let len = sq.sqrt();
                let inv = self.inv_dist[(i, j)];
                let offset = len * inv - 1.0;
                cost += 0.5 * offset * offset;
                // Coincident points have no defined direction.
                if len > 0.0 {
                    let coef = offset * inv / len;
                    for c in 0..dim {
                        let g = coef * (x[i * dim + c] - x[j * dim + c]);
                        grad[i * dim + c] += g;
                        grad[j * dim + c] -= g;
                    }
                }
            }
        }

        self.centroid.fill(0.0);
        for i in 0..n {
            for c in 0..dim {
                self.centroid[c] += x[i * dim + c];
            }
        }
        let sum_sq: f64 = self.centroid.iter().map(|v| v * v).sum();
        cost += 0.5 * CENTERING_WEIGHT * sum_sq;
        for i in 0..n {
            for c in 0..dim {
                grad[i * dim + c] += CENTERING_WEIGHT * self.centroid[c];
            }
        }
        cost
    }
}
