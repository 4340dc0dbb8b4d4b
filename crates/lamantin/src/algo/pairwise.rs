use nalgebra::DMatrix;

/// Pairwise difference vectors and distances, allocated once per layout call and refreshed
/// in place every iteration.
#[derive(Debug, Clone)]
pub(crate) struct PairwiseScratch {
    n: usize,
    dim: usize,
    // delta[(i * n + j) * dim + c] = pos[i][c] - pos[j][c]
    delta: Vec<f64>,
    distance: DMatrix<f64>,
}

impl PairwiseScratch {
    pub fn new(n: usize, dim: usize) -> Self {
        Self {
            n,
            dim,
            delta: vec![0.0; n * n * dim],
            distance: DMatrix::zeros(n, n),
        }
    }

    pub fn refresh(&mut self, pos: &DMatrix<f64>) {
        debug_assert_eq!(pos.nrows(), self.n);
        debug_assert_eq!(pos.ncols(), self.dim);
        let (n, dim) = (self.n, self.dim);
        for i in 0..n {
            for j in (i + 1)..n {
                let mut sq = 0.0;
                for c in 0..dim {
                    let d = pos[(i, c)] - pos[(j, c)];
                    self.delta[(i * n + j) * dim + c] = d;
                    self.delta[(j * n + i) * dim + c] = -d;
                    sq += d * d;
                }
                let dist = sq.sqrt();
                self.distance[(i, j)] = dist;
                self.distance[(j, i)] = dist;
            }
        }
    }

    /// `pos[i] - pos[j]` as of the last refresh.
    pub fn delta(&self, i: usize, j: usize) -> &[f64] {
        let start = (i * self.n + j) * self.dim;
        &self.delta[start..start + self.dim]
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance[(i, j)]
    }
}

/// Adds `coef * v` to row `i` of `m`.
pub(crate) fn add_scaled(m: &mut DMatrix<f64>, i: usize, v: &[f64], coef: f64) {
    for (c, x) in v.iter().enumerate() {
        m[(i, c)] += coef * x;
    }
}

pub(crate) fn row_norm(m: &DMatrix<f64>, i: usize) -> f64 {
    m.row(i).norm()
}
