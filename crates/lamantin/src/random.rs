//! Seeded pseudo-random source used for initial placement.
//!
//! A plain 64-bit linear congruential generator (`state = a * state + c mod 2^64`, Knuth's MMIX
//! constants). Two instances created with the same seed produce the same sequence; nothing is
//! shared between instances.

use nalgebra::DMatrix;

#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u64,
}

/// A scalar or a nested array of draws, shaped like the request passed to
/// [`SeededRandom::fill`].
#[derive(Debug, Clone, PartialEq)]
pub enum Draw {
    Scalar(f64),
    Array(Vec<Draw>),
}

impl Draw {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Draw::Scalar(v) => Some(*v),
            Draw::Array(_) => None,
        }
    }

    /// All scalars in row-major order.
    pub fn flatten(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<f64>) {
        match self {
            Draw::Scalar(v) => out.push(*v),
            Draw::Array(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl SeededRandom {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    /// `None` seeds from the system clock, so unseeded layouts differ between calls.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            state: seed.unwrap_or_else(clock_seed),
        }
    }

    fn step(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }

    /// Uniform draw in `[0, 1)` with 53 bits of precision (the high bits of the state).
    pub fn next_f64(&mut self) -> f64 {
        let u = self.step() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    /// Uniform draw in `[-1, 1)`.
    pub fn next_signed(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }

    /// Draws shaped like `shape`: `[]` is a scalar, `[n]` a vector, `[n, m]` a matrix, and so on.
    pub fn fill(&mut self, shape: &[usize]) -> Draw {
        match shape.split_first() {
            None => Draw::Scalar(self.next_f64()),
            Some((&len, rest)) => Draw::Array((0..len).map(|_| self.fill(rest)).collect()),
        }
    }

    /// A `rows x cols` matrix of `[0, 1)` draws, filled row by row.
    pub fn fill_matrix(&mut self, rows: usize, cols: usize) -> DMatrix<f64> {
        DMatrix::from_row_iterator(rows, cols, (0..rows * cols).map(|_| self.next_f64()))
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E3779B97F4A7C15)
}
