//! Smooth unconstrained minimization used by the stress layout.

pub mod lbfgs;
pub mod line_search;

pub use lbfgs::{Lbfgs, LbfgsOptions, LbfgsReport};
pub use line_search::{ArmijoBacktracking, LineSearchOutcome};

use nalgebra::DVector;

/// A differentiable cost function.
pub trait Objective {
    /// Returns `f(x)` and writes `grad f(x)` into `grad`.
    fn evaluate(&mut self, x: &DVector<f64>, grad: &mut DVector<f64>) -> f64;
}

impl<F> Objective for F
where
    F: FnMut(&DVector<f64>, &mut DVector<f64>) -> f64,
{
    fn evaluate(&mut self, x: &DVector<f64>, grad: &mut DVector<f64>) -> f64 {
        self(x, grad)
    }
}
