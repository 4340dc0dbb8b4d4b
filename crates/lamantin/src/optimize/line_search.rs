use super::Objective;
use nalgebra::DVector;

/// Step taken when the proposed direction does not descend.
pub const MIN_STEP: f64 = 1e-10;

/// Backtracking search for a step satisfying the Armijo sufficient-decrease condition
/// `f(x + a*d) <= f(x) + c1 * a * (g . d)`.
#[derive(Debug, Clone, Copy)]
pub struct ArmijoBacktracking {
    pub c1: f64,
    pub shrink: f64,
    pub max_trials: usize,
    pub initial_step: f64,
}

impl Default for ArmijoBacktracking {
    fn default() -> Self {
        Self {
            c1: 1e-4,
            shrink: 0.9,
            max_trials: 20,
            initial_step: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchOutcome {
    pub step: f64,
    /// `f` at the returned point.
    pub value: f64,
    /// Whether the sufficient-decrease condition held. When it never does, the last (smallest)
    /// trial is returned.
    pub accepted: bool,
}

impl ArmijoBacktracking {
    /// Searches along `dir` from `x`, leaving the chosen point in `x_next` and its gradient in
    /// `grad_next`.
    #[allow(clippy::too_many_arguments)]
    pub fn search<O: Objective + ?Sized>(
        &self,
        objective: &mut O,
        x: &DVector<f64>,
        fx: f64,
        grad: &DVector<f64>,
        dir: &DVector<f64>,
        x_next: &mut DVector<f64>,
        grad_next: &mut DVector<f64>,
    ) -> LineSearchOutcome {
        let slope = grad.dot(dir);
        if !(slope < 0.0) {
            x_next.copy_from(x);
            x_next.axpy(MIN_STEP, dir, 1.0);
            let value = objective.evaluate(x_next, grad_next);
            return LineSearchOutcome {
                step: MIN_STEP,
                value,
                accepted: false,
            };
        }

        let mut step = self.initial_step;
        let mut outcome = LineSearchOutcome {
            step,
            value: fx,
            accepted: false,
        };
        for _ in 0..self.max_trials.max(1) {
            x_next.copy_from(x);
            x_next.axpy(step, dir, 1.0);
            let value = objective.evaluate(x_next, grad_next);
            outcome = LineSearchOutcome {
                step,
                value,
                accepted: value <= fx + self.c1 * step * slope,
            };
            if outcome.accepted {
                break;
            }
            step *= self.shrink;
        }
        outcome
    }
}
