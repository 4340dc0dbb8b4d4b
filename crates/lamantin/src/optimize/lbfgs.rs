//! Limited-memory BFGS.
//!
//! The last `memory` curvature pairs `(s, y)` live in a fixed ring buffer; the search direction
//! comes from the standard two-loop recursion with the initial Hessian scaled by
//! `s.y / y.y` of the newest pair. A direction that does not descend takes the line search's
//! minimal step and clears the history, so the next iteration starts from steepest descent.

use super::Objective;
use super::line_search::ArmijoBacktracking;
use nalgebra::DVector;

// Curvature pairs with `s.y` at or below this are skipped to keep the inverse Hessian positive
// definite.
const MIN_CURVATURE: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct LbfgsOptions {
    pub memory: usize,
    pub max_iter: usize,
    /// Converged once the Euclidean norm of the gradient drops below this.
    pub gradient_tolerance: f64,
    pub line_search: ArmijoBacktracking,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            memory: 10,
            max_iter: 500,
            gradient_tolerance: 1e-5,
            line_search: ArmijoBacktracking::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsReport {
    pub iterations: usize,
    pub converged: bool,
    pub value: f64,
    pub gradient_norm: f64,
}

#[derive(Debug, Clone)]
struct History {
    s: Vec<DVector<f64>>,
    y: Vec<DVector<f64>>,
    rho: Vec<f64>,
    // Slot of the oldest pair.
    head: usize,
    len: usize,
}

impl History {
    fn new(capacity: usize, n: usize) -> Self {
        Self {
            s: vec![DVector::zeros(n); capacity],
            y: vec![DVector::zeros(n); capacity],
            rho: vec![0.0; capacity],
            head: 0,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.rho.len()
    }

    /// Slot of the `k`-th oldest pair.
    fn slot(&self, k: usize) -> usize {
        (self.head + k) % self.capacity()
    }

    fn push(&mut self, s: &DVector<f64>, y: &DVector<f64>, rho: f64) {
        if self.capacity() == 0 {
            return;
        }
        let slot = if self.len < self.capacity() {
            self.len += 1;
            self.slot(self.len - 1)
        } else {
            let oldest = self.head;
            self.head = (self.head + 1) % self.capacity();
            oldest
        };
        self.s[slot].copy_from(s);
        self.y[slot].copy_from(y);
        self.rho[slot] = rho;
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Writes `-H * grad` into `dir`.
    fn direction(&self, grad: &DVector<f64>, dir: &mut DVector<f64>, alpha: &mut [f64]) {
        dir.copy_from(grad);
        for k in (0..self.len).rev() {
            let slot = self.slot(k);
            let a = self.rho[slot] * self.s[slot].dot(dir);
            alpha[k] = a;
            dir.axpy(-a, &self.y[slot], 1.0);
        }
        if self.len > 0 {
            let newest = self.slot(self.len - 1);
            let yy = self.y[newest].dot(&self.y[newest]);
            if yy > 0.0 {
                dir.scale_mut(self.s[newest].dot(&self.y[newest]) / yy);
            }
        }
        for k in 0..self.len {
            let slot = self.slot(k);
            let b = self.rho[slot] * self.y[slot].dot(dir);
            dir.axpy(alpha[k] - b, &self.s[slot], 1.0);
        }
        dir.neg_mut();
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lbfgs {
    pub options: LbfgsOptions,
}

impl Lbfgs {
    pub fn new(options: LbfgsOptions) -> Self {
        Self { options }
    }

    /// Minimizes `objective` starting from `x`, which holds the final iterate on return.
    pub fn minimize<O: Objective + ?Sized>(
        &self,
        objective: &mut O,
        x: &mut DVector<f64>,
    ) -> LbfgsReport {
        let mut history = History::new(self.options.memory, x.len());
        self.run(objective, x, &mut history)
    }

    fn run<O: Objective + ?Sized>(
        &self,
        objective: &mut O,
        x: &mut DVector<f64>,
        history: &mut History,
    ) -> LbfgsReport {
        let n = x.len();
        let opts = &self.options;
        let mut alpha = vec![0.0; history.capacity()];

        let mut grad = DVector::zeros(n);
        let mut value = objective.evaluate(x, &mut grad);
        let mut x_next = DVector::zeros(n);
        let mut grad_next = DVector::zeros(n);
        let mut dir = DVector::zeros(n);
        let mut s = DVector::zeros(n);
        let mut y = DVector::zeros(n);

        let mut iterations = 0;
        while iterations < opts.max_iter {
            if grad.norm() < opts.gradient_tolerance {
                break;
            }
            iterations += 1;

            history.direction(&grad, &mut dir, &mut alpha);
            let descent = grad.dot(&dir) < 0.0;

            // A non-descent direction gets the line search's minimal step.
            let outcome = opts.line_search.search(
                objective,
                x,
                value,
                &grad,
                &dir,
                &mut x_next,
                &mut grad_next,
            );

            if descent {
                s.copy_from(&x_next);
                s -= &*x;
                y.copy_from(&grad_next);
                y -= &grad;
                let sy = s.dot(&y);
                if sy > MIN_CURVATURE {
                    history.push(&s, &y, 1.0 / sy);
                }
            } else {
                // The curvature model is stale; restart from steepest descent.
                history.clear();
            }

            std::mem::swap(x, &mut x_next);
            std::mem::swap(&mut grad, &mut grad_next);
            value = outcome.value;
        }

        let gradient_norm = grad.norm();
        LbfgsReport {
            iterations,
            converged: gradient_norm < opts.gradient_tolerance,
            value,
            gradient_norm,
        }
    }
}
