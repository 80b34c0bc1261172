use super::{LocalRefiner, improves};
use crate::error::{Error, Result};
use crate::function::Differentiable;
use crate::schedule::GainSchedule;

/// Smallest trial step before the line search gives up.
const MIN_STEP: f64 = 1e-16;

/// Gradient descent with a backtracking (Armijo) line search, or with
/// per-coordinate steps from a [`GainSchedule`].
///
/// Stops after `max_iterations`, when the squared gradient norm drops below
/// `tolerance`, or when the line search cannot find a decrease. Returns the
/// best point visited.
///
/// # Examples
///
/// ```
/// use gpgo::function::from_fn_with_gradient;
/// use gpgo::minimizer::{GradientDescent, LocalRefiner};
///
/// let f = from_fn_with_gradient(
///     2,
///     |x: &[f64]| (x[0] - 1.0).powi(2) + 4.0 * x[1] * x[1],
///     |x: &[f64]| vec![2.0 * (x[0] - 1.0), 8.0 * x[1]],
/// );
/// let gd = GradientDescent::builder().build().unwrap();
/// let x = gd.minimize(&f, &[-3.0, 2.0]);
/// assert!((x[0] - 1.0).abs() < 1e-4 && x[1].abs() < 1e-4);
/// ```
#[derive(Debug)]
pub struct GradientDescent {
    max_iterations: usize,
    initial_step: f64,
    armijo: f64,
    shrink: f64,
    tolerance: f64,
    schedule: Option<Box<dyn GainSchedule>>,
}

impl GradientDescent {
    /// Creates a builder for configuring a `GradientDescent`.
    #[must_use]
    pub fn builder() -> GradientDescentBuilder {
        GradientDescentBuilder::new()
    }

    fn line_search_step(
        &self,
        f: &dyn Differentiable,
        x: &[f64],
        value: f64,
        gradient: &[f64],
        grad_norm_sq: f64,
    ) -> Option<(Vec<f64>, f64)> {
        let mut step = self.initial_step;
        while step >= MIN_STEP {
            let trial: Vec<f64> = x
                .iter()
                .zip(gradient)
                .map(|(xi, gi)| xi - step * gi)
                .collect();
            let trial_v = f.evaluate(&trial);
            if trial_v <= value - self.armijo * step * grad_norm_sq {
                return Some((trial, trial_v));
            }
            step *= self.shrink;
        }
        None
    }
}

impl LocalRefiner for GradientDescent {
    fn minimize(&self, f: &dyn Differentiable, start: &[f64]) -> Vec<f64> {
        let mut x = start.to_vec();
        let mut best = x.clone();
        let mut best_v = f64::NAN;

        // Each call starts from a fresh copy of the configured schedule.
        let mut schedule = self.schedule.as_ref().map(|s| {
            let mut fresh = s.clone();
            fresh.init(start.len());
            fresh
        });

        for iteration in 0..self.max_iterations {
            let (value, gradient) = f.value_and_gradient(&x);
            if improves(value, best_v) {
                best.clone_from(&x);
                best_v = value;
            }
            if value.is_nan() || gradient.iter().any(|g| !g.is_finite()) {
                break;
            }
            let grad_norm_sq: f64 = gradient.iter().map(|g| g * g).sum();
            if grad_norm_sq < self.tolerance {
                break;
            }

            if let Some(schedule) = schedule.as_mut() {
                schedule.observe_gradient(&gradient);
                for (i, (xi, gi)) in x.iter_mut().zip(&gradient).enumerate() {
                    *xi -= schedule.learning_rate(iteration, i) * gi;
                }
            } else if let Some((next, next_v)) =
                self.line_search_step(f, &x, value, &gradient, grad_norm_sq)
            {
                x = next;
                if improves(next_v, best_v) {
                    best.clone_from(&x);
                    best_v = next_v;
                }
            } else {
                trace_debug!(iteration, "line search found no decrease");
                break;
            }
        }

        if self.schedule.is_some() {
            let last = f.evaluate(&x);
            if improves(last, best_v) {
                best = x;
            }
        }
        best
    }
}

/// Builder for configuring a [`GradientDescent`].
///
/// Defaults:
/// - `max_iterations`: 100
/// - `initial_step`: 1.0
/// - `armijo`: 1e-4 (sufficient-decrease constant)
/// - `shrink`: 0.5 (backtracking factor)
/// - `tolerance`: 1e-10 (on the squared gradient norm)
/// - `gain_schedule`: none (use the line search)
#[derive(Debug, Default)]
pub struct GradientDescentBuilder {
    max_iterations: Option<usize>,
    initial_step: Option<f64>,
    armijo: Option<f64>,
    shrink: Option<f64>,
    tolerance: Option<f64>,
    schedule: Option<Box<dyn GainSchedule>>,
}

impl GradientDescentBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// First trial step of each line search.
    #[must_use]
    pub fn initial_step(mut self, step: f64) -> Self {
        self.initial_step = Some(step);
        self
    }

    #[must_use]
    pub fn armijo(mut self, c: f64) -> Self {
        self.armijo = Some(c);
        self
    }

    #[must_use]
    pub fn shrink(mut self, factor: f64) -> Self {
        self.shrink = Some(factor);
        self
    }

    #[must_use]
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = Some(tol);
        self
    }

    /// Replace the line search with per-coordinate steps from `schedule`.
    #[must_use]
    pub fn gain_schedule(mut self, schedule: impl GainSchedule + 'static) -> Self {
        self.schedule = Some(Box::new(schedule));
        self
    }

    /// Builds the configured [`GradientDescent`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `initial_step` is not positive,
    /// `armijo` or `shrink` lies outside `(0, 1)`, or `tolerance` is negative.
    pub fn build(self) -> Result<GradientDescent> {
        let initial_step = self.initial_step.unwrap_or(1.0);
        let armijo = self.armijo.unwrap_or(1e-4);
        let shrink = self.shrink.unwrap_or(0.5);
        let tolerance = self.tolerance.unwrap_or(1e-10);

        if !(initial_step.is_finite() && initial_step > 0.0) {
            return Err(Error::InvalidParameter {
                name: "initial_step",
                value: initial_step,
            });
        }
        for (name, value) in [("armijo", armijo), ("shrink", shrink)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(Error::InvalidParameter { name, value });
            }
        }
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                value: tolerance,
            });
        }

        Ok(GradientDescent {
            max_iterations: self.max_iterations.unwrap_or(100),
            initial_step,
            armijo,
            shrink,
            tolerance,
            schedule: self.schedule,
        })
    }
}
