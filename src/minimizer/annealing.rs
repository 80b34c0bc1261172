//! Very fast simulated annealing.
//!
//! Each coordinate is perturbed with Ingber's generating distribution
//!
//! ```text
//! y = sgn(u - ½) · T · ((1 + 1/T)^|2u - 1| - 1),   u ~ U(0, 1)
//! ```
//!
//! scaled by the width of the box, under the schedule
//! `T_k = T0 · exp(-c · k^(1/d))`. Moves are accepted with the Metropolis
//! rule at the same temperature. Out-of-box draws are redrawn a few times and
//! then clamped.

use parking_lot::Mutex;

use super::{GlobalMinimizer, improves};
use crate::error::{Error, Result};
use crate::function::Evaluable;
use crate::rng_util;
use crate::types::Bounds;

/// Redraws allowed per coordinate before clamping into the box.
const MAX_REDRAWS: usize = 16;
/// Floor on the temperature so `1/T` stays finite.
const MIN_TEMPERATURE: f64 = 1e-100;

/// Very fast simulated annealing over a box.
///
/// # Examples
///
/// ```
/// use gpgo::function::from_fn;
/// use gpgo::minimizer::{GlobalMinimizer, SimulatedAnnealing};
/// use gpgo::types::Bounds;
///
/// let f = from_fn(1, |x: &[f64]| (x[0] - 0.3).powi(2));
/// let sa = SimulatedAnnealing::builder().seed(1).build().unwrap();
/// let x = sa.minimize(&f, &Bounds::new(vec![-1.0], vec![1.0]).unwrap());
/// assert!((x[0] - 0.3).abs() < 0.05);
/// ```
pub struct SimulatedAnnealing {
    iterations: usize,
    initial_temperature: f64,
    decay: f64,
    restarts: usize,
    rng: Mutex<fastrand::Rng>,
}

impl SimulatedAnnealing {
    /// Annealer with default settings and a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(1000, 1.0, 1.0, 1, None)
    }

    /// Annealer with default settings and a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_parts(1000, 1.0, 1.0, 1, Some(seed))
    }

    /// Creates a builder for configuring a `SimulatedAnnealing`.
    #[must_use]
    pub fn builder() -> SimulatedAnnealingBuilder {
        SimulatedAnnealingBuilder::new()
    }

    fn from_parts(
        iterations: usize,
        initial_temperature: f64,
        decay: f64,
        restarts: usize,
        seed: Option<u64>,
    ) -> Self {
        Self {
            iterations,
            initial_temperature,
            decay,
            restarts,
            rng: Mutex::new(rng_util::seeded(seed)),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn temperature(&self, k: usize, dims: usize) -> f64 {
        let exponent = 1.0 / dims.max(1) as f64;
        (self.initial_temperature * (-self.decay * (k as f64).powf(exponent)).exp())
            .max(MIN_TEMPERATURE)
    }

    fn perturb(
        rng: &mut fastrand::Rng,
        x: &[f64],
        bounds: &Bounds,
        temperature: f64,
    ) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, &xi)| {
                let (lo, hi) = (bounds.lower()[i], bounds.upper()[i]);
                let mut candidate = xi;
                for _ in 0..MAX_REDRAWS {
                    let u = rng.f64();
                    let step = (u - 0.5).signum()
                        * temperature
                        * ((1.0 + 1.0 / temperature).powf((2.0 * u - 1.0).abs()) - 1.0);
                    candidate = xi + step * (hi - lo);
                    if (lo..=hi).contains(&candidate) {
                        return candidate;
                    }
                }
                candidate.clamp(lo, hi)
            })
            .collect()
    }

    fn anneal(
        &self,
        rng: &mut fastrand::Rng,
        f: &dyn Evaluable,
        bounds: &Bounds,
    ) -> (Vec<f64>, f64) {
        let mut current = bounds.sample(rng);
        let mut current_v = f.evaluate(&current);
        let mut best = current.clone();
        let mut best_v = current_v;

        for k in 1..=self.iterations {
            let t = self.temperature(k, bounds.dims());
            let candidate = Self::perturb(rng, &current, bounds, t);
            let v = f.evaluate(&candidate);
            let accept = if improves(v, current_v) {
                true
            } else if v.is_nan() {
                false
            } else {
                rng.f64() < (-(v - current_v) / t).exp()
            };
            if accept {
                current = candidate;
                current_v = v;
                if improves(current_v, best_v) {
                    best.clone_from(&current);
                    best_v = current_v;
                }
            }
        }
        (best, best_v)
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalMinimizer for SimulatedAnnealing {
    fn minimize(&self, f: &dyn Evaluable, bounds: &Bounds) -> Vec<f64> {
        let mut rng = self.rng.lock();
        let (mut best, mut best_v) = self.anneal(&mut rng, f, bounds);
        for _ in 1..self.restarts {
            let (x, v) = self.anneal(&mut rng, f, bounds);
            if improves(v, best_v) {
                best = x;
                best_v = v;
            }
        }
        trace_debug!(best_v, restarts = self.restarts, "annealing finished");
        bounds.clamp(&best)
    }
}

/// Builder for configuring a [`SimulatedAnnealing`].
///
/// Defaults:
/// - `iterations`: 1000 per restart
/// - `initial_temperature`: 1.0
/// - `decay`: 1.0
/// - `restarts`: 1
/// - `seed`: random
#[derive(Debug, Clone, Default)]
pub struct SimulatedAnnealingBuilder {
    iterations: Option<usize>,
    initial_temperature: Option<f64>,
    decay: Option<f64>,
    restarts: Option<usize>,
    seed: Option<u64>,
}

impl SimulatedAnnealingBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of proposals per restart.
    #[must_use]
    pub fn iterations(mut self, n: usize) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Sets `T0`.
    #[must_use]
    pub fn initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = Some(t);
        self
    }

    /// Sets the schedule constant `c`.
    #[must_use]
    pub fn decay(mut self, c: f64) -> Self {
        self.decay = Some(c);
        self
    }

    /// Sets the number of independent runs; the best result is kept.
    #[must_use]
    pub fn restarts(mut self, n: usize) -> Self {
        self.restarts = Some(n);
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the configured [`SimulatedAnnealing`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the initial temperature or decay
    /// is not a positive finite number, or if `restarts` is zero.
    pub fn build(self) -> Result<SimulatedAnnealing> {
        let initial_temperature = self.initial_temperature.unwrap_or(1.0);
        let decay = self.decay.unwrap_or(1.0);
        let restarts = self.restarts.unwrap_or(1);
        for (name, value) in [
            ("initial_temperature", initial_temperature),
            ("decay", decay),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidParameter { name, value });
            }
        }
        if restarts == 0 {
            return Err(Error::InvalidParameter {
                name: "restarts",
                value: 0.0,
            });
        }
        Ok(SimulatedAnnealing::from_parts(
            self.iterations.unwrap_or(1000),
            initial_temperature,
            decay,
            restarts,
            self.seed,
        ))
    }
}
