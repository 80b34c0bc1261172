//! Per-coordinate gain schedules for gradient descent.
//!
//! A [`GainSchedule`] turns the stream of observed gradients into one step
//! size per coordinate. The descent loop calls
//! [`observe_gradient`](GainSchedule::observe_gradient) once per iteration and
//! then steps each coordinate by `-learning_rate(iter, i) * g[i]`.

use core::fmt::Debug;

use crate::error::{Error, Result};

/// Gradient-to-step-size transform.
pub trait GainSchedule: Send + Sync + Debug {
    /// Reset all accumulated state for a problem with `dims` coordinates.
    fn init(&mut self, dims: usize);

    /// Record the gradient observed at the current iterate.
    fn observe_gradient(&mut self, gradient: &[f64]);

    /// Step size for coordinate `i` at iteration `iteration`.
    fn learning_rate(&self, iteration: usize, i: usize) -> f64;

    /// Clone into a fresh box, keeping accumulated state.
    fn boxed_clone(&self) -> Box<dyn GainSchedule>;
}

impl Clone for Box<dyn GainSchedule> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

// ---------------------------------------------------------------------------
// AdaGrad
// ---------------------------------------------------------------------------

/// Parameters for [`AdaGrad`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdaGradConfig {
    /// Base step size.
    pub eta: f64,
    /// Added under the square root to keep the first steps finite.
    pub constant_addend: f64,
}

impl Default for AdaGradConfig {
    fn default() -> Self {
        Self {
            eta: 0.1,
            constant_addend: 1e-9,
        }
    }
}

/// AdaGrad: `eta / sqrt(c + Σ g_i²)`.
#[derive(Debug, Clone)]
pub struct AdaGrad {
    config: AdaGradConfig,
    grad_sum_squares: Vec<f64>,
}

impl AdaGrad {
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `eta` or `constant_addend` is
    /// not a positive finite number.
    pub fn new(config: AdaGradConfig) -> Result<Self> {
        check_positive("eta", config.eta)?;
        check_positive("constant_addend", config.constant_addend)?;
        Ok(Self {
            config,
            grad_sum_squares: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> AdaGradConfig {
        self.config
    }
}

impl GainSchedule for AdaGrad {
    fn init(&mut self, dims: usize) {
        self.grad_sum_squares = vec![0.0; dims];
    }

    fn observe_gradient(&mut self, gradient: &[f64]) {
        for (acc, g) in self.grad_sum_squares.iter_mut().zip(gradient) {
            *acc += g * g;
        }
    }

    fn learning_rate(&self, _iteration: usize, i: usize) -> f64 {
        let sum = self.grad_sum_squares.get(i).copied().unwrap_or(0.0);
        let rate = self.config.eta / (self.config.constant_addend + sum).sqrt();
        if rate.is_finite() { rate } else { 0.0 }
    }

    fn boxed_clone(&self) -> Box<dyn GainSchedule> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// AdaDelta
// ---------------------------------------------------------------------------

/// Parameters for [`AdaDelta`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdaDeltaConfig {
    /// Exponential decay of both running averages, in `(0, 1)`.
    pub decay_rate: f64,
    pub constant_addend: f64,
}

impl Default for AdaDeltaConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.95,
            constant_addend: (-6.0_f64).exp(),
        }
    }
}

/// AdaDelta: ratio of the RMS of past updates to the RMS of past gradients.
///
/// The rate for the coming step is fixed when the gradient is observed, so
/// [`learning_rate`](GainSchedule::learning_rate) ignores the iteration.
#[derive(Debug, Clone)]
pub struct AdaDelta {
    config: AdaDeltaConfig,
    grad_accum: Vec<f64>,
    update_accum: Vec<f64>,
    rates: Vec<f64>,
}

impl AdaDelta {
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `constant_addend` is not
    /// positive or `decay_rate` lies outside `(0, 1)`.
    pub fn new(config: AdaDeltaConfig) -> Result<Self> {
        check_positive("constant_addend", config.constant_addend)?;
        if !(config.decay_rate > 0.0 && config.decay_rate < 1.0) {
            return Err(Error::InvalidParameter {
                name: "decay_rate",
                value: config.decay_rate,
            });
        }
        Ok(Self {
            config,
            grad_accum: Vec::new(),
            update_accum: Vec::new(),
            rates: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> AdaDeltaConfig {
        self.config
    }
}

impl GainSchedule for AdaDelta {
    fn init(&mut self, dims: usize) {
        self.grad_accum = vec![0.0; dims];
        self.update_accum = vec![0.0; dims];
        self.rates = vec![0.0; dims];
    }

    fn observe_gradient(&mut self, gradient: &[f64]) {
        let rho = self.config.decay_rate;
        let eps = self.config.constant_addend;
        for (i, &g) in gradient.iter().enumerate().take(self.rates.len()) {
            self.grad_accum[i] = rho * self.grad_accum[i] + (1.0 - rho) * g * g;
            let rate = (self.update_accum[i] + eps).sqrt() / (self.grad_accum[i] + eps).sqrt();
            let update = rate * g;
            self.update_accum[i] = rho * self.update_accum[i] + (1.0 - rho) * update * update;
            self.rates[i] = rate;
        }
    }

    fn learning_rate(&self, _iteration: usize, i: usize) -> f64 {
        self.rates.get(i).copied().unwrap_or(0.0)
    }

    fn boxed_clone(&self) -> Box<dyn GainSchedule> {
        Box::new(self.clone())
    }
}
