//! Gaussian Process regression with a Cholesky-factored Gram matrix.
//!
//! [`GpPosterior::fit`] conditions a zero-mean GP prior on an observation
//! set and returns an immutable posterior snapshot. Nothing is updated
//! incrementally: each fit factors the full `(n × n)` matrix again.
//!
//! # Algorithm
//!
//! 1. `K = kernel.gram(X) + noise · I`
//! 2. `L = cholesky(K)`
//! 3. `α = Lᵀ \ (L \ y)`
//!
//! Prediction at a point `x*` with `k* = k(X, x*)`:
//!
//! - mean: `k*ᵀ α`
//! - variance: `k(x*, x*) - ‖v‖²` where `L v = k*`
//!
//! # Examples
//!
//! ```
//! use gpgo::gp::GpPosterior;
//! use gpgo::kernel::SquaredExponential;
//! use nalgebra::{DMatrix, DVector};
//!
//! let x = DMatrix::from_row_slice(1, 3, &[-1.0, 0.0, 1.0]);
//! let y = DVector::from_vec(vec![1.0, 0.0, 1.0]);
//! let posterior = GpPosterior::fit(&x, &y, SquaredExponential::default(), 1e-10).unwrap();
//!
//! let p = posterior.predict(&[0.0]).unwrap();
//! assert!(p.mean.abs() < 1e-6);
//! assert!(p.variance < 1e-6);
//! ```

use nalgebra::{DMatrix, DVector};

use crate::dual::Dual;
use crate::error::{Error, Result};
use crate::kernel::{Kernel, columns};
use crate::linalg;

/// Negative variances down to `-VARIANCE_TOLERANCE · max(1, k(x, x))` are
/// treated as rounding noise and clamped to zero.
pub const VARIANCE_TOLERANCE: f64 = 1e-9;

/// Posterior mean and variance at a single point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    /// Posterior mean.
    pub mean: f64,
    /// Posterior variance, never negative.
    pub variance: f64,
}

impl Prediction {
    /// Posterior standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// A fitted GP: the Cholesky factor, the solved weights and the training
/// inputs they were computed from.
#[derive(Clone, Debug)]
pub struct GpPosterior<K> {
    kernel: K,
    noise_variance: f64,
    /// Training inputs, one point per column.
    inputs: DMatrix<f64>,
    /// Lower Cholesky factor of `K + noise · I`.
    chol: DMatrix<f64>,
    /// `(K + noise · I)⁻¹ y`.
    alpha: DVector<f64>,
}

impl<K: Kernel> GpPosterior<K> {
    /// Fit a GP to `x` (a `d × n` matrix, one point per column) and `y` (length `n`).
    ///
    /// # Errors
    ///
    /// - [`Error::NoObservations`] if `n == 0`.
    /// - [`Error::DimensionMismatch`] if `x.ncols() != y.len()`.
    /// - [`Error::InvalidNoiseVariance`] if `noise_variance` is negative or not finite.
    /// - [`Error::NotPositiveDefinite`] if `K + noise · I` cannot be factored,
    ///   typically because of near-duplicate points with zero noise.
    pub fn fit(
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        kernel: K,
        noise_variance: f64,
    ) -> Result<Self> {
        if y.is_empty() {
            return Err(Error::NoObservations);
        }
        if x.ncols() != y.len() {
            return Err(Error::DimensionMismatch {
                expected: x.ncols(),
                got: y.len(),
            });
        }
        if !(noise_variance.is_finite() && noise_variance >= 0.0) {
            return Err(Error::InvalidNoiseVariance(noise_variance));
        }

        let mut gram = kernel.gram(x);
        for i in 0..gram.nrows() {
            gram[(i, i)] += noise_variance;
        }
        let chol = linalg::cholesky(gram)?;
        let alpha = linalg::cholesky_solve(&chol, y)?;

        trace_debug!(n = y.len(), noise_variance, "fitted GP posterior");

        Ok(Self {
            kernel,
            noise_variance,
            inputs: x.clone(),
            chol,
            alpha,
        })
    }

    /// Posterior mean and variance at `point`.
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`] if `point` has the wrong length.
    /// - [`Error::NegativeVariance`] if the computed variance is negative
    ///   beyond [`VARIANCE_TOLERANCE`].
    pub fn predict(&self, point: &[f64]) -> Result<Prediction> {
        self.check_point(point.len())?;
        let k_star = self.kernel.cross(&self.inputs, point);
        let mean = k_star.dot(&self.alpha);
        let v = linalg::forward_substitute(&self.chol, &k_star)?;
        let prior = self.kernel.k(point, point);
        let variance = clamp_variance(prior - v.norm_squared(), prior)?;
        Ok(Prediction { mean, variance })
    }

    /// Posterior mean and variance at a dual-number point.
    ///
    /// Derivatives of both outputs are taken with respect to the free
    /// variables carried by `point`.
    ///
    /// # Errors
    ///
    /// Same as [`predict`](Self::predict).
    pub fn predict_dual(&self, point: &[Dual]) -> Result<(Dual, Dual)> {
        self.check_point(point.len())?;
        let mut k_star: Vec<Dual> = columns(&self.inputs)
            .into_iter()
            .map(|xi| self.kernel.k_dual(xi, point))
            .collect();

        let zero = k_star
            .first()
            .map(|k| k.constant_like(0.0))
            .ok_or(Error::Internal("posterior has no training points"))?;
        let mean = k_star
            .iter()
            .zip(self.alpha.iter())
            .fold(zero.clone(), |acc, (k, &a)| acc + k * a);

        linalg::forward_substitute_dual(&self.chol, &mut k_star);
        let explained = k_star.iter().fold(zero, |acc, v| acc + v * v);
        let prior = self.kernel.k_dual_pair(point, point);
        let variance = &prior - &explained;

        let variance = if variance.value() < 0.0 {
            variance.constant_like(clamp_variance(variance.value(), prior.value())?)
        } else {
            variance
        };
        Ok((mean, variance))
    }

    /// The kernel used for the prior.
    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// The noise variance added to the Gram diagonal.
    #[must_use]
    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    /// Training inputs, one point per column.
    #[must_use]
    pub fn inputs(&self) -> &DMatrix<f64> {
        &self.inputs
    }

    /// Training input `i`.
    #[must_use]
    pub fn input(&self, i: usize) -> &[f64] {
        let d = self.inputs.nrows();
        &self.inputs.as_slice()[i * d..(i + 1) * d]
    }

    /// Lower Cholesky factor `L` with `L Lᵀ = K + noise · I`.
    #[must_use]
    pub fn cholesky_factor(&self) -> &DMatrix<f64> {
        &self.chol
    }

    /// Solved weights `α = (K + noise · I)⁻¹ y`.
    #[must_use]
    pub fn alpha(&self) -> &DVector<f64> {
        &self.alpha
    }

    /// Number of training points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alpha.len()
    }

    /// Always `false`: a posterior cannot be fitted to zero points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }

    /// Input dimensionality.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.inputs.nrows()
    }

    fn check_point(&self, got: usize) -> Result<()> {
        if got == self.dims() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.dims(),
                got,
            })
        }
    }
}

fn clamp_variance(variance: f64, prior: f64) -> Result<f64> {
    if variance >= 0.0 {
        return Ok(variance);
    }
    if variance >= -VARIANCE_TOLERANCE * prior.max(1.0) {
        trace_debug!(variance, "clamping slightly negative posterior variance");
        Ok(0.0)
    } else {
        Err(Error::NegativeVariance { variance })
    }
}
