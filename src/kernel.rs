//! Covariance kernels for the Gaussian Process prior.
//!
//! A kernel scores the similarity of two input points. The GP regressor uses
//! the batched [`Kernel::gram`] form while fitting, and the acquisition
//! function uses the dual-number forms to differentiate the posterior with
//! respect to a candidate point.

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dual::Dual;
use crate::error::{Error, Result};

/// A positive-semidefinite covariance function over ℝ^d.
///
/// Implementations must be symmetric and pure: the result depends only on
/// the arguments and hyperparameters fixed at construction.
pub trait Kernel: Send + Sync {
    /// Covariance between two plain points.
    fn k(&self, x1: &[f64], x2: &[f64]) -> f64;

    /// Covariance between a fixed point and a dual-number point.
    ///
    /// The result's derivatives are taken with respect to the free variables
    /// carried by `x_star`.
    fn k_dual(&self, x: &[f64], x_star: &[Dual]) -> Dual;

    /// Covariance between two dual-number points sharing the same free variables.
    fn k_dual_pair(&self, a: &[Dual], b: &[Dual]) -> Dual;

    /// Gram matrix over the columns of `x` (a `d × n` matrix of points).
    fn gram(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let cols = columns(x);
        let n = cols.len();
        let mut gram = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let v = self.k(cols[i], cols[j]);
                gram[(i, j)] = v;
                gram[(j, i)] = v;
            }
        }
        gram
    }

    /// Covariances between `point` and every column of `x`.
    fn cross(&self, x: &DMatrix<f64>, point: &[f64]) -> DVector<f64> {
        let cols = columns(x);
        DVector::from_iterator(cols.len(), cols.iter().map(|c| self.k(c, point)))
    }
}

/// Borrow each column of a column-major `d × n` matrix as a slice.
pub(crate) fn columns(x: &DMatrix<f64>) -> Vec<&[f64]> {
    let d = x.nrows();
    let data = x.as_slice();
    (0..x.ncols()).map(|j| &data[j * d..(j + 1) * d]).collect()
}

/// Squared-exponential (RBF) kernel.
///
/// `k(x1, x2) = variance² · exp(-‖x1 - x2‖² / (2 · length_scale²))`
///
/// Note that `variance` enters squared, so `k(x, x) = variance²`.
///
/// # Examples
///
/// ```
/// use gpgo::kernel::{Kernel, SquaredExponential};
///
/// let kernel = SquaredExponential::new(2.0, 0.5).unwrap();
/// assert_eq!(kernel.k(&[1.0], &[1.0]), 4.0);
/// assert!(kernel.k(&[0.0], &[1.0]) < kernel.k(&[0.0], &[0.5]));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SquaredExponential {
    variance: f64,
    length_scale: f64,
}

impl SquaredExponential {
    /// Creates a squared-exponential kernel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKernelParameter`] unless both hyperparameters
    /// are positive and finite.
    pub fn new(variance: f64, length_scale: f64) -> Result<Self> {
        if !(variance.is_finite() && variance > 0.0) {
            return Err(Error::InvalidKernelParameter {
                name: "variance",
                value: variance,
            });
        }
        if !(length_scale.is_finite() && length_scale > 0.0) {
            return Err(Error::InvalidKernelParameter {
                name: "length_scale",
                value: length_scale,
            });
        }
        Ok(Self {
            variance,
            length_scale,
        })
    }

    /// The signal variance hyperparameter.
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// The length scale hyperparameter.
    #[must_use]
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    fn amplitude(&self) -> f64 {
        self.variance * self.variance
    }

    fn inv_two_l2(&self) -> f64 {
        1.0 / (2.0 * self.length_scale * self.length_scale)
    }

    fn from_sq_dist(&self, sq_dist: &Dual) -> Dual {
        (sq_dist * -self.inv_two_l2()).exp() * self.amplitude()
    }
}

impl Default for SquaredExponential {
    fn default() -> Self {
        Self {
            variance: 1.0,
            length_scale: 1.0,
        }
    }
}

impl Kernel for SquaredExponential {
    fn k(&self, x1: &[f64], x2: &[f64]) -> f64 {
        let sq_dist: f64 = x1.iter().zip(x2).map(|(a, b)| (a - b) * (a - b)).sum();
        self.amplitude() * (-sq_dist * self.inv_two_l2()).exp()
    }

    fn k_dual(&self, x: &[f64], x_star: &[Dual]) -> Dual {
        let Some(first) = x_star.first() else {
            return Dual::constant(0, crate::dual::Order::First, self.amplitude());
        };
        let sq_dist = x
            .iter()
            .zip(x_star)
            .fold(first.constant_like(0.0), |acc, (&xi, si)| {
                acc + (si - xi).powi(2)
            });
        self.from_sq_dist(&sq_dist)
    }

    fn k_dual_pair(&self, a: &[Dual], b: &[Dual]) -> Dual {
        let Some(first) = a.first() else {
            return Dual::constant(0, crate::dual::Order::First, self.amplitude());
        };
        let sq_dist = a
            .iter()
            .zip(b)
            .fold(first.constant_like(0.0), |acc, (ai, bi)| acc + (ai - bi).powi(2));
        self.from_sq_dist(&sq_dist)
    }
}
