//! Expected myopic loss acquisition function.
//!
//! For a candidate `x` with posterior mean `μ(x)` and standard deviation
//! `σ(x)`, and the best value observed so far `η`:
//!
//! ```text
//! z       = (η - μ(x)) / σ(x)
//! loss(x) = η + (μ(x) - η) · Φ(z) - σ(x) · φ(z)
//! ```
//!
//! This is the expected best value after evaluating `x` once more and then
//! stopping, so lower is better and the acquisition optimizer minimizes it.
//! Rearranged, `loss(x) - η = -σ(x) · (z Φ(z) + φ(z))`, and since
//! `z Φ(z) + φ(z) > 0` for every `z`, the loss never exceeds `η`.
//!
//! At a candidate where `σ(x) = 0` (an existing training point without
//! noise) the loss is undefined and evaluates to NaN.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::dual::{Dual, Order};
use crate::error::{Error, Result};
use crate::function::{Differentiable, Evaluable};
use crate::gp::GpPosterior;
use crate::kernel::Kernel;
use crate::normal;
use crate::observations::ObservationSet;

/// Expected myopic loss over a fixed posterior snapshot.
///
/// # Examples
///
/// ```
/// use gpgo::acquisition::ExpectedLoss;
/// use gpgo::gp::GpPosterior;
/// use gpgo::kernel::SquaredExponential;
/// use nalgebra::{DMatrix, DVector};
///
/// let x = DMatrix::from_row_slice(1, 3, &[-1.0, 0.5, 1.0]);
/// let y = DVector::from_vec(vec![1.0, 0.25, 1.0]);
/// let posterior = GpPosterior::fit(&x, &y, SquaredExponential::default(), 0.0).unwrap();
/// let loss = ExpectedLoss::new(&posterior, 0.25).unwrap();
///
/// let v = loss.value(&[0.0]).unwrap();
/// assert!(v <= 0.25);
///
/// let d = loss.value_and_gradient(&[0.0], 1).unwrap();
/// assert_eq!(d.gradient().len(), 1);
/// ```
pub struct ExpectedLoss<'a, K> {
    posterior: &'a GpPosterior<K>,
    min_y: f64,
    normal: Normal,
}

impl<'a, K: Kernel> ExpectedLoss<'a, K> {
    /// Build the loss for `posterior` with `min_y` the best value observed so far.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the standard normal cannot be constructed.
    pub fn new(posterior: &'a GpPosterior<K>, min_y: f64) -> Result<Self> {
        let normal =
            Normal::new(0.0, 1.0).map_err(|_| Error::Internal("standard normal construction"))?;
        Ok(Self {
            posterior,
            min_y,
            normal,
        })
    }

    /// Build the loss with `min_y` taken from `observations`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoObservations`] if no stored value is comparable.
    pub fn for_observations(
        posterior: &'a GpPosterior<K>,
        observations: &ObservationSet,
    ) -> Result<Self> {
        let min_y = observations.min_value().ok_or(Error::NoObservations)?;
        Self::new(posterior, min_y)
    }

    /// The best observed value the loss is measured against.
    #[must_use]
    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    /// The posterior this loss is pinned to.
    #[must_use]
    pub fn posterior(&self) -> &'a GpPosterior<K> {
        self.posterior
    }

    /// Expected loss at `x`, with Φ and φ from an exact normal evaluator.
    ///
    /// # Errors
    ///
    /// Propagates prediction errors from [`GpPosterior::predict`].
    pub fn value(&self, x: &[f64]) -> Result<f64> {
        let prediction = self.posterior.predict(x)?;
        let sd = prediction.std_dev();
        let z = (self.min_y - prediction.mean) / sd;
        let cdf = self.normal.cdf(z);
        let pdf = self.normal.pdf(z);
        Ok(self.min_y + (prediction.mean - self.min_y) * cdf - sd * pdf)
    }

    /// Expected loss at `x` together with its derivatives up to `order`
    /// (1 or 2) with respect to `x`.
    ///
    /// Uses the A&S 7.1.26 approximation of Φ, so the value differs from
    /// [`value`](Self::value) by at most
    /// [`normal::MAX_CDF_ERROR`] `· |μ(x) - min_y|`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDerivativeOrder`] for an unsupported order and
    /// propagates prediction errors from [`GpPosterior::predict_dual`].
    pub fn value_and_gradient(&self, x: &[f64], order: usize) -> Result<Dual> {
        let order = Order::try_from(order)?;
        let vars = Dual::variables(x, order);
        let (mean, variance) = self.posterior.predict_dual(&vars)?;
        let sd = variance.sqrt();
        let z = (self.min_y - &mean) / &sd;
        let cdf = normal::cdf_dual(&z);
        let pdf = normal::pdf_dual(&z);
        Ok((&mean - self.min_y) * &cdf - &sd * &pdf + self.min_y)
    }

    /// Gradient of the expected loss at `x`.
    ///
    /// # Errors
    ///
    /// Same as [`value_and_gradient`](Self::value_and_gradient).
    pub fn gradient(&self, x: &[f64]) -> Result<Vec<f64>> {
        let dual = self.value_and_gradient(x, 1)?;
        Ok(dual.gradient().as_slice().to_vec())
    }
}

/// Infallible view for black-box minimizers: prediction errors become NaN.
impl<K: Kernel> Evaluable for ExpectedLoss<'_, K> {
    fn dimensions(&self) -> usize {
        self.posterior.dims()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        self.value(point).unwrap_or(f64::NAN)
    }
}

impl<K: Kernel> Differentiable for ExpectedLoss<'_, K> {
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        ExpectedLoss::gradient(self, point).unwrap_or_else(|_| vec![f64::NAN; point.len()])
    }

    /// Pairs the exact value from [`evaluate`](Evaluable::evaluate) with the
    /// dual gradient, so line searches compare values from one evaluator.
    fn value_and_gradient(&self, point: &[f64]) -> (f64, Vec<f64>) {
        (self.evaluate(point), Differentiable::gradient(self, point))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use super::*;
    use crate::kernel::SquaredExponential;

    fn posterior() -> GpPosterior<SquaredExponential> {
        let x = DMatrix::from_row_slice(2, 5, &[
            -1.0, 0.4, 0.9, -0.3, 0.0, //
            0.2, -0.8, 0.6, 0.9, -0.1,
        ]);
        let y = DVector::from_vec(vec![1.3, 0.2, -0.4, 0.8, 0.1]);
        GpPosterior::fit(&x, &y, SquaredExponential::new(1.0, 0.6).unwrap(), 1e-6).unwrap()
    }

    #[test]
    fn test_loss_never_exceeds_current_minimum() {
        let gp = posterior();
        let mut rng = fastrand::Rng::with_seed(17);
        for min_y in [-0.4, -2.0, 0.5, 3.0] {
            let loss = ExpectedLoss::new(&gp, min_y).unwrap();
            for _ in 0..500 {
                let x = [rng.f64() * 6.0 - 3.0, rng.f64() * 6.0 - 3.0];
                let v = loss.value(&x).unwrap();
                assert!(v <= min_y + 1e-12, "loss({x:?}) = {v} > {min_y}");
                let d = loss.value_and_gradient(&x, 1).unwrap().value();
                assert!(d <= min_y + 1e-6, "dual loss({x:?}) = {d} > {min_y}");
            }
        }
    }

    #[test]
    fn test_loss_tracks_mean_when_far_below_minimum() {
        let gp = posterior();
        // With min_y far above the posterior mean, Φ(z) → 1 and φ(z) → 0.
        let loss = ExpectedLoss::new(&gp, 100.0).unwrap();
        let x = [0.1, 0.1];
        let mean = gp.predict(&x).unwrap().mean;
        assert!((loss.value(&x).unwrap() - mean).abs() < 1e-9);
    }

    #[test]
    fn test_dual_value_close_to_plain_value() {
        let gp = posterior();
        let loss = ExpectedLoss::new(&gp, -0.4).unwrap();
        for x in [[0.5, 0.5], [-2.0, 1.0], [0.05, -0.3]] {
            let plain = loss.value(&x).unwrap();
            let dual = loss.value_and_gradient(&x, 1).unwrap().value();
            assert!((plain - dual).abs() < 1e-6, "{plain} vs {dual}");
        }
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let gp = posterior();
        let loss = ExpectedLoss::new(&gp, -0.4).unwrap();
        let x = [0.35, 0.15];
        let grad = loss.gradient(&x).unwrap();
        let h = 1e-6;
        for i in 0..2 {
            let mut hi = x;
            let mut lo = x;
            hi[i] += h;
            lo[i] -= h;
            let f = |p: &[f64]| loss.value_and_gradient(p, 1).unwrap().value();
            let fd = (f(&hi) - f(&lo)) / (2.0 * h);
            assert!((grad[i] - fd).abs() < 1e-6, "d/dx{i}: {} vs {fd}", grad[i]);
        }
    }

    #[test]
    fn test_hessian_matches_finite_differences() {
        let gp = posterior();
        let loss = ExpectedLoss::new(&gp, -0.4).unwrap();
        let x = [-0.6, 0.4];
        let dual = loss.value_and_gradient(&x, 2).unwrap();
        let hess = dual.hessian().unwrap();
        let h = 1e-5;
        for i in 0..2 {
            for j in 0..2 {
                let mut hi = x;
                let mut lo = x;
                hi[j] += h;
                lo[j] -= h;
                let fd = (loss.gradient(&hi).unwrap()[i] - loss.gradient(&lo).unwrap()[i])
                    / (2.0 * h);
                assert!(
                    (hess[(i, j)] - fd).abs() < 1e-5,
                    "H[{i},{j}] = {} vs {fd}",
                    hess[(i, j)]
                );
            }
        }
    }

    #[test]
    fn test_for_observations_uses_minimum() {
        let gp = posterior();
        let obs = ObservationSet::from_points(2, &[vec![0.0, 0.0], vec![1.0, 1.0]], &[0.7, -0.2])
            .unwrap();
        let loss = ExpectedLoss::for_observations(&gp, &obs).unwrap();
        assert_eq!(loss.min_y(), -0.2);
        assert!(matches!(
            ExpectedLoss::for_observations(&gp, &ObservationSet::new(2)),
            Err(Error::NoObservations)
        ));
    }

    #[test]
    fn test_invalid_order() {
        let gp = posterior();
        let loss = ExpectedLoss::new(&gp, 0.0).unwrap();
        assert!(matches!(
            loss.value_and_gradient(&[0.0, 0.0], 0),
            Err(Error::InvalidDerivativeOrder(0))
        ));
        assert!(matches!(
            loss.value_and_gradient(&[0.0, 0.0], 3),
            Err(Error::InvalidDerivativeOrder(3))
        ));
    }

    #[test]
    fn test_evaluable_view_maps_errors_to_nan() {
        let gp = posterior();
        let loss = ExpectedLoss::new(&gp, 0.0).unwrap();
        assert_eq!(Evaluable::dimensions(&loss), 2);
        assert!(Evaluable::evaluate(&loss, &[0.0]).is_nan());
        let (v, g) = Differentiable::value_and_gradient(&loss, &[0.0]);
        assert!(v.is_nan());
        assert!(g.iter().all(|x| x.is_nan()));
    }

    #[test]
    fn test_differentiable_view_matches_evaluable_value() {
        let gp = posterior();
        let loss = ExpectedLoss::new(&gp, 0.0).unwrap();
        for x in [[0.1, 0.2], [-0.6, 0.4], [0.5, -0.5], [1.2, 1.1]] {
            let (v, g) = Differentiable::value_and_gradient(&loss, &x);
            assert_eq!(v.to_bits(), Evaluable::evaluate(&loss, &x).to_bits());
            assert_eq!(g, loss.gradient(&x).unwrap());
        }
    }
}
