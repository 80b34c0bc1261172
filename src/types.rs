//! Core types shared across the optimizer: search direction and box bounds.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// The direction of optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Minimize the objective value.
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl Direction {
    /// Maps a value from the internal (always minimized) scale to the
    /// caller's scale, and back. The map is its own inverse.
    #[must_use]
    pub fn orient(self, value: f64) -> f64 {
        match self {
            Direction::Minimize => value,
            Direction::Maximize => -value,
        }
    }
}

/// An axis-aligned box `[lower_i, upper_i]` in ℝ^d.
///
/// Constrains both the objective's feasible domain and the acquisition
/// search domain.
///
/// # Examples
///
/// ```
/// use gpgo::Bounds;
///
/// let bounds = Bounds::new(vec![-3.0, 0.0], vec![3.0, 1.0]).unwrap();
/// assert_eq!(bounds.dims(), 2);
/// assert!(bounds.contains(&[0.0, 0.5]));
/// assert_eq!(bounds.clamp(&[5.0, -1.0]), vec![3.0, 0.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Creates bounds from per-dimension lower and upper limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoundsLengthMismatch`] if the vectors differ in
    /// length, and [`Error::InvalidBounds`] if any limit is not finite or
    /// `lower[i] > upper[i]`.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(Error::BoundsLengthMismatch {
                lower: lower.len(),
                upper: upper.len(),
            });
        }
        for (index, (&low, &high)) in lower.iter().zip(&upper).enumerate() {
            if !low.is_finite() || !high.is_finite() || low > high {
                return Err(Error::InvalidBounds { index, low, high });
            }
        }
        Ok(Self { lower, upper })
    }

    /// The unit hypercube `[0, 1]^d`.
    #[must_use]
    pub fn unit(dims: usize) -> Self {
        Self {
            lower: vec![0.0; dims],
            upper: vec![1.0; dims],
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.lower.len()
    }

    /// Lower limits.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper limits.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Width of dimension `i`.
    #[must_use]
    pub fn width(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    /// Returns `true` if `x` has the right dimensionality and lies inside the box.
    #[must_use]
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dims()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&lo, &hi))| (lo..=hi).contains(&v))
    }

    /// Projects `x` onto the box coordinate-wise.
    #[must_use]
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
            .collect()
    }

    /// Draws a point uniformly at random from the box.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&lo, &hi)| rng_util::f64_range(rng, lo, hi))
            .collect()
    }

    pub(crate) fn check_dims(&self, got: usize) -> Result<()> {
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
