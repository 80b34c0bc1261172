//! Append-only store of evaluated points.

use nalgebra::{DMatrix, DVector};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered `(point, value)` pairs.
///
/// Points are stored column-major, so the whole set converts directly into
/// the `d × n` design matrix a GP is fitted on. The set only grows.
///
/// # Examples
///
/// ```
/// use gpgo::observations::ObservationSet;
///
/// let mut obs = ObservationSet::new(2);
/// obs.push(&[0.0, 1.0], 3.0).unwrap();
/// obs.push(&[0.5, 0.5], 1.5).unwrap();
///
/// assert_eq!(obs.len(), 2);
/// assert_eq!(obs.min_value(), Some(1.5));
/// assert_eq!(obs.matrix().ncols(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationSet {
    dims: usize,
    points: Vec<f64>,
    values: Vec<f64>,
}

impl ObservationSet {
    /// An empty set for `dims`-dimensional points.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            points: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a set from parallel lists of points and values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the lists differ in length or a
    /// point has the wrong dimensionality.
    pub fn from_points(dims: usize, points: &[Vec<f64>], values: &[f64]) -> Result<Self> {
        if points.len() != values.len() {
            return Err(Error::DimensionMismatch {
                expected: points.len(),
                got: values.len(),
            });
        }
        let mut set = Self::new(dims);
        for (p, &v) in points.iter().zip(values) {
            set.push(p, v)?;
        }
        Ok(set)
    }

    /// Append one observation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `point.len() != self.dims()`.
    pub fn push(&mut self, point: &[f64], value: f64) -> Result<()> {
        if point.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                got: point.len(),
            });
        }
        self.points.extend_from_slice(point);
        self.values.push(value);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// The `i`-th point.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn point(&self, i: usize) -> &[f64] {
        &self.points[i * self.dims..(i + 1) * self.dims]
    }

    /// The `i`-th value.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn value(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Iterate over `(point, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], f64)> + '_ {
        (0..self.len()).map(|i| (self.point(i), self.values[i]))
    }

    /// The `d × n` design matrix, one column per observation.
    #[must_use]
    pub fn matrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.dims, self.len(), &self.points)
    }

    /// The length-`n` target vector.
    #[must_use]
    pub fn values(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.values)
    }

    /// Smallest observed value, ignoring NaN. `None` when no value is finite
    /// or comparable.
    #[must_use]
    pub fn min_value(&self) -> Option<f64> {
        self.best().map(|(_, v)| v)
    }

    /// Point and value of the smallest observation; ties go to the earliest.
    #[must_use]
    pub fn best(&self) -> Option<(&[f64], f64)> {
        self.iter()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best, (p, v)| match best {
                Some((_, bv)) if bv <= v => best,
                _ => Some((p, v)),
            })
    }

    /// Euclidean distance from `x` to the closest stored point, or `None`
    /// when the set is empty.
    #[must_use]
    pub fn nearest_distance(&self, x: &[f64]) -> Option<f64> {
        self.iter()
            .map(|(p, _)| {
                p.iter()
                    .zip(x)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt()
            })
            .reduce(f64::min)
    }
}
