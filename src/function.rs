//! Capability traits for objective functions and the combinators that
//! decorate them.
//!
//! An objective implements [`Evaluable`]; functions that can also report
//! their gradient implement [`Differentiable`]; functions that carry their
//! own feasible box implement [`Bounded`]. Combinators wrap any of these and
//! implement the same capabilities as the function they wrap.
//!
//! ```
//! use gpgo::function::{Evaluable, from_fn, negate, scale};
//!
//! let f = from_fn(1, |x: &[f64]| x[0] * x[0]);
//! assert_eq!(negate(negate(&f)).evaluate(&[3.0]), 9.0);
//! assert_eq!(scale(&f, 0.5).evaluate(&[3.0]), 4.5);
//! ```

use crate::error::{Error, Result};
use crate::types::Bounds;

/// A scalar function over ℝ^d.
pub trait Evaluable {
    /// Input dimensionality `d`.
    fn dimensions(&self) -> usize;

    /// Value at `point`. `point.len()` must equal [`dimensions`](Evaluable::dimensions).
    fn evaluate(&self, point: &[f64]) -> f64;
}

/// A scalar function that also reports its gradient.
pub trait Differentiable: Evaluable {
    /// Gradient at `point`.
    fn gradient(&self, point: &[f64]) -> Vec<f64>;

    /// Value and gradient at `point`.
    ///
    /// Override when both can be computed together more cheaply.
    fn value_and_gradient(&self, point: &[f64]) -> (f64, Vec<f64>) {
        (self.evaluate(point), self.gradient(point))
    }
}

/// A function with an attached feasible box.
pub trait Bounded {
    /// The feasible box.
    fn bounds(&self) -> &Bounds;
}

impl<F: Evaluable + ?Sized> Evaluable for &F {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        (**self).evaluate(point)
    }
}

impl<F: Differentiable + ?Sized> Differentiable for &F {
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        (**self).gradient(point)
    }

    fn value_and_gradient(&self, point: &[f64]) -> (f64, Vec<f64>) {
        (**self).value_and_gradient(point)
    }
}

impl<F: Bounded + ?Sized> Bounded for &F {
    fn bounds(&self) -> &Bounds {
        (**self).bounds()
    }
}

impl<F: Evaluable + ?Sized> Evaluable for Box<F> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        (**self).evaluate(point)
    }
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

/// An [`Evaluable`] backed by a closure. Created by [`from_fn`].
#[derive(Clone)]
pub struct FnObjective<V> {
    dims: usize,
    value: V,
}

/// Wrap a closure as an [`Evaluable`] of the given dimensionality.
#[must_use]
pub fn from_fn<V>(dims: usize, value: V) -> FnObjective<V>
where
    V: Fn(&[f64]) -> f64,
{
    FnObjective { dims, value }
}

impl<V: Fn(&[f64]) -> f64> Evaluable for FnObjective<V> {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        (self.value)(point)
    }
}

/// A [`Differentiable`] backed by a value closure and a gradient closure.
/// Created by [`from_fn_with_gradient`].
#[derive(Clone)]
pub struct FnDifferentiable<V, G> {
    dims: usize,
    value: V,
    gradient: G,
}

/// Wrap a value closure and its gradient as a [`Differentiable`].
#[must_use]
pub fn from_fn_with_gradient<V, G>(dims: usize, value: V, gradient: G) -> FnDifferentiable<V, G>
where
    V: Fn(&[f64]) -> f64,
    G: Fn(&[f64]) -> Vec<f64>,
{
    FnDifferentiable {
        dims,
        value,
        gradient,
    }
}

impl<V, G> Evaluable for FnDifferentiable<V, G>
where
    V: Fn(&[f64]) -> f64,
{
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        (self.value)(point)
    }
}

impl<V, G> Differentiable for FnDifferentiable<V, G>
where
    V: Fn(&[f64]) -> f64,
    G: Fn(&[f64]) -> Vec<f64>,
{
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        (self.gradient)(point)
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// `c · f(x)`. Created by [`scale`].
#[derive(Clone, Debug)]
pub struct Scale<F> {
    inner: F,
    factor: f64,
}

/// Multiply a function (and its gradient) by a constant.
#[must_use]
pub fn scale<F: Evaluable>(f: F, factor: f64) -> Scale<F> {
    Scale { inner: f, factor }
}

impl<F> Scale<F> {
    /// The wrapped function.
    #[must_use]
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// The multiplier.
    #[must_use]
    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl<F: Evaluable> Evaluable for Scale<F> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        self.factor * self.inner.evaluate(point)
    }
}

impl<F: Differentiable> Differentiable for Scale<F> {
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        self.inner
            .gradient(point)
            .into_iter()
            .map(|g| g * self.factor)
            .collect()
    }
}

impl<F: Bounded> Bounded for Scale<F> {
    fn bounds(&self) -> &Bounds {
        self.inner.bounds()
    }
}

/// `-f(x)`. Created by [`negate`].
#[derive(Clone, Debug)]
pub struct Negate<F> {
    inner: F,
}

/// Negate a function (and its gradient). Turns a maximization into a minimization.
#[must_use]
pub fn negate<F: Evaluable>(f: F) -> Negate<F> {
    Negate { inner: f }
}

impl<F> Negate<F> {
    /// The wrapped function.
    #[must_use]
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: Evaluable> Evaluable for Negate<F> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        -self.inner.evaluate(point)
    }
}

impl<F: Differentiable> Differentiable for Negate<F> {
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        self.inner.gradient(point).into_iter().map(|g| -g).collect()
    }
}

impl<F: Bounded> Bounded for Negate<F> {
    fn bounds(&self) -> &Bounds {
        self.inner.bounds()
    }
}

/// `Σ f_i(x)`. Created by [`sum`].
#[derive(Clone, Debug)]
pub struct Sum<F> {
    functions: Vec<F>,
}

/// Add functions of equal dimensionality.
///
/// # Errors
///
/// Returns [`Error::EmptyFunctions`] for an empty list and
/// [`Error::DimensionMismatch`] if the dimensionalities differ.
pub fn sum<F: Evaluable>(functions: Vec<F>) -> Result<Sum<F>> {
    let first = functions.first().ok_or(Error::EmptyFunctions)?;
    let expected = first.dimensions();
    if let Some(bad) = functions.iter().find(|f| f.dimensions() != expected) {
        return Err(Error::DimensionMismatch {
            expected,
            got: bad.dimensions(),
        });
    }
    Ok(Sum { functions })
}

impl<F: Evaluable> Evaluable for Sum<F> {
    fn dimensions(&self) -> usize {
        self.functions[0].dimensions()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        self.functions.iter().map(|f| f.evaluate(point)).sum()
    }
}

impl<F: Differentiable> Differentiable for Sum<F> {
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        let mut total = vec![0.0; point.len()];
        for f in &self.functions {
            for (t, g) in total.iter_mut().zip(f.gradient(point)) {
                *t += g;
            }
        }
        total
    }
}

/// A function paired with its feasible box. Created by [`constrain`].
#[derive(Clone, Debug)]
pub struct Constrained<F> {
    inner: F,
    bounds: Bounds,
}

/// Attach a feasible box to a function.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the box and the function differ
/// in dimensionality.
pub fn constrain<F: Evaluable>(f: F, bounds: Bounds) -> Result<Constrained<F>> {
    bounds.check_dims(f.dimensions())?;
    Ok(Constrained { inner: f, bounds })
}

impl<F> Constrained<F> {
    /// Replace the feasible box, keeping its dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `bounds` has a different
    /// dimensionality than the current box.
    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<()> {
        self.bounds.check_dims(bounds.dims())?;
        self.bounds = bounds;
        Ok(())
    }
}

impl<F: Evaluable> Evaluable for Constrained<F> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        self.inner.evaluate(point)
    }
}

impl<F: Differentiable> Differentiable for Constrained<F> {
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        self.inner.gradient(point)
    }
}

impl<F> Bounded for Constrained<F> {
    fn bounds(&self) -> &Bounds {
        &self.bounds
    }
}

/// A function that remembers a current point. Created by [`with_point`].
///
/// Mirrors objectives that are driven by "set the point, then read the
/// value" rather than by passing the point on every call.
#[derive(Clone, Debug)]
pub struct WithPoint<F> {
    inner: F,
    point: Vec<f64>,
}

/// Wrap a function with current-point state, starting at the origin.
#[must_use]
pub fn with_point<F: Evaluable>(f: F) -> WithPoint<F> {
    let point = vec![0.0; f.dimensions()];
    WithPoint { inner: f, point }
}

impl<F: Evaluable> WithPoint<F> {
    /// Move the current point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `point` has the wrong length.
    pub fn set_point(&mut self, point: &[f64]) -> Result<()> {
        if point.len() != self.inner.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.inner.dimensions(),
                got: point.len(),
            });
        }
        self.point.copy_from_slice(point);
        Ok(())
    }

    /// The current point.
    #[must_use]
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Value at the current point.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.inner.evaluate(&self.point)
    }
}

impl<F: Evaluable> Evaluable for WithPoint<F> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        self.inner.evaluate(point)
    }
}

impl<F: Differentiable> Differentiable for WithPoint<F> {
    fn gradient(&self, point: &[f64]) -> Vec<f64> {
        self.inner.gradient(point)
    }
}
