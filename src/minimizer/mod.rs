//! Minimizers used to search the acquisition surface.
//!
//! A [`GlobalMinimizer`] searches a bounded box using function values only.
//! A [`LocalRefiner`] polishes a starting point using gradients. Both take
//! `&self` and keep any random state behind a lock, so a configured
//! minimizer can be shared and reused across runs.
//!
//! # Available minimizers
//!
//! | Minimizer | Kind | Strategy |
//! |-----------|------|----------|
//! | [`SimulatedAnnealing`] | global | Very fast simulated annealing with restarts |
//! | [`RandomSearch`] | global | Best of uniformly drawn candidates |
//! | [`GradientDescent`] | local | Backtracking line search or a [`GainSchedule`](crate::schedule::GainSchedule) |

mod annealing;
mod gradient_descent;
mod random;

pub use annealing::{SimulatedAnnealing, SimulatedAnnealingBuilder};
pub use gradient_descent::{GradientDescent, GradientDescentBuilder};
pub use random::RandomSearch;

use crate::function::{Differentiable, Evaluable};
use crate::types::Bounds;

/// Derivative-free minimization over a box.
pub trait GlobalMinimizer: Send + Sync {
    /// Returns the best point found. The result always lies inside `bounds`.
    fn minimize(&self, f: &dyn Evaluable, bounds: &Bounds) -> Vec<f64>;
}

/// Gradient-based refinement of a starting point.
pub trait LocalRefiner: Send + Sync {
    /// Returns the best point visited, starting from `start`. The result is
    /// not projected onto any box.
    fn minimize(&self, f: &dyn Differentiable, start: &[f64]) -> Vec<f64>;
}

/// `true` if `candidate` improves on `incumbent`. NaN never improves and is
/// always improved upon.
pub(crate) fn improves(candidate: f64, incumbent: f64) -> bool {
    !candidate.is_nan() && (incumbent.is_nan() || candidate < incumbent)
}
