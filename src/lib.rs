#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Gaussian process global optimization for expensive black-box functions.
//!
//! The optimizer alternates between fitting a Gaussian process surrogate to
//! every point evaluated so far and choosing the next point by minimizing the
//! *expected myopic loss*: the expected best value after one more evaluation.
//! The acquisition function is evaluated on dual numbers, so its gradient and
//! Hessian come out exactly, with no finite differences.
//!
//! # Getting Started
//!
//! ```
//! use gpgo::prelude::*;
//!
//! let f = from_fn(2, |x: &[f64]| (x[0] - 0.2).powi(2) + (x[1] + 0.4).powi(2));
//!
//! let mut opt = Gpgo::builder(Bounds::new(vec![-1.0, -1.0], vec![1.0, 1.0]).unwrap())
//!     .budget(15)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let summary = opt.minimize(&f).unwrap();
//! println!("f({:?}) = {:.4}", summary.best_point, summary.best_value);
//! assert_eq!(summary.diagnostics.cumulative_millis().len(), 15);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Gpgo`] | Drive the outer loop: fit, search the acquisition surface, evaluate, record. |
//! | [`GpPosterior`](gp::GpPosterior) | A fitted GP: Cholesky factor, weights, mean and variance prediction. |
//! | [`ExpectedLoss`](acquisition::ExpectedLoss) | The acquisition function, plain and differentiable. |
//! | [`Kernel`](kernel::Kernel) | Prior covariance; [`SquaredExponential`](kernel::SquaredExponential) is provided. |
//! | [`GlobalMinimizer`](minimizer::GlobalMinimizer) / [`LocalRefiner`](minimizer::LocalRefiner) | Search strategies for the acquisition surface. |
//! | [`Evaluable`](function::Evaluable) | What an objective must implement; see [`function`] for combinators. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on bounds, observations and run records | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) for fits, iterations and fallbacks | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod diagnostics;
pub mod dual;
mod error;
pub mod function;
pub mod gp;
pub mod kernel;
pub mod linalg;
pub mod minimizer;
pub mod normal;
pub mod observations;
mod optimizer;
mod rng_util;
pub mod schedule;
pub mod types;

pub use error::{Error, Result};
pub use optimizer::{DEFAULT_NOISE_VARIANCE, Gpgo, GpgoBuilder, Phase};
pub use types::{Bounds, Direction};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use gpgo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::ExpectedLoss;
    pub use crate::diagnostics::{IterationRecord, RunDiagnostics, RunSummary};
    pub use crate::function::{
        Bounded, Differentiable, Evaluable, constrain, from_fn, from_fn_with_gradient, negate,
        scale, sum, with_point,
    };
    pub use crate::gp::{GpPosterior, Prediction};
    pub use crate::kernel::{Kernel, SquaredExponential};
    pub use crate::minimizer::{
        GlobalMinimizer, GradientDescent, LocalRefiner, RandomSearch, SimulatedAnnealing,
    };
    pub use crate::observations::ObservationSet;
    pub use crate::schedule::{AdaDelta, AdaDeltaConfig, AdaGrad, AdaGradConfig, GainSchedule};
    pub use crate::{Bounds, Direction, Error, Gpgo, GpgoBuilder, Phase, Result};
}
