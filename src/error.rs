#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a lower bound is greater than its upper bound, or either is not finite.
    #[error("invalid bounds at dimension {index}: low ({low}) must be finite and <= high ({high})")]
    InvalidBounds {
        /// The offending dimension.
        index: usize,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when the lower and upper bound vectors have different lengths.
    #[error("bounds length mismatch: {lower} lower bounds but {upper} upper bounds")]
    BoundsLengthMismatch {
        /// Number of lower bounds.
        lower: usize,
        /// Number of upper bounds.
        upper: usize,
    },

    /// Returned when the search box has no dimensions.
    #[error("bounds must have at least one dimension")]
    EmptyBounds,

    /// Returned when a point or function has the wrong dimensionality.
    #[error("dimension mismatch: expected {expected} dimensions, got {got}")]
    DimensionMismatch {
        /// The expected number of dimensions.
        expected: usize,
        /// The actual number of dimensions.
        got: usize,
    },

    /// Returned when a kernel hyperparameter is not positive and finite.
    #[error("invalid kernel parameter '{name}': {value} must be positive and finite")]
    InvalidKernelParameter {
        /// The hyperparameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when the observation noise variance is negative or not finite.
    #[error("invalid noise variance: {0} must be finite and non-negative")]
    InvalidNoiseVariance(f64),

    /// Returned when the minimum candidate separation is negative or not finite.
    #[error("invalid minimum separation: {0} must be finite and non-negative")]
    InvalidSeparation(f64),

    /// Returned when the iteration budget is zero.
    #[error("iteration budget must be at least 1")]
    InvalidBudget,

    /// Returned when a derivative order other than 1 or 2 is requested.
    #[error("invalid derivative order: {0} (supported orders are 1 and 2)")]
    InvalidDerivativeOrder(usize),

    /// Returned when a tuning constant is out of its valid range.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when combining an empty list of functions.
    #[error("cannot combine an empty list of functions")]
    EmptyFunctions,

    /// Returned when the regularized Gram matrix is not positive definite.
    #[error(
        "covariance matrix of size {size} is not positive definite (near-duplicate points or zero noise)"
    )]
    NotPositiveDefinite {
        /// Number of training points.
        size: usize,
    },

    /// Returned when a posterior variance is negative beyond rounding tolerance.
    #[error("posterior variance {variance} is negative beyond tolerance")]
    NegativeVariance {
        /// The computed variance.
        variance: f64,
    },

    /// Returned when a run would mix minimized and maximized values in one
    /// observation set.
    #[error("stored observations were collected for {existing:?}, cannot continue with {requested:?}")]
    DirectionMismatch {
        /// Direction of the runs that produced the stored observations.
        existing: crate::types::Direction,
        /// Direction of the requested run.
        requested: crate::types::Direction,
    },

    /// Returned when an operation needs at least one observation.
    #[error("no observations available")]
    NoObservations,

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Returns `true` for errors caused by floating-point breakdown during a fit
    /// or prediction, as opposed to invalid configuration.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Error::NotPositiveDefinite { .. } | Error::NegativeVariance { .. }
        )
    }
}
