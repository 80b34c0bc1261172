//! The outer optimization loop.
//!
//! Each iteration fits a GP to every observation so far, minimizes the
//! expected loss over the search box, evaluates the objective at the chosen
//! point and records the result:
//!
//! ```text
//! Initializing ─▶ Fitting ─▶ SearchingAcquisition ─▶ Evaluating ─┐
//!                    ▲                                            │
//!                    └────────────── budget left ◀────────────────┘
//!                                         │ budget spent
//!                                         ▼
//!                                    Terminated
//! ```

use std::time::Instant;

use crate::acquisition::ExpectedLoss;
use crate::diagnostics::{IterationRecord, RunDiagnostics, RunSummary};
use crate::dual::Order;
use crate::error::{Error, Result};
use crate::function::{Evaluable, negate};
use crate::gp::GpPosterior;
use crate::kernel::{Kernel, SquaredExponential};
use crate::linalg;
use crate::minimizer::{GlobalMinimizer, LocalRefiner, SimulatedAnnealing, improves};
use crate::observations::ObservationSet;
use crate::rng_util;
use crate::types::{Bounds, Direction};

/// Random draws tried when a candidate is too close to a stored point.
const MAX_SEPARATION_DRAWS: usize = 64;

/// Noise variance added to the Gram diagonal unless configured otherwise.
///
/// Keeps the Gram matrix factorable once candidates cluster near an optimum,
/// where points `min_separation` apart are nearly collinear under the kernel.
pub const DEFAULT_NOISE_VARIANCE: f64 = 1e-6;

/// Newton iterations applied to each candidate at derivative order 2.
const NEWTON_STEPS: usize = 8;

/// Smallest Newton step fraction tried before polishing stops.
const MIN_NEWTON_STEP: f64 = 1e-8;

/// Where the loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Built, or evaluating the initial random point.
    Initializing,
    /// Fitting the GP posterior.
    Fitting,
    /// Minimizing the expected loss.
    SearchingAcquisition,
    /// Evaluating the objective at the chosen point.
    Evaluating,
    /// The budget is spent.
    Terminated,
}

/// Gaussian process global optimizer.
///
/// Construct with [`Gpgo::builder`]. Observations persist across runs, so a
/// second call to [`minimize`](Gpgo::minimize) continues from the points the
/// first one collected.
///
/// # Examples
///
/// ```
/// use gpgo::function::from_fn;
/// use gpgo::{Bounds, Gpgo};
///
/// let f = from_fn(1, |x: &[f64]| (x[0] - 0.3).powi(2));
/// let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
///     .budget(10)
///     .seed(7)
///     .build()
///     .unwrap();
///
/// let summary = opt.minimize(&f).unwrap();
/// assert_eq!(summary.diagnostics.best_per_iteration().len(), 10);
/// assert!(summary.best_value < 0.05);
/// ```
pub struct Gpgo<K = SquaredExponential> {
    bounds: Bounds,
    kernel: K,
    budget: usize,
    noise_variance: f64,
    min_separation: f64,
    order: Order,
    global: Box<dyn GlobalMinimizer>,
    local: Option<Box<dyn LocalRefiner>>,
    rng: fastrand::Rng,
    observations: ObservationSet,
    /// Orientation of the stored values; `None` until the first run.
    direction: Option<Direction>,
    diagnostics: RunDiagnostics,
    phase: Phase,
}

impl Gpgo<SquaredExponential> {
    /// Creates a builder for a search over `bounds`.
    #[must_use]
    pub fn builder(bounds: Bounds) -> GpgoBuilder<SquaredExponential> {
        GpgoBuilder::new(bounds)
    }
}

impl<K: Kernel + Clone> Gpgo<K> {
    /// Minimize `f` over the bounds for `budget` iterations.
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`] if `f` and the bounds disagree.
    /// - [`Error::DirectionMismatch`] if earlier runs maximized.
    /// - Any numerical error from fitting the posterior or evaluating the
    ///   expected loss; the run stops at the failing iteration.
    pub fn minimize<F: Evaluable + ?Sized>(&mut self, f: &F) -> Result<RunSummary> {
        self.run(f, Direction::Minimize)
    }

    /// Maximize `f` by minimizing its negation. Values in the returned
    /// summary are in `f`'s own sign.
    ///
    /// # Errors
    ///
    /// Same as [`minimize`](Gpgo::minimize), with
    /// [`Error::DirectionMismatch`] if earlier runs minimized.
    pub fn maximize<F: Evaluable + ?Sized>(&mut self, f: &F) -> Result<RunSummary> {
        self.run(&negate(f), Direction::Maximize)
    }

    fn run<F: Evaluable + ?Sized>(&mut self, f: &F, direction: Direction) -> Result<RunSummary> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "gpgo",
            budget = self.budget,
            dims = self.bounds.dims(),
            direction = ?direction
        )
        .entered();

        self.bounds.check_dims(f.dimensions())?;
        self.orient(direction)?;
        self.diagnostics = RunDiagnostics::new(self.budget);
        let start = Instant::now();
        let mut evaluations = 0;

        if self.observations.is_empty() {
            self.phase = Phase::Initializing;
            let x0 = self.bounds.sample(&mut self.rng);
            let y0 = f.evaluate(&x0);
            self.observations.push(&x0, y0)?;
            evaluations += 1;
            trace_info!(value = direction.orient(y0), "evaluated initial point");
        }

        for iteration in 0..self.budget {
            self.phase = Phase::Fitting;
            let posterior = self.fit_posterior()?;
            let min_y = self.minimum_so_far().ok_or(Error::NoObservations)?;

            self.phase = Phase::SearchingAcquisition;
            let loss = ExpectedLoss::new(&posterior, min_y)?;
            let candidate = self.search(&loss);
            let (candidate, fallback) = self.separate(candidate);
            let acquisition_value = loss.value(&candidate)?;

            self.phase = Phase::Evaluating;
            let y = f.evaluate(&candidate);
            evaluations += 1;
            self.observations.push(&candidate, y)?;
            let best = self.minimum_so_far().unwrap_or(f64::NAN);
            let improved = improves(y, min_y);

            trace_info!(
                iteration,
                value = direction.orient(y),
                best = direction.orient(best),
                improved,
                fallback,
                "iteration complete"
            );

            self.diagnostics.record(IterationRecord {
                iteration,
                point: candidate,
                value: direction.orient(y),
                best_so_far: direction.orient(best),
                acquisition_value,
                elapsed: start.elapsed(),
                improved,
                fallback,
            })?;
        }

        self.phase = Phase::Terminated;
        let (best_point, best_value) = self
            .observations
            .best()
            .map(|(p, v)| (p.to_vec(), v))
            .ok_or(Error::NoObservations)?;

        Ok(RunSummary {
            best_point,
            best_value: direction.orient(best_value),
            direction,
            evaluations,
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Bring stored values into `direction`'s orientation. Seeded
    /// observations are taken in the caller's sign, so a first maximization
    /// run negates them.
    fn orient(&mut self, direction: Direction) -> Result<()> {
        match self.direction {
            Some(existing) if existing != direction => Err(Error::DirectionMismatch {
                existing,
                requested: direction,
            }),
            Some(_) => Ok(()),
            None => {
                if direction == Direction::Maximize && !self.observations.is_empty() {
                    let mut flipped = ObservationSet::new(self.observations.dims());
                    for (p, v) in self.observations.iter() {
                        flipped.push(p, -v)?;
                    }
                    self.observations = flipped;
                }
                self.direction = Some(direction);
                Ok(())
            }
        }
    }

    /// Minimize the expected loss: global search, then the optional local
    /// polish, then Newton steps when second derivatives are enabled.
    fn search(&self, loss: &ExpectedLoss<'_, K>) -> Vec<f64> {
        let mut candidate = self.global.minimize(loss, &self.bounds);

        if let Some(local) = &self.local {
            let refined = self.bounds.clamp(&local.minimize(loss, &candidate));
            if improves(loss.evaluate(&refined), loss.evaluate(&candidate)) {
                candidate = refined;
            }
        }

        if self.order == Order::Second {
            candidate = newton_polish(loss, &self.bounds, candidate);
        }

        trace_debug!(loss = loss.evaluate(&candidate), "acquisition minimized");
        candidate
    }

    /// Apply the minimum-separation policy: keep `candidate` if it is far
    /// enough from every stored point, otherwise draw random replacements and
    /// take the first separated one, or the farthest one if none is.
    fn separate(&mut self, candidate: Vec<f64>) -> (Vec<f64>, bool) {
        if !self.too_close(&candidate) {
            return (candidate, false);
        }
        trace_debug!("candidate too close to an observation, drawing a fallback");

        let mut farthest = candidate;
        let mut farthest_d = self.nearest_distance(&farthest);
        for _ in 0..MAX_SEPARATION_DRAWS {
            let x = self.bounds.sample(&mut self.rng);
            let d = self.nearest_distance(&x);
            if d >= self.min_separation {
                return (x, true);
            }
            if d > farthest_d {
                farthest = x;
                farthest_d = d;
            }
        }
        (farthest, true)
    }

    fn nearest_distance(&self, x: &[f64]) -> f64 {
        self.observations
            .nearest_distance(x)
            .unwrap_or(f64::INFINITY)
    }

    fn too_close(&self, x: &[f64]) -> bool {
        self.nearest_distance(x) < self.min_separation
    }

    /// Fit a posterior to all stored observations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoObservations`] before the first evaluation, or any
    /// error from [`GpPosterior::fit`].
    pub fn fit_posterior(&self) -> Result<GpPosterior<K>> {
        GpPosterior::fit(
            &self.observations.matrix(),
            &self.observations.values(),
            self.kernel.clone(),
            self.noise_variance,
        )
    }
}

impl<K> Gpgo<K> {
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stored observations. Values are in minimization orientation: after a
    /// maximization run they are the negated objective values.
    #[must_use]
    pub fn observations(&self) -> &ObservationSet {
        &self.observations
    }

    /// Smallest stored value, in minimization orientation.
    #[must_use]
    pub fn minimum_so_far(&self) -> Option<f64> {
        self.observations.min_value()
    }

    /// Best point and value in the orientation of the runs so far.
    #[must_use]
    pub fn best(&self) -> Option<(Vec<f64>, f64)> {
        let direction = self.direction.unwrap_or(Direction::Minimize);
        self.observations
            .best()
            .map(|(p, v)| (p.to_vec(), direction.orient(v)))
    }

    /// Records of the latest run.
    #[must_use]
    pub fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }

    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Noise variance added to the Gram diagonal.
    #[must_use]
    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

/// Damped Newton iterations on the expected loss, using its exact Hessian.
///
/// Each step solves `H d = -g` and backtracks along `d` (clamped to `bounds`)
/// until the loss decreases. Polishing stops at the first point where the
/// Hessian is not positive definite, where no step decreases the loss, or
/// where a prediction fails. Values on both sides of every comparison come
/// from the same dual evaluation.
fn newton_polish<K: Kernel>(
    loss: &ExpectedLoss<'_, K>,
    bounds: &Bounds,
    start: Vec<f64>,
) -> Vec<f64> {
    let mut x = start;
    let Ok(mut current) = loss.value_and_gradient(&x, 2) else {
        return x;
    };

    for _ in 0..NEWTON_STEPS {
        let Some(hessian) = current.hessian() else {
            break;
        };
        let Ok(factor) = linalg::cholesky(hessian.clone()) else {
            break;
        };
        let descent = current.gradient().map(|g| -g);
        let Ok(direction) = linalg::cholesky_solve(&factor, &descent) else {
            break;
        };

        let mut step = 1.0;
        let mut accepted = None;
        while step >= MIN_NEWTON_STEP {
            let trial: Vec<f64> = x
                .iter()
                .zip(direction.iter())
                .map(|(xi, di)| xi + step * di)
                .collect();
            let trial = bounds.clamp(&trial);
            if let Ok(next) = loss.value_and_gradient(&trial, 2)
                && improves(next.value(), current.value())
            {
                accepted = Some((trial, next));
                break;
            }
            step *= 0.5;
        }

        let Some((trial, next)) = accepted else {
            break;
        };
        x = trial;
        current = next;
    }
    x
}

/// Builder for configuring a [`Gpgo`].
///
/// All options except the bounds have defaults:
/// - `kernel`: [`SquaredExponential::default()`]
/// - `budget`: 100
/// - `noise_variance`: [`DEFAULT_NOISE_VARIANCE`]
/// - `min_separation`: 1e-2
/// - `global_minimizer`: [`SimulatedAnnealing`] seeded from the run seed
/// - `local_refiner`: none
/// - `derivative_order`: 1
/// - `seed`: random
/// - `observations`: none
///
/// # Examples
///
/// ```
/// use gpgo::kernel::SquaredExponential;
/// use gpgo::minimizer::RandomSearch;
/// use gpgo::{Bounds, GpgoBuilder};
///
/// let opt = GpgoBuilder::new(Bounds::unit(2))
///     .kernel(SquaredExponential::new(1.0, 0.3).unwrap())
///     .budget(25)
///     .global_minimizer(RandomSearch::with_seed(1))
///     .seed(42)
///     .build()
///     .unwrap();
/// assert_eq!(opt.budget(), 25);
/// ```
pub struct GpgoBuilder<K = SquaredExponential> {
    bounds: Bounds,
    kernel: K,
    budget: usize,
    noise_variance: f64,
    min_separation: f64,
    order: usize,
    global: Option<Box<dyn GlobalMinimizer>>,
    local: Option<Box<dyn LocalRefiner>>,
    seed: Option<u64>,
    observations: Option<ObservationSet>,
}

impl GpgoBuilder<SquaredExponential> {
    /// Creates a builder with default settings for a search over `bounds`.
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            kernel: SquaredExponential::default(),
            budget: 100,
            noise_variance: DEFAULT_NOISE_VARIANCE,
            min_separation: 1e-2,
            order: 1,
            global: None,
            local: None,
            seed: None,
            observations: None,
        }
    }
}

impl<K: Kernel> GpgoBuilder<K> {
    /// Sets the prior covariance kernel.
    #[must_use]
    pub fn kernel<K2: Kernel>(self, kernel: K2) -> GpgoBuilder<K2> {
        GpgoBuilder {
            bounds: self.bounds,
            kernel,
            budget: self.budget,
            noise_variance: self.noise_variance,
            min_separation: self.min_separation,
            order: self.order,
            global: self.global,
            local: self.local,
            seed: self.seed,
            observations: self.observations,
        }
    }

    /// Sets the number of outer iterations per run.
    #[must_use]
    pub fn budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the observation noise variance added to the Gram diagonal.
    ///
    /// With `0.0` the posterior interpolates exactly, but a fit fails with
    /// [`Error::NotPositiveDefinite`] once two observations are close enough
    /// to make the Gram matrix numerically singular.
    #[must_use]
    pub fn noise_variance(mut self, noise_variance: f64) -> Self {
        self.noise_variance = noise_variance;
        self
    }

    /// Sets the minimum distance between a new candidate and any stored point.
    #[must_use]
    pub fn min_separation(mut self, distance: f64) -> Self {
        self.min_separation = distance;
        self
    }

    #[must_use]
    pub fn global_minimizer(mut self, minimizer: impl GlobalMinimizer + 'static) -> Self {
        self.global = Some(Box::new(minimizer));
        self
    }

    /// Polish each global candidate with a gradient-based refiner.
    #[must_use]
    pub fn local_refiner(mut self, refiner: impl LocalRefiner + 'static) -> Self {
        self.local = Some(Box::new(refiner));
        self
    }

    /// Derivative order (1 or 2) of the dual-number loss evaluation. At 2,
    /// each acquisition candidate gets Newton steps on the exact Hessian.
    #[must_use]
    pub fn derivative_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start from existing observations instead of a random initial point.
    /// Values are in the objective's own sign.
    #[must_use]
    pub fn observations(mut self, observations: ObservationSet) -> Self {
        self.observations = Some(observations);
        self
    }

    /// Builds the configured [`Gpgo`].
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyBounds`] for zero-dimensional bounds.
    /// - [`Error::InvalidBudget`] for a zero budget.
    /// - [`Error::InvalidNoiseVariance`] / [`Error::InvalidSeparation`] for
    ///   negative or non-finite values.
    /// - [`Error::InvalidDerivativeOrder`] for orders other than 1 and 2.
    /// - [`Error::DimensionMismatch`] if seeded observations disagree with
    ///   the bounds.
    pub fn build(self) -> Result<Gpgo<K>> {
        if self.bounds.dims() == 0 {
            return Err(Error::EmptyBounds);
        }
        if self.budget == 0 {
            return Err(Error::InvalidBudget);
        }
        if !(self.noise_variance.is_finite() && self.noise_variance >= 0.0) {
            return Err(Error::InvalidNoiseVariance(self.noise_variance));
        }
        if !(self.min_separation.is_finite() && self.min_separation >= 0.0) {
            return Err(Error::InvalidSeparation(self.min_separation));
        }
        let order = Order::try_from(self.order)?;
        let observations = match self.observations {
            Some(obs) => {
                self.bounds.check_dims(obs.dims())?;
                obs
            }
            None => ObservationSet::new(self.bounds.dims()),
        };

        let mut rng = rng_util::seeded(self.seed);
        let global = match self.global {
            Some(g) => g,
            None => Box::new(SimulatedAnnealing::with_seed(rng.u64(..))),
        };

        Ok(Gpgo {
            bounds: self.bounds,
            kernel: self.kernel,
            budget: self.budget,
            noise_variance: self.noise_variance,
            min_separation: self.min_separation,
            order,
            global,
            local: self.local,
            rng,
            observations,
            direction: None,
            diagnostics: RunDiagnostics::new(0),
            phase: Phase::Initializing,
        })
    }
}
