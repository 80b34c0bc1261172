use parking_lot::Mutex;

use super::{GlobalMinimizer, improves};
use crate::function::Evaluable;
use crate::rng_util;
use crate::types::Bounds;

/// Default number of candidate points.
const DEFAULT_N_CANDIDATES: usize = 1000;

/// Evaluates uniformly drawn candidates and keeps the best.
///
/// # Examples
///
/// ```
/// use gpgo::function::from_fn;
/// use gpgo::minimizer::{GlobalMinimizer, RandomSearch};
/// use gpgo::types::Bounds;
///
/// let f = from_fn(1, |x: &[f64]| (x[0] - 0.25).powi(2));
/// let search = RandomSearch::with_seed(7).n_candidates(500);
/// let x = search.minimize(&f, &Bounds::unit(1));
/// assert!((x[0] - 0.25).abs() < 0.05);
/// ```
pub struct RandomSearch {
    n_candidates: usize,
    rng: Mutex<fastrand::Rng>,
}

impl RandomSearch {
    /// Random search with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::from_seed(None)
    }

    /// Random search with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_seed(Some(seed))
    }

    fn from_seed(seed: Option<u64>) -> Self {
        Self {
            n_candidates: DEFAULT_N_CANDIDATES,
            rng: Mutex::new(rng_util::seeded(seed)),
        }
    }

    /// Sets the number of candidates drawn per call. Values below 1 are
    /// raised to 1.
    ///
    /// Default: 1000.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }
}

impl Default for RandomSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalMinimizer for RandomSearch {
    fn minimize(&self, f: &dyn Evaluable, bounds: &Bounds) -> Vec<f64> {
        let mut rng = self.rng.lock();
        let mut best_x = bounds.sample(&mut rng);
        let mut best_v = f.evaluate(&best_x);

        for _ in 1..self.n_candidates {
            let x = bounds.sample(&mut rng);
            let v = f.evaluate(&x);
            if improves(v, best_v) {
                best_v = v;
                best_x = x;
            }
        }

        trace_debug!(best_v, n = self.n_candidates, "random search finished");
        best_x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::from_fn;

    #[test]
    fn test_result_in_bounds() {
        let bounds = Bounds::new(vec![-2.0, 3.0], vec![-1.0, 3.5]).unwrap();
        let f = from_fn(2, |x: &[f64]| x[0] + x[1]);
        let search = RandomSearch::with_seed(1).n_candidates(200);
        let x = search.minimize(&f, &bounds);
        assert!(bounds.contains(&x));
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let f = from_fn(2, |x: &[f64]| (x[0] - 0.2).powi(2) + (x[1] - 0.7).powi(2));
        let a = RandomSearch::with_seed(42).minimize(&f, &Bounds::unit(2));
        let b = RandomSearch::with_seed(42).minimize(&f, &Bounds::unit(2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_skips_nan_candidates() {
        let f = from_fn(1, |x: &[f64]| if x[0] < 0.5 { f64::NAN } else { x[0] });
        let x = RandomSearch::with_seed(3).minimize(&f, &Bounds::unit(1));
        assert!(x[0] >= 0.5);
        assert!(x[0] < 0.51);
    }
}
