//! Per-iteration run records.

use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Direction;

/// What happened in one outer iteration.
///
/// Values are reported in the caller's orientation: for a maximization run,
/// `value` and `best_so_far` are the objective's own (un-negated) values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IterationRecord {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// The point evaluated in this iteration.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Best value over all observations after this iteration.
    pub best_so_far: f64,
    /// Expected loss at `point`, in minimization orientation. For a fallback
    /// iteration this is the loss at the random replacement, not at the
    /// rejected candidate.
    pub acquisition_value: f64,
    /// Wall time from the start of the run to the end of this iteration.
    pub elapsed: Duration,
    /// `true` if this iteration improved on the previous best.
    pub improved: bool,
    /// `true` if the acquisition candidate was too close to an existing
    /// observation and a random fallback point was evaluated instead.
    pub fallback: bool,
}

/// Fixed-length table of iteration records, one write-once slot per
/// iteration of the budget.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunDiagnostics {
    slots: Vec<Option<IterationRecord>>,
}

impl RunDiagnostics {
    /// An empty table with `budget` slots.
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Self {
            slots: vec![None; budget],
        }
    }

    /// Fill the slot for `record.iteration`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the slot is out of range or already
    /// filled.
    pub fn record(&mut self, record: IterationRecord) -> Result<()> {
        let slot = self
            .slots
            .get_mut(record.iteration)
            .ok_or(Error::Internal("iteration outside the budget"))?;
        if slot.is_some() {
            return Err(Error::Internal("iteration recorded twice"));
        }
        *slot = Some(record);
        Ok(())
    }

    /// Number of slots.
    #[must_use]
    pub fn budget(&self) -> usize {
        self.slots.len()
    }

    /// Number of filled slots.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn get(&self, iteration: usize) -> Option<&IterationRecord> {
        self.slots.get(iteration).and_then(Option::as_ref)
    }

    /// Filled records in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &IterationRecord> {
        self.slots.iter().flatten()
    }

    /// Milliseconds from the start of the run to the end of each iteration.
    /// Unfilled slots repeat the previous entry (0 before the first).
    #[must_use]
    pub fn cumulative_millis(&self) -> Vec<u64> {
        let mut last = 0;
        self.slots
            .iter()
            .map(|slot| {
                if let Some(r) = slot {
                    last = u64::try_from(r.elapsed.as_millis()).unwrap_or(u64::MAX);
                }
                last
            })
            .collect()
    }

    /// Best value so far after each iteration. Unfilled slots are NaN.
    #[must_use]
    pub fn best_per_iteration(&self) -> Vec<f64> {
        self.slots
            .iter()
            .map(|slot| slot.as_ref().map_or(f64::NAN, |r| r.best_so_far))
            .collect()
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Point with the best observed value.
    pub best_point: Vec<f64>,
    /// Best observed value, in the caller's orientation.
    pub best_value: f64,
    pub direction: Direction,
    /// Total objective evaluations, including the initial point.
    pub evaluations: usize,
    pub diagnostics: RunDiagnostics,
}
