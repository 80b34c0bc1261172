#![cfg(feature = "serde")]

use core::time::Duration;

use gpgo::diagnostics::{IterationRecord, RunDiagnostics, RunSummary};
use gpgo::function::from_fn;
use gpgo::kernel::SquaredExponential;
use gpgo::observations::ObservationSet;
use gpgo::schedule::{AdaDeltaConfig, AdaGradConfig};
use gpgo::{Bounds, Direction, Gpgo};

fn record(iteration: usize, value: f64, best: f64) -> IterationRecord {
    IterationRecord {
        iteration,
        point: vec![0.25, -0.5],
        value,
        best_so_far: best,
        acquisition_value: 0.125,
        elapsed: Duration::from_millis(3 * iteration as u64 + 1),
        improved: value <= best,
        fallback: false,
    }
}

#[test]
fn round_trip_bounds_and_direction() {
    let bounds = Bounds::new(vec![-3.0, 0.0], vec![3.0, 1.5]).unwrap();
    let json = serde_json::to_string(&bounds).unwrap();
    let back: Bounds = serde_json::from_str(&json).unwrap();
    assert_eq!(back, bounds);

    let json = serde_json::to_string(&Direction::Maximize).unwrap();
    let back: Direction = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Direction::Maximize);
}

#[test]
fn round_trip_kernel_and_schedules() {
    let kernel = SquaredExponential::new(1.5, 0.25).unwrap();
    let back: SquaredExponential =
        serde_json::from_str(&serde_json::to_string(&kernel).unwrap()).unwrap();
    assert_eq!(back, kernel);

    let adagrad = AdaGradConfig {
        eta: 0.5,
        constant_addend: 1e-8,
    };
    let back: AdaGradConfig =
        serde_json::from_str(&serde_json::to_string(&adagrad).unwrap()).unwrap();
    assert_eq!(back, adagrad);

    let adadelta = AdaDeltaConfig {
        decay_rate: 0.9,
        constant_addend: 1e-6,
    };
    let back: AdaDeltaConfig =
        serde_json::from_str(&serde_json::to_string(&adadelta).unwrap()).unwrap();
    assert_eq!(back, adadelta);
}

#[test]
fn round_trip_observations() {
    let obs = ObservationSet::from_points(
        2,
        &[vec![0.0, 1.0], vec![0.5, 0.5], vec![-1.0, 0.25]],
        &[3.0, 1.5, 0.75],
    )
    .unwrap();
    let json = serde_json::to_string(&obs).unwrap();
    let back: ObservationSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, obs);
    assert_eq!(back.point(2), &[-1.0, 0.25]);
}

#[test]
fn round_trip_partial_diagnostics() {
    let mut diag = RunDiagnostics::new(3);
    diag.record(record(0, 2.0, 2.0)).unwrap();
    diag.record(record(1, 4.0, 2.0)).unwrap();

    let json = serde_json::to_string(&diag).unwrap();
    let back: RunDiagnostics = serde_json::from_str(&json).unwrap();
    assert_eq!(back, diag);
    assert_eq!(back.completed(), 2);
    assert!(back.get(2).is_none());
    assert_eq!(back.cumulative_millis(), vec![1, 4, 4]);
}

#[test]
fn round_trip_summary() {
    let mut diagnostics = RunDiagnostics::new(1);
    diagnostics.record(record(0, 0.5, 0.5)).unwrap();
    let summary = RunSummary {
        best_point: vec![0.25, -0.5],
        best_value: 0.5,
        direction: Direction::Minimize,
        evaluations: 2,
        diagnostics,
    };
    let back: RunSummary = serde_json::from_str(&serde_json::to_string(&summary).unwrap()).unwrap();
    assert_eq!(back, summary);
}

#[test]
fn saved_observations_resume_a_run() {
    let f = from_fn(1, |x: &[f64]| (x[0] - 0.3).powi(2));
    let bounds = Bounds::new(vec![-1.0], vec![1.0]).unwrap();
    let mut first = Gpgo::builder(bounds.clone())
        .budget(4)
        .seed(21)
        .build()
        .unwrap();
    first.minimize(&f).unwrap();

    let json = serde_json::to_string(first.observations()).unwrap();
    let saved: ObservationSet = serde_json::from_str(&json).unwrap();
    assert_eq!(saved.len(), 5);
    for ((p, v), (q, w)) in saved.iter().zip(first.observations().iter()) {
        assert!((p[0] - q[0]).abs() < 1e-12);
        assert!((v - w).abs() < 1e-12);
    }

    let mut resumed = Gpgo::builder(bounds)
        .observations(saved)
        .budget(3)
        .seed(22)
        .build()
        .unwrap();
    let summary = resumed.minimize(&f).unwrap();
    assert_eq!(summary.evaluations, 3);
    assert_eq!(resumed.observations().len(), 8);
}
