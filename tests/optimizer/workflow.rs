use gpgo::function::from_fn;
use gpgo::minimizer::RandomSearch;
use gpgo::observations::ObservationSet;
use gpgo::{Bounds, Direction, Error, Gpgo, Phase};

fn shifted_square() -> impl gpgo::function::Evaluable {
    from_fn(1, |x: &[f64]| (x[0] - 0.3).powi(2))
}

fn optimizer(budget: usize, seed: u64) -> Gpgo {
    Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .budget(budget)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn test_run_fills_every_iteration() {
    let mut opt = optimizer(8, 42);
    let summary = opt.minimize(&shifted_square()).unwrap();

    assert_eq!(summary.direction, Direction::Minimize);
    assert_eq!(summary.evaluations, 9, "budget plus the initial point");
    assert_eq!(opt.observations().len(), 9);
    assert_eq!(opt.phase(), Phase::Terminated);

    let diag = &summary.diagnostics;
    assert_eq!(diag.budget(), 8);
    assert_eq!(diag.completed(), 8);
    for (i, record) in diag.iter().enumerate() {
        assert_eq!(record.iteration, i);
        assert!(opt.bounds().contains(&record.point));
        assert!(record.acquisition_value.is_finite());
    }
}

#[test]
fn test_best_is_monotone_and_time_accumulates() {
    let mut opt = optimizer(10, 7);
    let summary = opt.minimize(&shifted_square()).unwrap();

    let best = summary.diagnostics.best_per_iteration();
    assert_eq!(best.len(), 10);
    for pair in best.windows(2) {
        assert!(pair[1] <= pair[0], "best went up: {pair:?}");
    }
    assert!((best[9] - summary.best_value).abs() < f64::EPSILON);

    let millis = summary.diagnostics.cumulative_millis();
    assert_eq!(millis.len(), 10);
    for pair in millis.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
}

#[test]
fn test_improved_flag_matches_best() {
    let mut opt = optimizer(10, 13);
    let summary = opt.minimize(&shifted_square()).unwrap();
    let records: Vec<_> = summary.diagnostics.iter().collect();
    for pair in records.windows(2) {
        let lowered = pair[1].best_so_far < pair[0].best_so_far;
        assert_eq!(pair[1].improved, lowered);
    }
}

#[test]
fn test_finds_shifted_square_minimum() {
    let mut opt = optimizer(20, 42);
    let summary = opt.minimize(&shifted_square()).unwrap();
    assert!(
        (summary.best_point[0] - 0.3).abs() < 0.05,
        "best point {:?}",
        summary.best_point
    );
    assert!(summary.best_value < 2.5e-3);
}

#[test]
fn test_same_seed_same_trajectory() {
    let mut a = optimizer(6, 99);
    let mut b = optimizer(6, 99);
    a.minimize(&shifted_square()).unwrap();
    b.minimize(&shifted_square()).unwrap();
    let pa: Vec<&[f64]> = a.observations().iter().map(|(p, _)| p).collect();
    let pb: Vec<&[f64]> = b.observations().iter().map(|(p, _)| p).collect();
    assert_eq!(pa, pb);
}

#[test]
fn test_continuation_keeps_observations() {
    let mut opt = optimizer(4, 3);
    let first = opt.minimize(&shifted_square()).unwrap();
    let second = opt.minimize(&shifted_square()).unwrap();

    assert_eq!(first.evaluations, 5);
    assert_eq!(second.evaluations, 4, "no initial point on a continued run");
    assert_eq!(opt.observations().len(), 9);
    assert!(second.best_value <= first.best_value);
    // Diagnostics describe the latest run only.
    assert_eq!(opt.diagnostics().completed(), 4);
}

#[test]
fn test_two_dimensional_run() {
    let f = from_fn(2, |x: &[f64]| (x[0] - 0.2).powi(2) + (x[1] + 0.4).powi(2));
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0, -1.0], vec![1.0, 1.0]).unwrap())
        .budget(15)
        .seed(42)
        .build()
        .unwrap();
    let summary = opt.minimize(&f).unwrap();
    assert_eq!(summary.best_point.len(), 2);
    assert!(summary.best_value < 0.1, "best value {}", summary.best_value);
}

#[test]
fn test_random_search_acquisition() {
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .budget(6)
        .global_minimizer(RandomSearch::with_seed(5).n_candidates(200))
        .seed(5)
        .build()
        .unwrap();
    let summary = opt.minimize(&shifted_square()).unwrap();
    assert_eq!(summary.diagnostics.completed(), 6);
}

#[test]
fn test_second_order_evaluation() {
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .budget(5)
        .derivative_order(2)
        .seed(8)
        .build()
        .unwrap();
    let summary = opt.minimize(&shifted_square()).unwrap();
    assert_eq!(summary.diagnostics.completed(), 5);
}

#[test]
fn test_duplicate_seed_points_without_noise_fail() {
    let obs = ObservationSet::from_points(1, &[vec![0.5], vec![0.5]], &[0.04, 0.04]).unwrap();
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .observations(obs)
        .noise_variance(0.0)
        .budget(3)
        .seed(1)
        .build()
        .unwrap();
    let err = opt.minimize(&shifted_square()).unwrap_err();
    assert!(matches!(err, Error::NotPositiveDefinite { size: 2 }));
    assert!(err.is_numerical());
}

#[test]
fn test_default_settings_finish_budget() {
    let f = from_fn(1, |x: &[f64]| x[0] * x[0]);
    for seed in 0..5 {
        let mut opt = Gpgo::builder(Bounds::new(vec![-3.0], vec![3.0]).unwrap())
            .budget(40)
            .seed(seed)
            .build()
            .unwrap();
        let summary = opt
            .minimize(&f)
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        assert_eq!(summary.diagnostics.completed(), 40);
        assert_eq!(opt.observations().len(), 41);
        assert!(summary.best_value < 1e-2, "seed {seed}: {}", summary.best_value);
    }
}

#[test]
fn test_zero_noise_is_accepted() {
    let opt = Gpgo::builder(Bounds::unit(1))
        .noise_variance(0.0)
        .build()
        .unwrap();
    assert_eq!(opt.noise_variance(), 0.0);
}
