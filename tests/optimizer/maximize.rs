use gpgo::function::{Evaluable, from_fn};
use gpgo::observations::ObservationSet;
use gpgo::{Bounds, Direction, Error, Gpgo};

fn bump() -> impl Evaluable {
    from_fn(1, |x: &[f64]| 1.0 - (x[0] - 0.3).powi(2))
}

#[test]
fn test_maximize_reports_caller_sign() {
    let f = bump();
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .budget(10)
        .seed(42)
        .build()
        .unwrap();
    let summary = opt.maximize(&f).unwrap();

    assert_eq!(summary.direction, Direction::Maximize);
    assert!(summary.best_value > 0.9, "best {}", summary.best_value);
    assert!(summary.best_value <= 1.0);

    let best = summary.diagnostics.best_per_iteration();
    for pair in best.windows(2) {
        assert!(pair[1] >= pair[0], "best went down: {pair:?}");
    }
    for record in summary.diagnostics.iter() {
        assert!((record.value - f.evaluate(&record.point)).abs() < 1e-12);
    }
}

#[test]
fn test_maximize_stores_negated_values() {
    let f = bump();
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .budget(3)
        .seed(1)
        .build()
        .unwrap();
    let summary = opt.maximize(&f).unwrap();

    for (p, v) in opt.observations().iter() {
        assert!((v + f.evaluate(p)).abs() < 1e-12);
    }
    assert!((opt.minimum_so_far().unwrap() + summary.best_value).abs() < 1e-12);
    let (point, value) = opt.best().unwrap();
    assert_eq!(point, summary.best_point);
    assert!((value - summary.best_value).abs() < 1e-12);
}

#[test]
fn test_maximize_with_seeded_observations() {
    let obs = ObservationSet::from_points(1, &[vec![-0.8], vec![0.8]], &[-0.21, 0.75]).unwrap();
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .observations(obs)
        .budget(4)
        .seed(6)
        .build()
        .unwrap();
    let summary = opt.maximize(&bump()).unwrap();

    assert_eq!(summary.evaluations, 4);
    assert!(summary.best_value >= 0.75);
    // Seeded values are flipped with the rest.
    assert!((opt.observations().value(0) - 0.21).abs() < 1e-12);
    assert!((opt.observations().value(1) + 0.75).abs() < 1e-12);
}

#[test]
fn test_direction_is_fixed_after_first_run() {
    let mut opt = Gpgo::builder(Bounds::unit(1))
        .budget(2)
        .seed(3)
        .build()
        .unwrap();
    opt.maximize(&bump()).unwrap();
    opt.maximize(&bump()).unwrap();
    assert!(matches!(
        opt.minimize(&bump()),
        Err(Error::DirectionMismatch {
            existing: Direction::Maximize,
            requested: Direction::Minimize
        })
    ));
}
