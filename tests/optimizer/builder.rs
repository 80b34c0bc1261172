use gpgo::kernel::SquaredExponential;
use gpgo::minimizer::{RandomSearch, SimulatedAnnealing};
use gpgo::observations::ObservationSet;
use gpgo::{Bounds, Error, Gpgo, GpgoBuilder, Phase};

#[test]
fn test_builder_defaults() {
    let opt = Gpgo::builder(Bounds::unit(3)).build().unwrap();
    assert_eq!(opt.budget(), 100);
    assert_eq!(opt.bounds().dims(), 3);
    assert_eq!(opt.phase(), Phase::Initializing);
    assert!(opt.observations().is_empty());
    assert!(opt.minimum_so_far().is_none());
    assert!(opt.best().is_none());
    assert_eq!(opt.diagnostics().budget(), 0);
}

#[test]
fn test_builder_custom_kernel() {
    let kernel = SquaredExponential::new(2.0, 0.25).unwrap();
    let opt = GpgoBuilder::new(Bounds::unit(1))
        .kernel(kernel)
        .build()
        .unwrap();
    assert!((opt.kernel().length_scale() - 0.25).abs() < f64::EPSILON);
    assert!((opt.kernel().variance() - 2.0).abs() < f64::EPSILON);
}

#[test]
fn test_builder_accepts_custom_minimizers() {
    let annealing = SimulatedAnnealing::builder()
        .iterations(200)
        .restarts(2)
        .seed(4)
        .build()
        .unwrap();
    assert!(
        Gpgo::builder(Bounds::unit(2))
            .global_minimizer(annealing)
            .build()
            .is_ok()
    );
    assert!(
        Gpgo::builder(Bounds::unit(2))
            .global_minimizer(RandomSearch::with_seed(9).n_candidates(50))
            .build()
            .is_ok()
    );
}

#[test]
fn test_builder_rejects_bad_values() {
    assert!(matches!(
        Gpgo::builder(Bounds::unit(1)).budget(0).build(),
        Err(Error::InvalidBudget)
    ));
    assert!(matches!(
        Gpgo::builder(Bounds::unit(1))
            .noise_variance(f64::INFINITY)
            .build(),
        Err(Error::InvalidNoiseVariance(_))
    ));
    assert!(matches!(
        Gpgo::builder(Bounds::unit(1)).min_separation(-0.5).build(),
        Err(Error::InvalidSeparation(_))
    ));
    assert!(matches!(
        Gpgo::builder(Bounds::unit(1)).derivative_order(0).build(),
        Err(Error::InvalidDerivativeOrder(0))
    ));
}

#[test]
fn test_builder_seeded_observations() {
    let obs = ObservationSet::from_points(2, &[vec![0.1, 0.2], vec![0.5, 0.5]], &[3.0, 1.0])
        .unwrap();
    let opt = Gpgo::builder(Bounds::unit(2))
        .observations(obs)
        .build()
        .unwrap();
    assert_eq!(opt.observations().len(), 2);
    assert_eq!(opt.minimum_so_far(), Some(1.0));
    assert_eq!(opt.best(), Some((vec![0.5, 0.5], 1.0)));
}

#[test]
fn test_invalid_bounds() {
    assert!(matches!(
        Bounds::new(vec![1.0], vec![0.0]),
        Err(Error::InvalidBounds { index: 0, .. })
    ));
    assert!(matches!(
        Bounds::new(vec![0.0, 0.0], vec![1.0]),
        Err(Error::BoundsLengthMismatch { lower: 2, upper: 1 })
    ));
    assert!(matches!(
        Gpgo::builder(Bounds::unit(0)).build(),
        Err(Error::EmptyBounds)
    ));
}
