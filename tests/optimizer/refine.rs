use gpgo::function::from_fn;
use gpgo::minimizer::{GradientDescent, RandomSearch};
use gpgo::schedule::{AdaGrad, AdaGradConfig};
use gpgo::{Bounds, Gpgo};

#[test]
fn test_local_refiner_after_random_search() {
    let f = from_fn(1, |x: &[f64]| (x[0] - 0.3).powi(2));
    let mut opt = Gpgo::builder(Bounds::new(vec![-1.0], vec![1.0]).unwrap())
        .budget(8)
        .global_minimizer(RandomSearch::with_seed(3).n_candidates(20))
        .local_refiner(GradientDescent::builder().max_iterations(50).build().unwrap())
        .seed(3)
        .build()
        .unwrap();
    let summary = opt.minimize(&f).unwrap();
    assert_eq!(summary.diagnostics.completed(), 8);
    for record in summary.diagnostics.iter() {
        assert!(opt.bounds().contains(&record.point));
    }
}

#[test]
fn test_local_refiner_with_gain_schedule() {
    let f = from_fn(2, |x: &[f64]| x[0].powi(2) + (x[1] - 0.5).powi(2));
    let refiner = GradientDescent::builder()
        .max_iterations(30)
        .gain_schedule(AdaGrad::new(AdaGradConfig::default()).unwrap())
        .build()
        .unwrap();
    let mut opt = Gpgo::builder(Bounds::unit(2))
        .budget(6)
        .local_refiner(refiner)
        .seed(10)
        .build()
        .unwrap();
    let summary = opt.minimize(&f).unwrap();
    assert_eq!(summary.evaluations, 7);
    assert!(summary.best_value.is_finite());
}
