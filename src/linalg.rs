//! Cholesky factorization and triangular solves.
//!
//! Every solve against `K + σ²I` goes through its lower-triangular factor
//! `L` as a forward substitution (`L y = b`) followed, where needed, by a
//! back substitution (`Lᵀ x = y`). The inverse is never formed.

use nalgebra::{DMatrix, DVector};

use crate::dual::Dual;
use crate::error::{Error, Result};

/// Factor a symmetric positive-definite matrix as `L Lᵀ` and return `L`.
///
/// # Errors
///
/// Returns [`Error::NotPositiveDefinite`] if the factorization breaks down.
pub fn cholesky(a: DMatrix<f64>) -> Result<DMatrix<f64>> {
    let size = a.nrows();
    nalgebra::linalg::Cholesky::new(a)
        .map(nalgebra::linalg::Cholesky::unpack)
        .ok_or(Error::NotPositiveDefinite { size })
}

/// Solve `L x = b` for lower-triangular `L`.
///
/// # Errors
///
/// Returns [`Error::NotPositiveDefinite`] if `L` has a zero on its diagonal.
pub fn forward_substitute(l: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    let mut x = b.clone();
    if l.solve_lower_triangular_mut(&mut x) {
        Ok(x)
    } else {
        Err(Error::NotPositiveDefinite { size: l.nrows() })
    }
}

/// Solve `Lᵀ x = b` for lower-triangular `L`.
///
/// # Errors
///
/// Returns [`Error::NotPositiveDefinite`] if `L` has a zero on its diagonal.
pub fn back_substitute(l: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    let mut x = b.clone();
    if l.tr_solve_lower_triangular_mut(&mut x) {
        Ok(x)
    } else {
        Err(Error::NotPositiveDefinite { size: l.nrows() })
    }
}

/// Solve `L Lᵀ x = b` with two triangular solves.
///
/// # Errors
///
/// Returns [`Error::NotPositiveDefinite`] if `L` has a zero on its diagonal.
pub fn cholesky_solve(l: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    back_substitute(l, &forward_substitute(l, b)?)
}

/// Solve `L x = b` in place where `b` carries derivatives.
///
/// `L` is a constant, so derivatives flow only through `b`.
pub fn forward_substitute_dual(l: &DMatrix<f64>, b: &mut [Dual]) {
    for i in 0..b.len() {
        let mut acc = b[i].clone();
        for j in 0..i {
            acc = acc - &b[j] * l[(i, j)];
        }
        b[i] = acc / l[(i, i)];
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::dual::Order;

    fn random_spd(n: usize, rng: &mut fastrand::Rng) -> DMatrix<f64> {
        let m = DMatrix::from_fn(n, n, |_, _| rng.f64() * 2.0 - 1.0);
        &m * m.transpose() + DMatrix::identity(n, n) * (n as f64)
    }

    #[test]
    fn test_cholesky_reconstructs_matrix() {
        let mut rng = fastrand::Rng::with_seed(3);
        let a = random_spd(6, &mut rng);
        let l = cholesky(a.clone()).unwrap();
        let diff = (&l * l.transpose() - &a).abs().max();
        assert!(diff < 1e-12, "reconstruction error {diff}");
        for i in 0..6 {
            for j in (i + 1)..6 {
                assert_eq!(l[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            cholesky(a),
            Err(Error::NotPositiveDefinite { size: 2 })
        ));
    }

    #[test]
    fn test_solve_matches_explicit_inverse() {
        let mut rng = fastrand::Rng::with_seed(11);
        for n in [1, 3, 8, 15] {
            let a = random_spd(n, &mut rng);
            let b = DVector::from_fn(n, |_, _| rng.f64() * 10.0 - 5.0);
            let l = cholesky(a.clone()).unwrap();
            let x = cholesky_solve(&l, &b).unwrap();
            let expected = a.try_inverse().unwrap() * &b;
            let rel = (&x - &expected).norm() / expected.norm();
            assert!(rel < 1e-8, "n = {n}: relative error {rel}");
        }
    }

    #[test]
    fn test_dual_forward_substitution_matches_plain() {
        let mut rng = fastrand::Rng::with_seed(5);
        let a = random_spd(4, &mut rng);
        let l = cholesky(a).unwrap();
        let b = DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0]);
        let plain = forward_substitute(&l, &b).unwrap();

        let mut dual: Vec<Dual> = b
            .iter()
            .map(|&v| Dual::constant(2, Order::First, v))
            .collect();
        forward_substitute_dual(&l, &mut dual);
        for (d, p) in dual.iter().zip(plain.iter()) {
            assert!((d.value() - p).abs() < 1e-12);
        }
    }
}
