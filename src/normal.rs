//! Standard normal density and distribution functions expressed in both
//! plain and dual-number arithmetic.
//!
//! The CDF uses the Abramowitz–Stegun 7.1.26 rational approximation of
//! `erf`, which has a published maximum absolute error of 1.5e-7. Through
//! `Φ(z) = ½(1 + erf(z/√2))` that halves to 7.5e-8 on Φ. Because the
//! approximation is built only from `+`, `×`, `1/x` and `exp`, it runs
//! unchanged on [`Dual`] values and its derivatives are exact derivatives
//! of the approximation.

use core::f64::consts::SQRT_2;

use crate::dual::Dual;

const A1: f64 = 0.254_829_592;
const A2: f64 = -0.284_496_736;
const A3: f64 = 1.421_413_741;
const A4: f64 = -1.453_152_027;
const A5: f64 = 1.061_405_429;
const P: f64 = 0.327_591_1;

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Maximum absolute error of [`cdf`] against the exact standard normal CDF.
pub const MAX_CDF_ERROR: f64 = 7.5e-8;

/// Standard normal PDF.
#[must_use]
pub fn pdf(z: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * z * z).exp()
}

/// Standard normal CDF (A&S 7.1.26).
#[must_use]
pub fn cdf(z: f64) -> f64 {
    let sign = if z < 0.0 { -1.0 } else { 1.0 };
    let u = z * sign / SQRT_2;
    let t = 1.0 / (1.0 + P * u);
    let poly = t * (A1 + t * (A2 + t * (A3 + t * (A4 + t * A5))));
    let erf = 1.0 - poly * (-u * u).exp();
    0.5 * (1.0 + sign * erf)
}

/// Standard normal PDF of a dual number.
#[must_use]
pub fn pdf_dual(z: &Dual) -> Dual {
    (z.powi(2) * -0.5).exp() * INV_SQRT_2PI
}

/// Standard normal CDF of a dual number (A&S 7.1.26).
///
/// The sign branch is taken on the value only, so `u = |z|/√2` keeps the
/// correct derivative on either side of zero.
#[must_use]
pub fn cdf_dual(z: &Dual) -> Dual {
    let sign = if z.value() < 0.0 { -1.0 } else { 1.0 };
    let u = z * (sign / SQRT_2);
    let t = (&u * P + 1.0).recip();
    let horner = (((&t * A5 + A4) * &t + A3) * &t + A2) * &t + A1;
    let poly = &t * &horner;
    let erf = 1.0 - poly * (-u.powi(2)).exp();
    (erf * sign + 1.0) * 0.5
}
