//! Forward-mode automatic differentiation with first- and second-order
//! dual numbers.
//!
//! A [`Dual`] carries a value together with its gradient (and optionally its
//! Hessian) with respect to a fixed set of `n` free variables. Arithmetic and
//! the elementary functions below propagate derivatives through the chain
//! rule, so any formula written in terms of `Dual` yields exact analytic
//! derivatives alongside its value.
//!
//! For a unary function `f` applied to `u`:
//!
//! - `∇f(u) = f'(u) ∇u`
//! - `∇²f(u) = f'(u) ∇²u + f''(u) ∇u ∇uᵀ`
//!
//! # Examples
//!
//! ```
//! use gpgo::dual::{Dual, Order};
//!
//! // f(x, y) = x² · y at (3, 2)
//! let vars = Dual::variables(&[3.0, 2.0], Order::Second);
//! let f = vars[0].powi(2) * &vars[1];
//!
//! assert_eq!(f.value(), 18.0);
//! assert_eq!(f.gradient().as_slice(), &[12.0, 9.0]);
//! let h = f.hessian().unwrap();
//! assert_eq!(h[(0, 0)], 4.0);
//! assert_eq!(h[(0, 1)], 6.0);
//! ```

use core::ops::{Add, Div, Mul, Neg, Sub};

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Highest derivative order carried by a [`Dual`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Value and gradient.
    First,
    /// Value, gradient and Hessian.
    Second,
}

impl TryFrom<usize> for Order {
    type Error = Error;

    fn try_from(order: usize) -> Result<Self> {
        match order {
            1 => Ok(Order::First),
            2 => Ok(Order::Second),
            other => Err(Error::InvalidDerivativeOrder(other)),
        }
    }
}

impl From<Order> for usize {
    fn from(order: Order) -> Self {
        match order {
            Order::First => 1,
            Order::Second => 2,
        }
    }
}

/// A scalar carrying its partial derivatives with respect to `n` variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Dual {
    value: f64,
    gradient: DVector<f64>,
    hessian: Option<DMatrix<f64>>,
}

impl Dual {
    /// A constant: all derivatives are zero.
    #[must_use]
    pub fn constant(n_vars: usize, order: Order, value: f64) -> Self {
        Self {
            value,
            gradient: DVector::zeros(n_vars),
            hessian: match order {
                Order::First => None,
                Order::Second => Some(DMatrix::zeros(n_vars, n_vars)),
            },
        }
    }

    /// The free variable with index `index`: its gradient is the unit vector `e_index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= n_vars`.
    #[must_use]
    pub fn variable(n_vars: usize, order: Order, index: usize, value: f64) -> Self {
        let mut dual = Self::constant(n_vars, order, value);
        dual.gradient[index] = 1.0;
        dual
    }

    /// Seeds one free variable per coordinate of `point`.
    #[must_use]
    pub fn variables(point: &[f64], order: Order) -> Vec<Self> {
        let n = point.len();
        point
            .iter()
            .enumerate()
            .map(|(i, &v)| Self::variable(n, order, i, v))
            .collect()
    }

    /// A constant with the same shape (variable count and order) as `self`.
    #[must_use]
    pub fn constant_like(&self, value: f64) -> Self {
        Self::constant(self.n_vars(), self.order(), value)
    }

    /// The value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// First partial derivatives.
    #[must_use]
    pub fn gradient(&self) -> &DVector<f64> {
        &self.gradient
    }

    /// Second partial derivatives, present for [`Order::Second`].
    #[must_use]
    pub fn hessian(&self) -> Option<&DMatrix<f64>> {
        self.hessian.as_ref()
    }

    /// Number of free variables.
    #[must_use]
    pub fn n_vars(&self) -> usize {
        self.gradient.len()
    }

    /// Highest derivative order carried.
    #[must_use]
    pub fn order(&self) -> Order {
        if self.hessian.is_some() {
            Order::Second
        } else {
            Order::First
        }
    }

    /// Applies a unary function given its value and first two derivatives at `self.value`.
    fn chain(&self, f0: f64, f1: f64, f2: f64) -> Self {
        let hessian = self.hessian.as_ref().map(|h| {
            let mut out = h * f1;
            if f2 != 0.0 {
                out += (&self.gradient * self.gradient.transpose()) * f2;
            }
            out
        });
        Self {
            value: f0,
            gradient: &self.gradient * f1,
            hessian,
        }
    }

    /// `e^self`.
    #[must_use]
    pub fn exp(&self) -> Self {
        let e = self.value.exp();
        self.chain(e, e, e)
    }

    /// Natural logarithm.
    #[must_use]
    pub fn ln(&self) -> Self {
        let v = self.value;
        self.chain(v.ln(), 1.0 / v, -1.0 / (v * v))
    }

    /// Square root. Derivatives are infinite at zero.
    #[must_use]
    pub fn sqrt(&self) -> Self {
        let s = self.value.sqrt();
        self.chain(s, 0.5 / s, -0.25 / (s * self.value))
    }

    /// `1 / self`.
    #[must_use]
    pub fn recip(&self) -> Self {
        let v = self.value;
        self.chain(1.0 / v, -1.0 / (v * v), 2.0 / (v * v * v))
    }

    /// Integer power.
    #[must_use]
    pub fn powi(&self, n: i32) -> Self {
        let v = self.value;
        let nf = f64::from(n);
        let f1 = if n == 0 { 0.0 } else { nf * v.powi(n - 1) };
        let f2 = if n == 0 || n == 1 {
            0.0
        } else {
            nf * (nf - 1.0) * v.powi(n - 2)
        };
        self.chain(v.powi(n), f1, f2)
    }

    /// Scales value and all derivatives by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            gradient: &self.gradient * factor,
            hessian: self.hessian.as_ref().map(|h| h * factor),
        }
    }

    /// Dot product of two dual vectors.
    #[must_use]
    pub fn dot(a: &[Dual], b: &[Dual]) -> Option<Self> {
        let first = a.first()?;
        let zero = first.constant_like(0.0);
        Some(a.iter().zip(b).fold(zero, |acc, (x, y)| acc + x * y))
    }
}

fn combine_hessians(
    a: Option<&DMatrix<f64>>,
    b: Option<&DMatrix<f64>>,
    f: impl FnOnce(&DMatrix<f64>, &DMatrix<f64>) -> DMatrix<f64>,
) -> Option<DMatrix<f64>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        _ => None,
    }
}

impl Add<&Dual> for &Dual {
    type Output = Dual;

    fn add(self, rhs: &Dual) -> Dual {
        Dual {
            value: self.value + rhs.value,
            gradient: &self.gradient + &rhs.gradient,
            hessian: combine_hessians(self.hessian(), rhs.hessian(), |a, b| a + b),
        }
    }
}

impl Sub<&Dual> for &Dual {
    type Output = Dual;

    fn sub(self, rhs: &Dual) -> Dual {
        Dual {
            value: self.value - rhs.value,
            gradient: &self.gradient - &rhs.gradient,
            hessian: combine_hessians(self.hessian(), rhs.hessian(), |a, b| a - b),
        }
    }
}

impl Mul<&Dual> for &Dual {
    type Output = Dual;

    fn mul(self, rhs: &Dual) -> Dual {
        let (a, b) = (self.value, rhs.value);
        let hessian = combine_hessians(self.hessian(), rhs.hessian(), |ha, hb| {
            let cross = &self.gradient * rhs.gradient.transpose();
            ha * b + hb * a + &cross + cross.transpose()
        });
        Dual {
            value: a * b,
            gradient: &self.gradient * b + &rhs.gradient * a,
            hessian,
        }
    }
}

impl Div<&Dual> for &Dual {
    type Output = Dual;

    fn div(self, rhs: &Dual) -> Dual {
        self * &rhs.recip()
    }
}

impl Add<f64> for &Dual {
    type Output = Dual;

    fn add(self, rhs: f64) -> Dual {
        let mut out = self.clone();
        out.value += rhs;
        out
    }
}

impl Sub<f64> for &Dual {
    type Output = Dual;

    fn sub(self, rhs: f64) -> Dual {
        self + (-rhs)
    }
}

impl Mul<f64> for &Dual {
    type Output = Dual;

    fn mul(self, rhs: f64) -> Dual {
        self.scale(rhs)
    }
}

impl Div<f64> for &Dual {
    type Output = Dual;

    fn div(self, rhs: f64) -> Dual {
        self.scale(1.0 / rhs)
    }
}

impl Add<&Dual> for f64 {
    type Output = Dual;

    fn add(self, rhs: &Dual) -> Dual {
        rhs + self
    }
}

impl Sub<&Dual> for f64 {
    type Output = Dual;

    fn sub(self, rhs: &Dual) -> Dual {
        &(-rhs) + self
    }
}

impl Mul<&Dual> for f64 {
    type Output = Dual;

    fn mul(self, rhs: &Dual) -> Dual {
        rhs.scale(self)
    }
}

impl Div<&Dual> for f64 {
    type Output = Dual;

    fn div(self, rhs: &Dual) -> Dual {
        rhs.recip().scale(self)
    }
}

impl Neg for &Dual {
    type Output = Dual;

    fn neg(self) -> Dual {
        self.scale(-1.0)
    }
}

impl Neg for Dual {
    type Output = Dual;

    fn neg(self) -> Dual {
        self.scale(-1.0)
    }
}

/// Owned-operand variants forward to the by-reference implementations.
macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl $trait<Dual> for Dual {
            type Output = Dual;

            fn $method(self, rhs: Dual) -> Dual {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&Dual> for Dual {
            type Output = Dual;

            fn $method(self, rhs: &Dual) -> Dual {
                (&self).$method(rhs)
            }
        }

        impl $trait<Dual> for &Dual {
            type Output = Dual;

            fn $method(self, rhs: Dual) -> Dual {
                self.$method(&rhs)
            }
        }

        impl $trait<f64> for Dual {
            type Output = Dual;

            fn $method(self, rhs: f64) -> Dual {
                (&self).$method(rhs)
            }
        }

        impl $trait<Dual> for f64 {
            type Output = Dual;

            fn $method(self, rhs: Dual) -> Dual {
                self.$method(&rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);
