//! The language's numeric type.
//!
//! Opaque to the rest of the interpreter: everything goes through the
//! operations below, so the backing representation can change without
//! touching the machine.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A real number.
#[derive(Clone, Copy, Default)]
pub struct Number(f64);

impl Number {
    pub const ZERO: Number = Number(0.0);
    pub const ONE: Number = Number(1.0);

    /// Wrap a float.
    #[inline]
    pub fn new(value: f64) -> Self {
        // One zero: keeps equality and hashing consistent.
        if value == 0.0 {
            Number(0.0)
        } else {
            Number(value)
        }
    }

    /// The float value.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0
    }

    /// Exact non-negative integer value, if any.
    pub fn as_index(self) -> Option<usize> {
        let v = self.0;
        if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "checked integral, non-negative and in range above"
            )]
            let index = v as usize;
            Some(index)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    pub fn pow(self, exponent: Number) -> Number {
        Number::new(self.0.powf(exponent.0))
    }

    pub fn sin(self) -> Number {
        Number::new(self.0.sin())
    }

    pub fn cos(self) -> Number {
        Number::new(self.0.cos())
    }

    /// Square root. Callers reject negative inputs first.
    pub fn sqrt(self) -> Number {
        Number::new(self.0.sqrt())
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::new(value)
    }
}

impl From<usize> for Number {
    #[allow(clippy::cast_precision_loss, reason = "indices and counts stay far below 2^52")]
    fn from(value: usize) -> Self {
        Number::new(value as f64)
    }
}

impl Add for Number {
    type Output = Number;
    fn add(self, rhs: Number) -> Number {
        Number::new(self.0 + rhs.0)
    }
}

impl Sub for Number {
    type Output = Number;
    fn sub(self, rhs: Number) -> Number {
        Number::new(self.0 - rhs.0)
    }
}

impl Mul for Number {
    type Output = Number;
    fn mul(self, rhs: Number) -> Number {
        Number::new(self.0 * rhs.0)
    }
}

/// Division. Callers reject a zero divisor first.
impl Div for Number {
    type Output = Number;
    fn div(self, rhs: Number) -> Number {
        Number::new(self.0 / rhs.0)
    }
}

impl Neg for Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number::new(-self.0)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
