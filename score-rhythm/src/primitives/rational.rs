//! Exact fractions for musical positions and lengths.
//!
//! Everything in the crate measures time in whole notes with [`Rational`].
//! It is a thin wrapper around `fraction::Fraction`, which never lets NaN
//! or infinity out and keeps a single (positive) zero, so equality, hashing
//! and ordering can be used directly on the stored value.
//!
//! Numerator always fits `i64` and denominator fits `1..=i64::MAX`.
//! Arithmetic is computed on 128-bit parts and fails with
//! [`TimeError::Overflow`] if the reduced result leaves that range.
//!
//! # Example
//!
//! ```
//! use score_rhythm::primitives::Rational;
//!
//! let quarter = Rational::new(1, 4).unwrap();
//! let half = Rational::new(2, 4).unwrap();
//! assert_eq!(quarter + quarter, half);
//! assert_eq!(half.numer(), 1);
//! assert_eq!(half.denom(), 2);
//! assert_eq!(half.divide_by_integer(3).unwrap(), Rational::new(1, 6).unwrap());
//! assert!(Rational::from_integer(i64::MAX).add(Rational::one()).is_err());
//! ```

use std::{
    cmp::Ordering,
    fmt,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub},
    str::FromStr,
};

use fraction::{
    CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Fraction, GenericFraction,
};
use serde::{Deserialize, Serialize};

use super::{TimeError, TimeResult};

/// Largest magnitude of a positive numerator and of a denominator.
const MAX_MAGNITUDE: u64 = i64::MAX as u64;

/// Intermediate results: products of two 64-bit parts never overflow it.
type WideFraction = GenericFraction<u128>;

/// Signed fraction, always in lowest terms with positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct Rational {
    fraction: Fraction,
}
impl Rational {
    /// Sign of the denominator moves to the numerator.
    ///
    /// # Errors
    /// - [`TimeError::InvalidRational`] if `denom` is zero.
    /// - [`TimeError::Overflow`] if the reduced value does not fit, e.g.
    ///   `i64::MIN / -1`.
    pub fn new(numer: i64, denom: i64) -> TimeResult<Self> {
        if denom == 0 {
            return Err(TimeError::InvalidRational { numer, denom });
        }
        let (numer_abs, denom_abs) = (numer.unsigned_abs(), denom.unsigned_abs());
        match (numer < 0) != (denom < 0) {
            true => Self::narrow(WideFraction::new_neg(numer_abs, denom_abs)),
            false => Self::narrow(WideFraction::new(numer_abs, denom_abs)),
        }
    }
    pub fn from_integer(value: i64) -> Self {
        Self::from_parts(value < 0, value.unsigned_abs(), 1)
    }
    pub fn zero() -> Self {
        Self::from_integer(0)
    }
    pub fn one() -> Self {
        Self::from_integer(1)
    }
    /// Non-negative `numer/denom`, with `denom` clamped to `1..=i64::MAX`.
    pub(crate) fn from_unsigned(numer: u32, denom: u64) -> Self {
        Self::from_parts(false, numer.into(), denom.clamp(1, MAX_MAGNITUDE))
    }

    /// Parts should be in range, `denom` is never zero here.
    fn from_parts(negative: bool, numer: u64, denom: u64) -> Self {
        match (numer, negative) {
            (0, _) => Self {
                fraction: Fraction::new(0_u64, 1_u64),
            },
            (_, false) => Self {
                fraction: Fraction::new(numer, denom),
            },
            (_, true) => Self {
                fraction: Fraction::new_neg(numer, denom),
            },
        }
    }

    fn widen(&self) -> WideFraction {
        let numer = self.magnitude();
        match self.fraction.is_sign_negative() {
            true => WideFraction::new_neg(numer, self.denom()),
            false => WideFraction::new(numer, self.denom()),
        }
    }
    /// Back to 64-bit parts, if the (already reduced) value fits.
    fn narrow(wide: WideFraction) -> TimeResult<Self> {
        let negative = wide.is_sign_negative();
        let (numer, denom) = match (wide.numer(), wide.denom()) {
            (Some(numer), Some(denom)) => (*numer, *denom),
            _ => return Err(TimeError::Overflow),
        };
        // i64::MIN has one more unit of magnitude than i64::MAX
        let numer_limit = match negative {
            true => u128::from(MAX_MAGNITUDE) + 1,
            false => u128::from(MAX_MAGNITUDE),
        };
        if numer > numer_limit || denom > u128::from(MAX_MAGNITUDE) {
            return Err(TimeError::Overflow);
        }
        Ok(Self::from_parts(negative, numer as u64, denom as u64))
    }
    fn checked(result: Option<WideFraction>) -> TimeResult<Self> {
        result.ok_or(TimeError::Overflow).and_then(Self::narrow)
    }

    fn magnitude(&self) -> u64 {
        self.fraction.numer().copied().unwrap_or(0)
    }
    /// Numerator of the reduced fraction, carrying the sign.
    pub fn numer(&self) -> i64 {
        let magnitude = i128::from(self.magnitude());
        let signed = match self.fraction.is_sign_negative() {
            true => -magnitude,
            false => magnitude,
        };
        // in range by construction, see `narrow`
        signed.clamp(i64::MIN.into(), i64::MAX.into()) as i64
    }
    /// Denominator of the reduced fraction, always positive.
    pub fn denom(&self) -> u64 {
        self.fraction.denom().copied().unwrap_or(1)
    }
    pub fn is_zero(&self) -> bool {
        self.magnitude() == 0
    }
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.fraction.is_sign_negative()
    }

    pub fn add(self, other: Self) -> TimeResult<Self> {
        Self::checked(self.widen().checked_add(&other.widen()))
    }
    pub fn subtract(self, other: Self) -> TimeResult<Self> {
        Self::checked(self.widen().checked_sub(&other.widen()))
    }
    pub fn multiply(self, other: Self) -> TimeResult<Self> {
        Self::checked(self.widen().checked_mul(&other.widen()))
    }
    pub fn multiply_by_integer(self, factor: i64) -> TimeResult<Self> {
        self.multiply(Self::from_integer(factor))
    }
    /// Fails with [`TimeError::DivisionByZero`] if `divisor` is zero.
    pub fn divide_by_integer(self, divisor: i64) -> TimeResult<Self> {
        if divisor == 0 {
            return Err(TimeError::DivisionByZero);
        }
        Self::checked(
            self.widen()
                .checked_div(&Self::from_integer(divisor).widen()),
        )
    }
    /// Exact ordering of the values, consistent with `Eq`.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.fraction.cmp(&other.fraction)
    }
}

/// Operators panic on overflow, like integer arithmetic does.
/// The named methods report it as [`TimeError::Overflow`] instead.
fn expect_in_range(result: TimeResult<Rational>, op: &str) -> Rational {
    match result {
        Ok(value) => value,
        Err(err) => panic!("attempt to {op} rationals: {err}"),
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}
impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}
impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Add for Rational {
    fn add(self, rhs: Self) -> Self::Output {
        expect_in_range(Rational::add(self, rhs), "add")
    }
    type Output = Self;
}
impl Sub for Rational {
    fn sub(self, rhs: Self) -> Self::Output {
        expect_in_range(self.subtract(rhs), "subtract")
    }
    type Output = Self;
}
impl Mul for Rational {
    fn mul(self, rhs: Self) -> Self::Output {
        expect_in_range(self.multiply(rhs), "multiply")
    }
    type Output = Self;
}
impl Mul<i64> for Rational {
    fn mul(self, rhs: i64) -> Self::Output {
        expect_in_range(self.multiply_by_integer(rhs), "multiply")
    }
    type Output = Self;
}
impl Neg for Rational {
    fn neg(self) -> Self::Output {
        expect_in_range(Self::zero().subtract(self), "negate")
    }
    type Output = Self;
}
impl Sum for Rational {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, value| acc + value)
    }
}
impl<'a> Sum<&'a Rational> for Rational {
    fn sum<I: Iterator<Item = &'a Rational>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}
impl TryFrom<(i64, i64)> for Rational {
    type Error = TimeError;
    fn try_from((numer, denom): (i64, i64)) -> Result<Self, Self::Error> {
        Self::new(numer, denom)
    }
}
impl From<Rational> for (i64, i64) {
    fn from(value: Rational) -> Self {
        (value.numer(), value.denom() as i64)
    }
}
impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.denom() {
            1 => write!(f, "{}", self.numer()),
            denom => write!(f, "{}/{}", self.numer(), denom),
        }
    }
}
impl FromStr for Rational {
    type Err = TimeError;

    /// Parses `"n/d"` or a plain integer `"n"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim().parse::<i64>().map_err(|e| TimeError::Parse {
                input: s.to_string(),
                reason: e.to_string(),
            })
        };
        match s.split_once('/') {
            None => Ok(Self::from_integer(parse(s)?)),
            Some((numer, denom)) => Self::new(parse(numer)?, parse(denom)?),
        }
    }
}
