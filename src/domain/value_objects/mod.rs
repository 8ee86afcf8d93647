//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("amount is out of range")]
    AmountOutOfRange,
    #[error("invalid order number: {0}")]
    InvalidOrderNumber(String),
}

/// Largest single amount the store prices: one line total, an order
/// subtotal or a coupon value (10,000,000,000.00).
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000;

/// Money value object.
///
/// Fixed-point amount in the store currency, always held at two fractional
/// digits. Persisted as integer minor units (paise).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);
        Self(amount)
    }
    pub fn zero() -> Self { Self::from_minor(0) }
    pub fn from_minor(minor: i64) -> Self { Self::new(Decimal::new(minor, 2)) }
    pub fn from_major(major: i64) -> Self { Self::new(Decimal::from(major)) }

    pub fn amount(&self) -> Decimal { self.0 }
    pub fn to_minor(&self) -> Result<i64, ValueError> {
        i64::try_from(self.0.mantissa()).map_err(|_| ValueError::AmountOutOfRange)
    }

    pub fn ceiling() -> Self { Self::from_minor(MAX_AMOUNT_MINOR) }

    /// `self * qty`, rejected past [`MAX_AMOUNT_MINOR`].
    pub fn checked_multiply(&self, qty: Quantity) -> Result<Money, ValueError> {
        self.0.checked_mul(Decimal::from(qty.get())).map(Money::new).ok_or(ValueError::AmountOutOfRange)?.bounded()
    }

    pub fn checked_add(&self, rhs: Money) -> Result<Money, ValueError> {
        self.0.checked_add(rhs.0).map(Money::new).ok_or(ValueError::AmountOutOfRange)?.bounded()
    }

    pub fn bounded(self) -> Result<Money, ValueError> {
        if self.0.abs() > Self::ceiling().0 { Err(ValueError::AmountOutOfRange) } else { Ok(self) }
    }
    /// Applies a rate such as `0.09` and rounds half away from zero to paise.
    pub fn scale(&self, rate: Decimal) -> Money { Money::new(self.0 * rate) }

    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
}

impl Default for Money {
    fn default() -> Self { Self::zero() }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Money::new(amount) }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self { money.0 }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money::new(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money::new(self.0 - rhs.0) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), |acc, m| acc + m) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

/// Line-item quantity, never below 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Result<Self, ValueError> {
        if value == 0 { return Err(ValueError::ZeroQuantity); }
        Ok(Self(value))
    }
    pub fn get(&self) -> u32 { self.0 }
    pub fn increment(&self) -> Self { Self(self.0.saturating_add(1)) }
    /// `None` when the quantity is already 1.
    pub fn decrement(&self) -> Option<Self> {
        if self.0 <= 1 { None } else { Some(Self(self.0 - 1)) }
    }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl TryFrom<u32> for Quantity {
    type Error = ValueError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Quantity::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

/// Store-assigned order number, displayed as `ORD-<n>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(u64);

impl OrderNumber {
    pub const PREFIX: &'static str = "ORD-";

    pub fn new(sequence: u64) -> Self { Self(sequence) }
    pub fn sequence(&self) -> u64 { self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}{}", Self::PREFIX, self.0) }
}

impl FromStr for OrderNumber {
    type Err = ValueError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(Self::PREFIX).unwrap_or(trimmed);
        digits.parse::<u64>().map(OrderNumber).map_err(|_| ValueError::InvalidOrderNumber(s.to_string()))
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<OrderNumber> for String {
    fn from(n: OrderNumber) -> Self { n.to_string() }
}
