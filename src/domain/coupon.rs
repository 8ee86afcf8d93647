//! Coupon codes redeemed at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CouponKind {
    Fixed(Money),
    /// Whole percent of the subtotal, 1..=100.
    Percentage(u32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    pub min_order: Money,
    pub max_discount: Option<Money>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("coupon code is required")]
    EmptyCode,
    #[error("coupon value must be positive")]
    InvalidValue,
    #[error("percentage must be between 1 and 100")]
    InvalidPercentage,
    #[error("coupon {0} is not active")]
    Inactive(String),
    #[error("coupon {0} has expired")]
    Expired(String),
    #[error("coupon requires a minimum order of {0}")]
    BelowMinimum(Money),
    #[error("unknown coupon {0}")]
    Unknown(String),
}

/// Codes are matched case-insensitively and stored upper-case.
pub fn normalize_code(code: &str) -> String { code.trim().to_uppercase() }

impl Coupon {
    pub fn new(code: &str, kind: CouponKind, min_order: Money) -> Result<Self, CouponError> {
        let code = normalize_code(code);
        if code.is_empty() { return Err(CouponError::EmptyCode); }
        if min_order.is_negative() || min_order.bounded().is_err() { return Err(CouponError::InvalidValue); }
        match kind {
            CouponKind::Fixed(amount) if !is_positive_amount(amount) => return Err(CouponError::InvalidValue),
            CouponKind::Percentage(p) if p == 0 || p > 100 => return Err(CouponError::InvalidPercentage),
            _ => {}
        }
        Ok(Self { code, kind, min_order, max_discount: None, active: true, expires_at: None, created_at: Utc::now() })
    }

    /// Caps the discount. The cap must be a positive amount.
    pub fn with_max_discount(mut self, cap: Money) -> Result<Self, CouponError> {
        if !is_positive_amount(cap) { return Err(CouponError::InvalidValue); }
        self.max_discount = Some(cap);
        Ok(self)
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self { self.expires_at = Some(at); self }

    /// Flat discount for `subtotal`, capped at the subtotal itself. The result
    /// is frozen on the order; later item edits do not re-evaluate it.
    pub fn discount_for(&self, subtotal: Money, now: DateTime<Utc>) -> Result<Money, CouponError> {
        if !self.active { return Err(CouponError::Inactive(self.code.clone())); }
        if self.expires_at.is_some_and(|at| at <= now) { return Err(CouponError::Expired(self.code.clone())); }
        if subtotal < self.min_order { return Err(CouponError::BelowMinimum(self.min_order)); }

        let raw = match self.kind {
            CouponKind::Fixed(amount) => amount,
            CouponKind::Percentage(p) => subtotal.scale(Decimal::new(p as i64, 2)),
        };
        let capped = match self.max_discount {
            Some(cap) if raw > cap => cap,
            _ => raw,
        };
        Ok(if capped > subtotal { subtotal } else { capped })
    }
}

fn is_positive_amount(amount: Money) -> bool {
    !amount.is_zero() && !amount.is_negative() && amount.bounded().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_coupon() {
        let c = Coupon::new(" save150 ", CouponKind::Fixed(Money::from_major(150)), Money::from_major(500)).unwrap();
        assert_eq!(c.code, "SAVE150");
        assert_eq!(c.discount_for(Money::from_major(1200), Utc::now()).unwrap(), Money::from_major(150));
        assert_eq!(c.discount_for(Money::from_major(499), Utc::now()), Err(CouponError::BelowMinimum(Money::from_major(500))));
    }

    #[test]
    fn test_percentage_coupon_with_cap() {
        let c = Coupon::new("TEN", CouponKind::Percentage(10), Money::zero()).unwrap().with_max_discount(Money::from_major(100)).unwrap();
        assert_eq!(c.discount_for(Money::from_major(500), Utc::now()).unwrap(), Money::from_major(50));
        assert_eq!(c.discount_for(Money::from_major(5000), Utc::now()).unwrap(), Money::from_major(100));
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let c = Coupon::new("BIG", CouponKind::Fixed(Money::from_major(500)), Money::zero()).unwrap();
        assert_eq!(c.discount_for(Money::from_major(120), Utc::now()).unwrap(), Money::from_major(120));
    }

    #[test]
    fn test_inactive_and_expired() {
        let now = Utc::now();
        let mut c = Coupon::new("OLD", CouponKind::Percentage(5), Money::zero()).unwrap().expiring_at(now - Duration::hours(1));
        assert_eq!(c.discount_for(Money::from_major(100), now), Err(CouponError::Expired("OLD".into())));
        c.active = false;
        assert_eq!(c.discount_for(Money::from_major(100), now), Err(CouponError::Inactive("OLD".into())));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(Coupon::new("", CouponKind::Percentage(5), Money::zero()).unwrap_err(), CouponError::EmptyCode);
        assert_eq!(Coupon::new("X", CouponKind::Percentage(101), Money::zero()).unwrap_err(), CouponError::InvalidPercentage);
        assert_eq!(Coupon::new("X", CouponKind::Fixed(Money::zero()), Money::zero()).unwrap_err(), CouponError::InvalidValue);
        assert_eq!(Coupon::new("X", CouponKind::Percentage(5), Money::from_major(-1)).unwrap_err(), CouponError::InvalidValue);
    }

    #[test]
    fn test_cap_must_be_positive() {
        let c = Coupon::new("TEN", CouponKind::Percentage(10), Money::zero()).unwrap();
        assert_eq!(c.clone().with_max_discount(Money::from_major(-500)).unwrap_err(), CouponError::InvalidValue);
        assert_eq!(c.clone().with_max_discount(Money::zero()).unwrap_err(), CouponError::InvalidValue);
        assert_eq!(c.with_max_discount(Money::from_major(50)).unwrap().max_discount, Some(Money::from_major(50)));
    }
}
