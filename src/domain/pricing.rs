//! Order totals calculator.
//!
//! Checkout, quotes and admin item edits all price orders through
//! [`compute_totals`] with [`ShippingPolicy::standard`], so the free-shipping
//! threshold and flat fee exist in exactly one place.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::LineItem;
use crate::domain::value_objects::{Money, ValueError};

/// Orders with a subtotal at or above this amount ship free (999.00).
pub const FREE_SHIPPING_THRESHOLD_MINOR: i64 = 99_900;
/// Shipping fee charged below the threshold (99.00).
pub const FLAT_SHIPPING_FEE_MINOR: i64 = 9_900;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_threshold: Money,
    pub flat_fee: Money,
}

impl ShippingPolicy {
    pub fn standard() -> Self {
        Self {
            free_threshold: Money::from_minor(FREE_SHIPPING_THRESHOLD_MINOR),
            flat_fee: Money::from_minor(FLAT_SHIPPING_FEE_MINOR),
        }
    }

    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_threshold { Money::zero() } else { self.flat_fee }
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self { Self::standard() }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal - self.discount + self.shipping
    }
}

/// `total = subtotal - discount + shipping`. An empty item list prices to a
/// zero subtotal with the flat fee applied. Fails when the subtotal passes
/// [`Money::ceiling`].
pub fn compute_totals(items: &[LineItem], discount: Money, policy: &ShippingPolicy) -> Result<OrderTotals, ValueError> {
    let subtotal = items.iter().try_fold(Money::zero(), |acc, i| acc.checked_add(i.line_total()))?;
    let discount = discount.bounded()?;
    let shipping = policy.shipping_for(subtotal);
    Ok(OrderTotals { subtotal, shipping, discount, total: subtotal - discount + shipping })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Quantity;
    use rust_decimal::Decimal;

    fn item(id: &str, price: Money, qty: u32) -> LineItem {
        LineItem::new(id, format!("Product {id}"), None, Quantity::new(qty).unwrap(), price).unwrap()
    }

    #[test]
    fn test_subtotal_is_sum_of_lines() {
        let items = vec![item("P1", Money::new(Decimal::new(1999, 2)), 3), item("P2", Money::from_minor(1), 7)];
        let t = compute_totals(&items, Money::zero(), &ShippingPolicy::standard()).unwrap();
        assert_eq!(t.subtotal, Money::from_minor(1999 * 3 + 7));
    }

    #[test]
    fn test_free_shipping_boundary() {
        let policy = ShippingPolicy::standard();
        assert_eq!(policy.shipping_for(Money::from_major(999)), Money::zero());
        assert_eq!(policy.shipping_for(Money::from_minor(99_899)), Money::from_major(99));
    }

    #[test]
    fn test_mixed_cart_ships_free() {
        let items = vec![item("P1", Money::from_major(500), 2), item("P2", Money::from_major(200), 1)];
        let t = compute_totals(&items, Money::zero(), &ShippingPolicy::standard()).unwrap();
        assert_eq!(t.subtotal, Money::from_major(1200));
        assert_eq!(t.shipping, Money::zero());
        assert_eq!(t.total, Money::from_major(1200));
    }

    #[test]
    fn test_small_order_pays_flat_fee() {
        let items = vec![item("P1", Money::from_major(100), 1)];
        let t = compute_totals(&items, Money::zero(), &ShippingPolicy::standard()).unwrap();
        assert_eq!(t.subtotal, Money::from_major(100));
        assert_eq!(t.shipping, Money::from_major(99));
        assert_eq!(t.total, Money::from_major(199));
    }

    #[test]
    fn test_discount_reduces_total() {
        let items = vec![item("P1", Money::from_major(500), 2), item("P2", Money::from_major(200), 1)];
        let t = compute_totals(&items, Money::from_major(150), &ShippingPolicy::standard()).unwrap();
        assert_eq!(t.total, Money::from_major(1050));
        assert!(t.is_consistent());
    }

    #[test]
    fn test_empty_items_price_to_fee_minus_discount() {
        let t = compute_totals(&[], Money::from_major(150), &ShippingPolicy::standard()).unwrap();
        assert_eq!(t.subtotal, Money::zero());
        assert_eq!(t.shipping, Money::from_major(99));
        assert_eq!(t.total, Money::from_major(-51));
        assert!(t.is_consistent());
    }

    #[test]
    fn test_subtotal_past_limit_is_rejected() {
        let items = vec![item("P1", Money::ceiling(), 1), item("P2", Money::from_major(1), 1)];
        assert_eq!(compute_totals(&items, Money::zero(), &ShippingPolicy::standard()), Err(ValueError::AmountOutOfRange));
    }
}
