//! Checkout Cart
//!
//! The cart a shopper submits at checkout. Lines for the same product are
//! merged before they become order line items.

use crate::domain::aggregates::order::{LineItem, OrderError};
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: String,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Repeated products add to the existing line and keep its price.
    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    pub fn into_line_items(self) -> Result<Vec<LineItem>, OrderError> {
        self.items
            .into_iter()
            .map(|i| LineItem::new(i.product_id, i.product_name, i.product_image, i.quantity, i.unit_price))
            .collect()
    }
}

impl FromIterator<CartItem> for Cart {
    fn from_iter<T: IntoIterator<Item = CartItem>>(iter: T) -> Self {
        let mut cart = Cart::new();
        for item in iter { cart.add_item(item); }
        cart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(qty: u32, price: i64) -> CartItem {
        CartItem {
            product_id: "P1".into(), product_name: "Widget".into(), product_image: None,
            quantity: Quantity::new(qty).unwrap(), unit_price: Money::from_major(price),
        }
    }

    #[test]
    fn test_cart_merges_lines() {
        let mut cart = Cart::new();
        cart.add_item(widget(2, 10));
        cart.add_item(widget(1, 12));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity.get(), 3); // Merged
        assert_eq!(cart.items()[0].unit_price, Money::from_major(10));
    }

    #[test]
    fn test_into_line_items_snapshots_totals() {
        let cart: Cart = vec![widget(2, 10)].into_iter().collect();
        let items = cart.into_line_items().unwrap();
        assert_eq!(items[0].total, Money::from_major(20));
    }

    #[test]
    fn test_unnamed_product_rejected() {
        let mut bad = widget(1, 10);
        bad.product_name = String::new();
        let cart: Cart = vec![bad].into_iter().collect();
        assert!(matches!(cart.into_line_items(), Err(OrderError::InvalidItem(_))));
    }
}
