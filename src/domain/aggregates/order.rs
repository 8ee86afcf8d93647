//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::OrderEvent;
use crate::domain::lifecycle::{OrderStatus, PaymentStatus, TransitionPolicy};
use crate::domain::pricing::{compute_totals, OrderTotals, ShippingPolicy};
use crate::domain::value_objects::{Money, OrderNumber, Quantity, ValueError};

/// Product snapshot captured at order time. Later catalog price changes do
/// not reach existing orders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: Quantity,
    pub price: Money,
    pub total: Money,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        product_image: Option<String>,
        quantity: Quantity,
        price: Money,
    ) -> Result<Self, OrderError> {
        let product_id = product_id.into();
        let product_name = product_name.into().trim().to_string();
        if product_id.trim().is_empty() { return Err(OrderError::InvalidItem("product id is required".into())); }
        if product_name.is_empty() { return Err(OrderError::InvalidItem(format!("item {product_id} has no name"))); }
        if price.is_negative() { return Err(OrderError::InvalidItem(format!("item {product_id} has a negative price"))); }
        let total = price.checked_multiply(quantity)?;
        Ok(Self { product_id, product_name, product_image, quantity, price, total })
    }

    pub fn line_total(&self) -> Money { self.total }

    fn set_quantity(&mut self, quantity: Quantity) -> Result<(), OrderError> {
        self.total = self.price.checked_multiply(quantity)?;
        self.quantity = quantity;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(length(min = 6, message = "phone number is required"))]
    pub phone: String,
    #[serde(alias = "address", alias = "street")]
    #[validate(length(min = 1, message = "address is required"))]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 3, message = "postal code is required"))]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String { "India".to_string() }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash on delivery, the only method the storefront accepts.
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str { "cod" }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" | "cash_on_delivery" => Ok(Self::CashOnDelivery),
            other => Err(OrderError::PaymentMethodUnavailable(other.to_string())),
        }
    }
}

/// Everything checkout knows about an order before it is numbered.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub items: Vec<LineItem>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub discount: Money,
    pub coupon_code: Option<String>,
    pub gst_number: Option<String>,
    pub notes: Option<String>,
}

/// Persisted and wire shape of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: Uuid,
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
    pub shipping_address: Address,
    pub coupon_code: Option<String>,
    pub gst_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    customer_id: String,
    customer_email: Option<String>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    items: Vec<LineItem>,
    totals: OrderTotals,
    shipping_address: Address,
    coupon_code: Option<String>,
    gst_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<OrderEvent>,
}

impl Order {
    pub fn place(id: Uuid, order_number: OrderNumber, new: NewOrder, shipping: &ShippingPolicy) -> Result<Self, OrderError> {
        if new.items.is_empty() { return Err(OrderError::NoItems); }
        let totals = compute_totals(&new.items, new.discount, shipping)?;
        let now = Utc::now();
        let mut order = Self {
            id, order_number, customer_id: new.customer_id, customer_email: new.customer_email,
            status: OrderStatus::Pending, payment_status: PaymentStatus::Pending, payment_method: new.payment_method,
            items: new.items, totals, shipping_address: new.shipping_address,
            coupon_code: new.coupon_code, gst_number: new.gst_number, notes: new.notes,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(OrderEvent::Placed {
            order_id: id, order_number, customer_id: order.customer_id.clone(), total: order.totals.total,
        });
        Ok(order)
    }

    /// Rebuilds an order from storage. Persisted totals are taken as-is.
    pub fn restore(s: OrderSnapshot) -> Self {
        Self {
            id: s.id, order_number: s.order_number, customer_id: s.customer_id, customer_email: s.customer_email,
            status: s.status, payment_status: s.payment_status, payment_method: s.payment_method, items: s.items,
            totals: OrderTotals { subtotal: s.subtotal, shipping: s.shipping, discount: s.discount, total: s.total },
            shipping_address: s.shipping_address, coupon_code: s.coupon_code, gst_number: s.gst_number,
            notes: s.notes, created_at: s.created_at, updated_at: s.updated_at, events: vec![],
        }
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            id: self.id,
            order_number: self.order_number,
            customer_id: self.customer_id.clone(),
            customer_email: self.customer_email.clone(),
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            items: self.items.clone(),
            subtotal: self.totals.subtotal,
            shipping: self.totals.shipping,
            discount: self.totals.discount,
            total: self.totals.total,
            shipping_address: self.shipping_address.clone(),
            coupon_code: self.coupon_code.clone(),
            gst_number: self.gst_number.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> OrderNumber { self.order_number }
    pub fn customer_id(&self) -> &str { &self.customer_id }
    pub fn customer_email(&self) -> Option<&str> { self.customer_email.as_deref() }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn totals(&self) -> &OrderTotals { &self.totals }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn coupon_code(&self) -> Option<&str> { self.coupon_code.as_deref() }
    pub fn gst_number(&self) -> Option<&str> { self.gst_number.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Returns `false` when the order already had `to`.
    pub fn set_status(&mut self, to: OrderStatus, policy: TransitionPolicy) -> Result<bool, OrderError> {
        let from = self.status;
        if !policy.permits(from, to) { return Err(OrderError::TransitionNotPermitted { from, to }); }
        if from == to { return Ok(false); }
        self.status = to;
        self.touch();
        self.raise_event(OrderEvent::StatusChanged { order_id: self.id, from, to });
        Ok(true)
    }

    pub fn set_payment_status(&mut self, to: PaymentStatus) -> bool {
        let from = self.payment_status;
        if from == to { return false; }
        self.payment_status = to;
        self.touch();
        self.raise_event(OrderEvent::PaymentStatusChanged { order_id: self.id, from, to });
        true
    }

    pub fn increment_item(&mut self, product_id: &str, shipping: &ShippingPolicy) -> Result<(), OrderError> {
        let item = self.item_mut(product_id)?;
        let next = item.quantity.increment();
        item.set_quantity(next)?;
        self.recalculate(shipping)
    }

    /// Lowering a quantity of 1 is ignored and returns `false`.
    pub fn decrement_item(&mut self, product_id: &str, shipping: &ShippingPolicy) -> Result<bool, OrderError> {
        let item = self.item_mut(product_id)?;
        let Some(next) = item.quantity.decrement() else { return Ok(false) };
        item.set_quantity(next)?;
        self.recalculate(shipping)?;
        Ok(true)
    }

    /// Removing the last item leaves an empty, still priced order.
    pub fn remove_item(&mut self, product_id: &str, shipping: &ShippingPolicy) -> Result<(), OrderError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(OrderError::ItemNotFound(product_id.to_string())); }
        self.recalculate(shipping)
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }

    fn item_mut(&mut self, product_id: &str) -> Result<&mut LineItem, OrderError> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| OrderError::ItemNotFound(product_id.to_string()))
    }

    // Discount stays as placed: it is a flat amount, not re-derived from the new subtotal.
    fn recalculate(&mut self, shipping: &ShippingPolicy) -> Result<(), OrderError> {
        self.totals = compute_totals(&self.items, self.totals.discount, shipping)?;
        self.touch();
        self.raise_event(OrderEvent::ItemsEdited { order_id: self.id, subtotal: self.totals.subtotal, total: self.totals.total });
        Ok(())
    }

    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("invalid item: {0}")]
    InvalidItem(String),
    #[error("item {0} is not on this order")]
    ItemNotFound(String),
    #[error("cannot move order from {from} to {to}")]
    TransitionNotPermitted { from: OrderStatus, to: OrderStatus },
    #[error("payment method {0} is not available. Online payment options coming soon")]
    PaymentMethodUnavailable(String),
    #[error(transparent)]
    Amount(#[from] ValueError),
}
