//! Domain events
use serde::Serialize;
use uuid::Uuid;

use crate::domain::lifecycle::{OrderStatus, PaymentStatus};
use crate::domain::value_objects::{Money, OrderNumber};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: OrderNumber, customer_id: String, total: Money },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    PaymentStatusChanged { order_id: Uuid, from: PaymentStatus, to: PaymentStatus },
    ItemsEdited { order_id: Uuid, subtotal: Money, total: Money },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "orders.placed",
            Self::StatusChanged { .. } => "orders.status_changed",
            Self::PaymentStatusChanged { .. } => "orders.payment_status_changed",
            Self::ItemsEdited { .. } => "orders.items_edited",
        }
    }
}
