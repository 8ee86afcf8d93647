//! Order and coupon persistence.
//!
//! Writes are last-write-wins; orders carry no version token.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::domain::coupon::Coupon;
use crate::domain::lifecycle::OrderStatus;
use crate::domain::value_objects::OrderNumber;
use crate::Result;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl OrderQuery {
    pub fn paged(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            status: None,
            customer_id: None,
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.per_page) }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.status() == s)
            && self.customer_id.as_deref().map_or(true, |c| order.customer_id() == c)
    }
}

impl Default for OrderQuery {
    fn default() -> Self { Self::paged(None, None) }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { data: self.data.into_iter().map(f).collect(), total: self.total, page: self.page }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Unique, monotonically increasing order number.
    async fn next_order_number(&self) -> Result<OrderNumber>;
    async fn insert_order(&self, order: &Order) -> Result<()>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_by_number(&self, number: OrderNumber) -> Result<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>>;
    async fn update_order(&self, order: &Order) -> Result<()>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    /// `code` is already normalised.
    async fn find_coupon(&self, code: &str) -> Result<Option<Coupon>>;
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()>;
    async fn list_coupons(&self) -> Result<Vec<Coupon>>;
}
