//! In-process store for local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderSnapshot};
use crate::domain::coupon::Coupon;
use crate::domain::value_objects::OrderNumber;
use crate::store::{CouponStore, OrderQuery, OrderStore, Page};
use crate::{Result, StorefrontError};

const FIRST_ORDER_NUMBER: u64 = 100_001;

pub struct MemoryStore {
    orders: RwLock<HashMap<Uuid, OrderSnapshot>>,
    coupons: RwLock<HashMap<String, Coupon>>,
    sequence: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            coupons: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(FIRST_ORDER_NUMBER),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every write fail with a storage error.
    #[cfg(test)]
    pub fn fail_writes(&self, fail: bool) { self.fail_writes.store(fail, Ordering::SeqCst); }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorefrontError::Storage("store unavailable".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn next_order_number(&self) -> Result<OrderNumber> {
        Ok(OrderNumber::new(self.sequence.fetch_add(1, Ordering::SeqCst)))
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.check_writable()?;
        let mut orders = self.orders.write().await;
        if orders.values().any(|o| o.order_number == order.order_number()) {
            return Err(StorefrontError::Storage(format!("duplicate order number {}", order.order_number())));
        }
        orders.insert(order.id(), order.snapshot());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned().map(Order::restore))
    }

    async fn find_by_number(&self, number: OrderNumber) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|o| o.order_number == number).cloned().map(Order::restore))
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders.values().cloned().map(Order::restore).filter(|o| query.matches(o)).collect();
        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.order_number().cmp(&a.order_number())));
        let total = matching.len() as i64;
        let data = matching.into_iter().skip(query.offset() as usize).take(query.per_page as usize).collect();
        Ok(Page { data, total, page: query.page })
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        self.check_writable()?;
        let mut orders = self.orders.write().await;
        let slot = orders.get_mut(&order.id()).ok_or(StorefrontError::NotFound("Order"))?;
        *slot = order.snapshot();
        Ok(())
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn find_coupon(&self, code: &str) -> Result<Option<Coupon>> {
        Ok(self.coupons.read().await.get(code).cloned())
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()> {
        self.check_writable()?;
        let mut coupons = self.coupons.write().await;
        if coupons.contains_key(&coupon.code) {
            return Err(StorefrontError::Validation(format!("coupon {} already exists", coupon.code)));
        }
        coupons.insert(coupon.code.clone(), coupon.clone());
        Ok(())
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let mut coupons: Vec<Coupon> = self.coupons.read().await.values().cloned().collect();
        coupons.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(coupons)
    }
}
