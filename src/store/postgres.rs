//! Postgres store. Amounts are stored as integer paise; line items and the
//! shipping address are embedded JSONB documents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::aggregates::{Address, LineItem, Order, OrderSnapshot, PaymentMethod};
use crate::domain::coupon::{Coupon, CouponKind};
use crate::domain::lifecycle::{OrderStatus, PaymentStatus};
use crate::domain::value_objects::{Money, OrderNumber};
use crate::store::{CouponStore, OrderQuery, OrderStore, Page};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: i64,
    customer_id: String,
    customer_email: Option<String>,
    status: String,
    payment_status: String,
    payment_method: String,
    items: Json<Vec<LineItem>>,
    subtotal: i64,
    shipping: i64,
    discount: i64,
    total: i64,
    shipping_address: Json<Address>,
    coupon_code: Option<String>,
    gst_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StorefrontError;

    fn try_from(r: OrderRow) -> Result<Self> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| StorefrontError::Storage(format!("order {}: bad {field}: {e}", r.id));
        let order_number = u64::try_from(r.order_number).map_err(|e| corrupt("order_number", &e))?;
        let status: OrderStatus = r.status.parse().map_err(|e| corrupt("status", &e))?;
        let payment_status: PaymentStatus = r.payment_status.parse().map_err(|e| corrupt("payment_status", &e))?;
        let payment_method: PaymentMethod = r.payment_method.parse().map_err(|e| corrupt("payment_method", &e))?;
        Ok(Order::restore(OrderSnapshot {
            id: r.id,
            order_number: OrderNumber::new(order_number),
            customer_id: r.customer_id,
            customer_email: r.customer_email,
            status,
            payment_status,
            payment_method,
            items: r.items.0,
            subtotal: Money::from_minor(r.subtotal),
            shipping: Money::from_minor(r.shipping),
            discount: Money::from_minor(r.discount),
            total: Money::from_minor(r.total),
            shipping_address: r.shipping_address.0,
            coupon_code: r.coupon_code,
            gst_number: r.gst_number,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }
}

fn minor(m: Money) -> Result<i64> {
    m.to_minor().map_err(|e| StorefrontError::Storage(e.to_string()))
}

fn sequence(n: OrderNumber) -> Result<i64> {
    i64::try_from(n.sequence()).map_err(|e| StorefrontError::Storage(e.to_string()))
}

const ORDER_COLUMNS: &str = "id, order_number, customer_id, customer_email, status, payment_status, payment_method, \
    items, subtotal, shipping, discount, total, shipping_address, coupon_code, gst_number, notes, created_at, updated_at";

#[async_trait]
impl OrderStore for PgStore {
    async fn next_order_number(&self) -> Result<OrderNumber> {
        let n: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')").fetch_one(&self.pool).await?;
        u64::try_from(n).map(OrderNumber::new).map_err(|e| StorefrontError::Storage(e.to_string()))
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let s = order.snapshot();
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(s.id)
        .bind(sequence(s.order_number)?)
        .bind(&s.customer_id)
        .bind(&s.customer_email)
        .bind(s.status.as_str())
        .bind(s.payment_status.as_str())
        .bind(s.payment_method.as_str())
        .bind(Json(&s.items))
        .bind(minor(s.subtotal)?)
        .bind(minor(s.shipping)?)
        .bind(minor(s.discount)?)
        .bind(minor(s.total)?)
        .bind(Json(&s.shipping_address))
        .bind(&s.coupon_code)
        .bind(&s.gst_number)
        .bind(&s.notes)
        .bind(s.created_at)
        .bind(s.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn find_by_number(&self, number: OrderNumber) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"))
            .bind(sequence(number)?)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_orders(&self, q: &OrderQuery) -> Result<Page<Order>> {
        let filter = "($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR customer_id = $2)";
        let status = q.status.map(|s| s.as_str());
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter} ORDER BY created_at DESC, order_number DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(&q.customer_id)
        .bind(i64::from(q.per_page))
        .bind(q.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {filter}"))
            .bind(status)
            .bind(&q.customer_id)
            .fetch_one(&self.pool)
            .await?;
        let data = rows.into_iter().map(Order::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Page { data, total, page: q.page })
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let s = order.snapshot();
        let result = sqlx::query(
            "UPDATE orders SET status = $2, payment_status = $3, items = $4, subtotal = $5, shipping = $6, \
             discount = $7, total = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(s.id)
        .bind(s.status.as_str())
        .bind(s.payment_status.as_str())
        .bind(Json(&s.items))
        .bind(minor(s.subtotal)?)
        .bind(minor(s.shipping)?)
        .bind(minor(s.discount)?)
        .bind(minor(s.total)?)
        .bind(s.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 { return Err(StorefrontError::NotFound("Order")); }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    code: String,
    kind: String,
    value: i64,
    min_order: i64,
    max_discount: Option<i64>,
    active: bool,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StorefrontError;

    fn try_from(r: CouponRow) -> Result<Self> {
        let kind = match r.kind.as_str() {
            "fixed" => CouponKind::Fixed(Money::from_minor(r.value)),
            "percentage" => CouponKind::Percentage(
                u32::try_from(r.value).map_err(|e| StorefrontError::Storage(format!("coupon {}: {e}", r.code)))?,
            ),
            other => return Err(StorefrontError::Storage(format!("coupon {}: unknown kind {other}", r.code))),
        };
        Ok(Coupon {
            code: r.code,
            kind,
            min_order: Money::from_minor(r.min_order),
            max_discount: r.max_discount.map(Money::from_minor),
            active: r.active,
            expires_at: r.expires_at,
            created_at: r.created_at,
        })
    }
}

#[async_trait]
impl CouponStore for PgStore {
    async fn find_coupon(&self, code: &str) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .map(Coupon::try_from)
            .transpose()
    }

    async fn insert_coupon(&self, c: &Coupon) -> Result<()> {
        let (kind, value) = match c.kind {
            CouponKind::Fixed(amount) => ("fixed", minor(amount)?),
            CouponKind::Percentage(p) => ("percentage", i64::from(p)),
        };
        let max_discount = c.max_discount.map(minor).transpose()?;
        sqlx::query(
            "INSERT INTO coupons (code, kind, value, min_order, max_discount, active, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&c.code)
        .bind(kind)
        .bind(value)
        .bind(minor(c.min_order)?)
        .bind(max_discount)
        .bind(c.active)
        .bind(c.expires_at)
        .bind(c.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorefrontError::Validation(format!("coupon {} already exists", c.code))
            }
            other => other.into(),
        })?;
        Ok(())
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons ORDER BY code")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Coupon::try_from)
            .collect()
    }
}
