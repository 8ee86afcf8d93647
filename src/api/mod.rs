//! HTTP API.

pub mod auth;
mod error;

pub use error::ApiJson;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::api::auth::{Admin, Identity};
use crate::config::SiteSettings;
use crate::domain::aggregates::{Address, Cart, CartItem, NewOrder, Order, OrderError, OrderSnapshot, PaymentMethod};
use crate::domain::coupon::{normalize_code, Coupon, CouponError, CouponKind};
use crate::domain::lifecycle::{OrderStatus, PaymentStatus, TransitionPolicy};
use crate::domain::pricing::{compute_totals, OrderTotals, ShippingPolicy};
use crate::domain::value_objects::{Money, OrderNumber, Quantity, ValueError};
use crate::invoice::{render_print, render_view, GstBreakdown, Invoice};
use crate::publisher::Publisher;
use crate::store::{CouponStore, OrderQuery, OrderStore, Page};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub coupons: Arc<dyn CouponStore>,
    pub publisher: Publisher,
    pub shipping: ShippingPolicy,
    pub transitions: TransitionPolicy,
    pub site: Arc<SiteSettings>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-orders"})) }))
        .route("/api/v1/checkout/quote", post(quote))
        .route("/api/v1/checkout", post(checkout))
        .route("/api/v1/me/orders", get(my_orders))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/number/:order_number", get(get_order_by_number))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/invoice", get(get_invoice))
        .route("/api/v1/orders/:id/invoice/view", get(view_invoice))
        .route("/api/v1/orders/:id/invoice/print", get(print_invoice))
        .route("/api/v1/orders/:id/status", put(update_status))
        .route("/api/v1/orders/:id/payment-status", put(update_payment_status))
        .route("/api/v1/orders/:id/items/:product_id/increment", post(increment_item))
        .route("/api/v1/orders/:id/items/:product_id/decrement", post(decrement_item))
        .route("/api/v1/orders/:id/items/:product_id", delete(remove_item))
        .route("/api/v1/coupons", get(list_coupons).post(create_coupon))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: OrderSnapshot,
    /// Position on the five-step progress bar; absent for cancelled orders.
    pub progress_step: Option<usize>,
    pub is_final: bool,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self { order: order.snapshot(), progress_step: order.status().progress_step(), is_final: order.status().is_final() }
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub coupon_code: Option<String>,
    pub gst: GstBreakdown,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub product_image: Option<String>,
    pub quantity: Quantity,
    pub price: Money,
}

impl From<CartLine> for CartItem {
    fn from(l: CartLine) -> Self {
        CartItem {
            product_id: l.product_id,
            product_name: l.product_name,
            product_image: l.product_image,
            quantity: l.quantity,
            unit_price: l.price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    #[validate]
    pub shipping_address: Address,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    #[validate(length(equal = 15, message = "GST number must be 15 characters"))]
    pub gst_number: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "notes are too long"))]
    pub notes: Option<String>,
}

async fn resolve_discount(s: &AppState, code: Option<&str>, subtotal: Money) -> Result<(Money, Option<String>)> {
    let Some(code) = code.map(normalize_code).filter(|c| !c.is_empty()) else {
        return Ok((Money::zero(), None));
    };
    let coupon = s.coupons.find_coupon(&code).await?.ok_or_else(|| CouponError::Unknown(code.clone()))?;
    let discount = coupon.discount_for(subtotal, Utc::now())?;
    Ok((discount, Some(code)))
}

async fn quote(State(s): State<AppState>, _user: Identity, ApiJson(r): ApiJson<QuoteRequest>) -> Result<Json<QuoteResponse>> {
    let items = r.items.into_iter().map(CartItem::from).collect::<Cart>().into_line_items()?;
    let subtotal = compute_totals(&items, Money::zero(), &s.shipping)?.subtotal;
    let (discount, coupon_code) = resolve_discount(&s, r.coupon_code.as_deref(), subtotal).await?;
    let totals = compute_totals(&items, discount, &s.shipping)?;
    Ok(Json(QuoteResponse { totals, coupon_code, gst: GstBreakdown::for_subtotal(totals.subtotal) }))
}

async fn checkout(State(s): State<AppState>, user: Identity, ApiJson(r): ApiJson<CheckoutRequest>) -> Result<(StatusCode, Json<OrderView>)> {
    r.validate()?;
    let payment_method: PaymentMethod = r.payment_method.as_deref().unwrap_or("cod").parse()?;
    let items = r.items.into_iter().map(CartItem::from).collect::<Cart>().into_line_items()?;
    if items.is_empty() { return Err(OrderError::NoItems.into()); }

    let subtotal = compute_totals(&items, Money::zero(), &s.shipping)?.subtotal;
    let (discount, coupon_code) = resolve_discount(&s, r.coupon_code.as_deref(), subtotal).await?;
    let number = s.orders.next_order_number().await?;
    let new = NewOrder {
        customer_id: user.uid,
        customer_email: user.email,
        items,
        shipping_address: r.shipping_address,
        payment_method,
        discount,
        coupon_code,
        gst_number: r.gst_number.map(|g| g.trim().to_uppercase()),
        notes: r.notes,
    };
    let mut order = Order::place(Uuid::now_v7(), number, new, &s.shipping)?;
    s.orders.insert_order(&order).await?;
    tracing::info!(order_number = %number, total = %order.totals().total, "order placed");
    s.publisher.publish(order.take_events()).await;
    Ok((StatusCode::CREATED, Json(OrderView::from(&order))))
}

// =============================================================================
// Order reads
// =============================================================================

async fn load(s: &AppState, id: Uuid) -> Result<Order> {
    s.orders.get_order(id).await?.ok_or(StorefrontError::NotFound("Order"))
}

/// Orders belonging to someone else read as missing.
async fn load_visible(s: &AppState, user: &Identity, id: Uuid) -> Result<Order> {
    let order = load(s, id).await?;
    if !user.can_view(&order) { return Err(StorefrontError::NotFound("Order")); }
    Ok(order)
}

fn parse_status_filter(status: Option<&str>) -> Result<Option<OrderStatus>> {
    status.map(str::parse::<OrderStatus>).transpose().map_err(|e| StorefrontError::Validation(e.to_string()))
}

async fn my_orders(State(s): State<AppState>, user: Identity, Query(p): Query<ListParams>) -> Result<Json<Page<OrderView>>> {
    let mut query = OrderQuery::paged(p.page, p.per_page);
    query.status = parse_status_filter(p.status.as_deref())?;
    query.customer_id = Some(user.uid);
    let page = s.orders.list_orders(&query).await?;
    Ok(Json(page.map(|o| OrderView::from(&o))))
}

async fn get_order(State(s): State<AppState>, user: Identity, Path(id): Path<Uuid>) -> Result<Json<OrderView>> {
    let order = load_visible(&s, &user, id).await?;
    Ok(Json(OrderView::from(&order)))
}

async fn list_orders(State(s): State<AppState>, _admin: Admin, Query(p): Query<ListParams>) -> Result<Json<Page<OrderView>>> {
    let mut query = OrderQuery::paged(p.page, p.per_page);
    query.status = parse_status_filter(p.status.as_deref())?;
    let page = s.orders.list_orders(&query).await?;
    Ok(Json(page.map(|o| OrderView::from(&o))))
}

async fn get_order_by_number(State(s): State<AppState>, _admin: Admin, Path(number): Path<String>) -> Result<Json<OrderView>> {
    let number: OrderNumber = number.parse().map_err(|e: ValueError| StorefrontError::Validation(e.to_string()))?;
    let order = s.orders.find_by_number(number).await?.ok_or(StorefrontError::NotFound("Order"))?;
    Ok(Json(OrderView::from(&order)))
}

// =============================================================================
// Invoices
// =============================================================================

async fn get_invoice(State(s): State<AppState>, user: Identity, Path(id): Path<Uuid>) -> Result<Json<Invoice>> {
    let order = load_visible(&s, &user, id).await?;
    Ok(Json(Invoice::for_order(&order, &s.site.business)))
}

async fn view_invoice(State(s): State<AppState>, user: Identity, Path(id): Path<Uuid>) -> Result<Html<String>> {
    let order = load_visible(&s, &user, id).await?;
    Ok(Html(render_view(&Invoice::for_order(&order, &s.site.business), &s.site)))
}

async fn print_invoice(State(s): State<AppState>, user: Identity, Path(id): Path<Uuid>) -> Result<Html<String>> {
    let order = load_visible(&s, &user, id).await?;
    Ok(Html(render_print(&Invoice::for_order(&order, &s.site.business), &s.site)))
}

// =============================================================================
// Admin updates
// =============================================================================

/// Persists the working copy, then publishes its events. A failed write
/// leaves the stored order as it was.
async fn save(s: &AppState, order: &mut Order) -> Result<()> {
    s.orders.update_order(order).await?;
    s.publisher.publish(order.take_events()).await;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusUpdate {
    pub payment_status: PaymentStatus,
}

async fn update_status(
    State(s): State<AppState>,
    Admin(admin): Admin,
    Path(id): Path<Uuid>,
    ApiJson(r): ApiJson<StatusUpdate>,
) -> Result<Json<OrderView>> {
    let mut order = load(&s, id).await?;
    let from = order.status();
    if order.set_status(r.status, s.transitions)? {
        save(&s, &mut order).await?;
        tracing::info!(order_number = %order.order_number(), %from, to = %r.status, admin = %admin.uid, "order status updated");
    }
    Ok(Json(OrderView::from(&order)))
}

async fn update_payment_status(
    State(s): State<AppState>,
    Admin(admin): Admin,
    Path(id): Path<Uuid>,
    ApiJson(r): ApiJson<PaymentStatusUpdate>,
) -> Result<Json<OrderView>> {
    let mut order = load(&s, id).await?;
    if order.set_payment_status(r.payment_status) {
        save(&s, &mut order).await?;
        tracing::info!(order_number = %order.order_number(), to = %r.payment_status, admin = %admin.uid, "payment status updated");
    }
    Ok(Json(OrderView::from(&order)))
}

async fn increment_item(
    State(s): State<AppState>,
    _admin: Admin,
    Path((id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<OrderView>> {
    let mut order = load(&s, id).await?;
    order.increment_item(&product_id, &s.shipping)?;
    save(&s, &mut order).await?;
    Ok(Json(OrderView::from(&order)))
}

async fn decrement_item(
    State(s): State<AppState>,
    _admin: Admin,
    Path((id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<OrderView>> {
    let mut order = load(&s, id).await?;
    if order.decrement_item(&product_id, &s.shipping)? {
        save(&s, &mut order).await?;
    }
    Ok(Json(OrderView::from(&order)))
}

async fn remove_item(
    State(s): State<AppState>,
    _admin: Admin,
    Path((id, product_id)): Path<(Uuid, String)>,
) -> Result<Json<OrderView>> {
    let mut order = load(&s, id).await?;
    order.remove_item(&product_id, &s.shipping)?;
    save(&s, &mut order).await?;
    if order.items().is_empty() {
        tracing::warn!(order_number = %order.order_number(), total = %order.totals().total, "order has no items left");
    }
    Ok(Json(OrderView::from(&order)))
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 32, message = "code must be 1-32 characters"))]
    pub code: String,
    pub kind: CouponKind,
    #[serde(default)]
    pub min_order: Option<Money>,
    #[serde(default)]
    pub max_discount: Option<Money>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

async fn list_coupons(State(s): State<AppState>, _admin: Admin) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(s.coupons.list_coupons().await?))
}

async fn create_coupon(
    State(s): State<AppState>,
    _admin: Admin,
    ApiJson(r): ApiJson<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>)> {
    r.validate()?;
    let mut coupon = Coupon::new(&r.code, r.kind, r.min_order.unwrap_or_default())?;
    if let Some(cap) = r.max_discount {
        coupon = coupon.with_max_discount(cap)?;
    }
    if let Some(at) = r.expires_at {
        coupon = coupon.expiring_at(at);
    }
    s.coupons.insert_coupon(&coupon).await?;
    tracing::info!(code = %coupon.code, "coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::BusinessProfile;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<MemoryStore>) { app_with(TransitionPolicy::AdminOverride) }

    fn app_with(transitions: TransitionPolicy) -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            orders: store.clone(),
            coupons: store.clone(),
            publisher: Publisher::default(),
            shipping: ShippingPolicy::standard(),
            transitions,
            site: Arc::new(SiteSettings {
                store_name: "Kirana".into(),
                brand_color: "#0a7d3b".into(),
                business: BusinessProfile {
                    legal_name: "Kirana Traders Pvt Ltd".into(),
                    address: "4 Market Street, Pune".into(),
                    gst_number: "27AAACK1234F1Z5".into(),
                    phone: "+91 20 5555 0100".into(),
                    email: None,
                },
            }),
        };
        (router(state), store)
    }

    enum Caller<'a> {
        Anonymous,
        Customer(&'a str),
        Admin,
    }

    async fn send(app: &Router, method: &str, uri: &str, caller: Caller<'_>, body: Option<Value>) -> (StatusCode, String) {
        let mut req = Request::builder().method(method).uri(uri);
        match caller {
            Caller::Anonymous => {}
            Caller::Customer(uid) => req = req.header("x-user-id", uid).header("x-user-email", format!("{uid}@example.com")),
            Caller::Admin => req = req.header("x-user-id", "admin-1").header("x-user-admin", "true"),
        }
        let req = match body {
            Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn send_json(app: &Router, method: &str, uri: &str, caller: Caller<'_>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, text) = send(app, method, uri, caller, body).await;
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    fn address() -> Value {
        json!({
            "full_name": "Asha Rao", "phone": "9876543210", "address": "12 MG Road",
            "city": "Bengaluru", "state": "Karnataka", "postal_code": "560001", "country": "India"
        })
    }

    fn cart() -> Value {
        json!([
            {"product_id": "P1", "product_name": "Kurta", "quantity": 2, "price": 500},
            {"product_id": "P2", "product_name": "Dupatta", "quantity": 1, "price": "200.00"}
        ])
    }

    async fn place(app: &Router, uid: &str, items: Value, coupon: Option<&str>) -> Value {
        let (status, body) = send_json(
            app, "POST", "/api/v1/checkout", Caller::Customer(uid),
            Some(json!({"items": items, "shipping_address": address(), "payment_method": "cod", "coupon_code": coupon})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn test_checkout_prices_order_with_coupon() {
        let (app, _) = app();
        let (status, _) = send_json(
            &app, "POST", "/api/v1/coupons", Caller::Admin,
            Some(json!({"code": "flat150", "kind": {"type": "fixed", "value": 150}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let order = place(&app, "uid-1", cart(), Some("FLAT150")).await;
        assert_eq!(order["order_number"], "ORD-100001");
        assert_eq!(order["status"], "pending");
        assert_eq!(order["payment_status"], "pending");
        assert_eq!(order["payment_method"], "cod");
        assert_eq!(order["coupon_code"], "FLAT150");
        assert_eq!(order["subtotal"], "1200.00");
        assert_eq!(order["shipping"], "0.00");
        assert_eq!(order["discount"], "150.00");
        assert_eq!(order["total"], "1050.00");
        assert_eq!(order["progress_step"], 0);
        assert_eq!(order["items"][0]["total"], "1000.00");
    }

    #[tokio::test]
    async fn test_checkout_rejects_online_payment() {
        let (app, _) = app();
        let (status, body) = send_json(
            &app, "POST", "/api/v1/checkout", Caller::Customer("uid-1"),
            Some(json!({"items": cart(), "shipping_address": address(), "payment_method": "card"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("coming soon"));
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_and_anonymous_callers() {
        let (app, _) = app();
        let req = json!({"items": [], "shipping_address": address()});
        let (status, _) = send_json(&app, "POST", "/api/v1/checkout", Caller::Customer("uid-1"), Some(req.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send_json(&app, "POST", "/api/v1/checkout", Caller::Anonymous, Some(req)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_checkout_validates_address() {
        let (app, _) = app();
        let mut addr = address();
        addr["full_name"] = json!("");
        let (status, _) = send_json(
            &app, "POST", "/api/v1/checkout", Caller::Customer("uid-1"),
            Some(json!({"items": cart(), "shipping_address": addr})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quote_small_order() {
        let (app, _) = app();
        let (status, body) = send_json(
            &app, "POST", "/api/v1/checkout/quote", Caller::Customer("uid-1"),
            Some(json!({"items": [{"product_id": "P9", "product_name": "Soap", "quantity": 1, "price": 100}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subtotal"], "100.00");
        assert_eq!(body["shipping"], "99.00");
        assert_eq!(body["total"], "199.00");
        assert_eq!(body["gst"]["cgst"], "9.00");
    }

    #[tokio::test]
    async fn test_oversized_amounts_are_rejected() {
        let (app, _) = app();
        let huge = json!({"items": [{"product_id": "P1", "product_name": "Gold", "quantity": 4_000_000_000u32, "price": "100000000000000000000"}]});
        let (status, body) = send_json(&app, "POST", "/api/v1/checkout/quote", Caller::Customer("uid-1"), Some(huge)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "amount is out of range");

        let (status, _) = send_json(
            &app, "POST", "/api/v1/checkout", Caller::Customer("uid-1"),
            Some(json!({
                "items": [{"product_id": "P1", "product_name": "Gold", "quantity": 2, "price": "10000000000.00"}],
                "shipping_address": address(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_shape() {
        let (app, _) = app();
        let (status, body) = send_json(
            &app, "POST", "/api/v1/checkout/quote", Caller::Customer("uid-1"),
            Some(json!({"items": [{"product_id": "P1", "product_name": "Soap", "quantity": 0, "price": 10}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("quantity must be at least 1"), "{body}");
    }

    #[tokio::test]
    async fn test_coupon_cap_must_be_positive() {
        let (app, _) = app();
        let (status, body) = send_json(
            &app, "POST", "/api/v1/coupons", Caller::Admin,
            Some(json!({"code": "NEG", "kind": {"type": "percentage", "value": 10}, "max_discount": -500})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "coupon value must be positive");

        let (status, _) = send_json(
            &app, "POST", "/api/v1/coupons", Caller::Admin,
            Some(json!({"code": "TEN", "kind": {"type": "percentage", "value": 10}, "max_discount": 50})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, quote) = send_json(
            &app, "POST", "/api/v1/checkout/quote", Caller::Customer("uid-1"),
            Some(json!({"items": cart(), "coupon_code": "ten"})),
        )
        .await;
        assert_eq!(quote["discount"], "50.00");
        assert_eq!(quote["total"], "1150.00");
    }

    #[tokio::test]
    async fn test_forward_only_policy_rejects_backwards_move() {
        let (app, _) = app_with(TransitionPolicy::ForwardOnly);
        let id = place(&app, "uid-1", cart(), None).await["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/orders/{id}/status");
        let (code, _) = send_json(&app, "PUT", &uri, Caller::Admin, Some(json!({"status": "shipped"}))).await;
        assert_eq!(code, StatusCode::OK);
        let (code, body) = send_json(&app, "PUT", &uri, Caller::Admin, Some(json!({"status": "confirmed"}))).await;
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(body["error"], "cannot move order from shipped to confirmed");
        let (_, body) = send_json(&app, "GET", &format!("/api/v1/orders/{id}"), Caller::Admin, None).await;
        assert_eq!(body["status"], "shipped");
    }

    #[tokio::test]
    async fn test_unknown_coupon_rejected() {
        let (app, _) = app();
        let (status, body) = send_json(
            &app, "POST", "/api/v1/checkout/quote", Caller::Customer("uid-1"),
            Some(json!({"items": cart(), "coupon_code": "NOPE"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown coupon NOPE");
    }

    #[tokio::test]
    async fn test_admin_may_set_any_status() {
        let (app, _) = app();
        let id = place(&app, "uid-1", cart(), None).await["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/orders/{id}/status");
        for status in ["delivered", "confirmed", "cancelled", "pending", "shipped"] {
            let (code, body) = send_json(&app, "PUT", &uri, Caller::Admin, Some(json!({"status": status}))).await;
            assert_eq!(code, StatusCode::OK);
            assert_eq!(body["status"], status);
        }
        let (_, body) = send_json(&app, "PUT", &uri, Caller::Admin, Some(json!({"status": "cancelled"}))).await;
        assert_eq!(body["progress_step"], Value::Null);
        assert_eq!(body["is_final"], true);

        let (code, _) = send_json(&app, "PUT", &uri, Caller::Customer("uid-1"), Some(json!({"status": "delivered"}))).await;
        assert_eq!(code, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_failed_status_write_is_not_applied() {
        let (app, store) = app();
        let id = place(&app, "uid-1", cart(), None).await["id"].as_str().unwrap().to_string();
        store.fail_writes(true);
        let (code, _) = send_json(&app, "PUT", &format!("/api/v1/orders/{id}/status"), Caller::Admin, Some(json!({"status": "shipped"}))).await;
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        store.fail_writes(false);
        let (_, body) = send_json(&app, "GET", &format!("/api/v1/orders/{id}"), Caller::Admin, None).await;
        assert_eq!(body["status"], "pending");
    }

    #[tokio::test]
    async fn test_payment_status_updates_independently() {
        let (app, _) = app();
        let id = place(&app, "uid-1", cart(), None).await["id"].as_str().unwrap().to_string();
        let (_, body) = send_json(&app, "PUT", &format!("/api/v1/orders/{id}/payment-status"), Caller::Admin, Some(json!({"payment_status": "paid"}))).await;
        assert_eq!(body["payment_status"], "paid");
        assert_eq!(body["status"], "pending");
    }

    #[tokio::test]
    async fn test_item_edits_recompute_totals() {
        let (app, _) = app();
        let id = place(&app, "uid-1", cart(), None).await["id"].as_str().unwrap().to_string();

        let (_, body) = send_json(&app, "POST", &format!("/api/v1/orders/{id}/items/P1/decrement"), Caller::Admin, None).await;
        assert_eq!(body["subtotal"], "700.00");
        assert_eq!(body["shipping"], "99.00");
        assert_eq!(body["total"], "799.00");

        let (_, body) = send_json(&app, "POST", &format!("/api/v1/orders/{id}/items/P1/decrement"), Caller::Admin, None).await;
        assert_eq!(body["items"][0]["quantity"], 1);
        assert_eq!(body["subtotal"], "700.00");

        let (_, body) = send_json(&app, "POST", &format!("/api/v1/orders/{id}/items/P2/increment"), Caller::Admin, None).await;
        assert_eq!(body["subtotal"], "900.00");

        send_json(&app, "DELETE", &format!("/api/v1/orders/{id}/items/P1"), Caller::Admin, None).await;
        let (code, body) = send_json(&app, "DELETE", &format!("/api/v1/orders/{id}/items/P2"), Caller::Admin, None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["subtotal"], "0.00");
        assert_eq!(body["shipping"], "99.00");
        assert_eq!(body["total"], "99.00");

        let (code, _) = send_json(&app, "DELETE", &format!("/api/v1/orders/{id}/items/P2"), Caller::Admin, None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invoice_visible_to_owner_only() {
        let (app, _) = app();
        let id = place(&app, "uid-1", cart(), None).await["id"].as_str().unwrap().to_string();

        let (code, html) = send(&app, "GET", &format!("/api/v1/orders/{id}/invoice/print"), Caller::Customer("uid-1"), None).await;
        assert_eq!(code, StatusCode::OK);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("₹108.00"));
        assert!(html.contains("27AAACK1234F1Z5"));

        let (_, invoice) = send_json(&app, "GET", &format!("/api/v1/orders/{id}/invoice"), Caller::Customer("uid-1"), None).await;
        assert_eq!(invoice["gst"]["sgst"], "108.00");
        assert_eq!(invoice["grand_total"], "1200.00");

        let (code, _) = send(&app, "GET", &format!("/api/v1/orders/{id}/invoice/view"), Caller::Customer("uid-2"), None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        let (code, _) = send(&app, "GET", &format!("/api/v1/orders/{id}/invoice/view"), Caller::Admin, None).await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_order_listings() {
        let (app, _) = app();
        place(&app, "uid-1", cart(), None).await;
        place(&app, "uid-1", cart(), None).await;
        let other = place(&app, "uid-2", cart(), None).await;

        let (_, mine) = send_json(&app, "GET", "/api/v1/me/orders", Caller::Customer("uid-1"), None).await;
        assert_eq!(mine["total"], 2);
        let (_, mine) = send_json(&app, "GET", "/api/v1/me/orders?status=shipped", Caller::Customer("uid-1"), None).await;
        assert_eq!(mine["total"], 0);
        let (code, _) = send_json(&app, "GET", "/api/v1/me/orders?status=lost", Caller::Customer("uid-1"), None).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);

        let id = other["id"].as_str().unwrap();
        send_json(&app, "PUT", &format!("/api/v1/orders/{id}/status"), Caller::Admin, Some(json!({"status": "shipped"}))).await;
        let (_, shipped) = send_json(&app, "GET", "/api/v1/orders?status=shipped", Caller::Admin, None).await;
        assert_eq!(shipped["total"], 1);
        assert_eq!(shipped["data"][0]["id"], other["id"]);

        let (code, _) = send_json(&app, "GET", "/api/v1/orders?status=lost", Caller::Admin, None).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        let (code, _) = send_json(&app, "GET", "/api/v1/orders", Caller::Customer("uid-1"), None).await;
        assert_eq!(code, StatusCode::FORBIDDEN);

        let (code, found) = send_json(&app, "GET", &format!("/api/v1/orders/number/{}", other["order_number"].as_str().unwrap()), Caller::Admin, None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(found["id"], other["id"]);
    }
}
