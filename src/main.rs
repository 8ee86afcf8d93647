//! Storefront Orders - order pricing, tracking and invoicing service

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_orders::api::{router, AppState};
use storefront_orders::config::Config;
use storefront_orders::domain::pricing::ShippingPolicy;
use storefront_orders::publisher::Publisher;
use storefront_orders::store::{CouponStore, MemoryStore, OrderStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    let (orders, coupons): (Arc<dyn OrderStore>, Arc<dyn CouponStore>) = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.db_max_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("using postgres order store");
            let store = Arc::new(PgStore::new(db));
            (store.clone() as Arc<dyn OrderStore>, store as Arc<dyn CouponStore>)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory and lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn OrderStore>, store as Arc<dyn CouponStore>)
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, order events will not be published");
                None
            }
        },
        None => None,
    };

    let state = AppState {
        orders,
        coupons,
        publisher: Publisher::new(nats),
        shipping: ShippingPolicy::standard(),
        transitions: config.transition_policy,
        site: Arc::new(config.site.clone()),
    };
    tracing::info!(transitions = ?state.transitions, events = state.publisher.is_enabled(), "order service configured");

    let app = router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 Storefront Orders listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
