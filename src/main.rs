//! Trailhead Storefront - catalog, carts and checkout

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trailhead_storefront::config::Config;
use trailhead_storefront::publisher::EventPublisher;
use trailhead_storefront::state::AppState;
use trailhead_storefront::storage::{MemoryStorage, PgStorage, Store};
use trailhead_storefront::{http, seed};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .context("connecting to postgres")?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("using postgres storage");
            Arc::new(PgStorage::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory only");
            Arc::new(MemoryStorage::new())
        }
    };

    if config.seeds_demo_catalog() {
        seed::seed_demo_catalog(&*store).await.context("seeding demo catalog")?;
    }

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                None
            }
        },
        None => None,
    };

    let state = AppState::new(store, EventPublisher::new(nats));
    let app = http::router(state, &config);

    let addr = config.socket_addr();
    tracing::info!("🚀 Trailhead Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
