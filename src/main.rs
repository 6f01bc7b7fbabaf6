//! Storefront - catalog, cart and checkout backend

use std::sync::Arc;

use anyhow::Result;
use storefront::api;
use storefront::config::Config;
use storefront::publisher::EventPublisher;
use storefront::services::Services;
use storefront::store::{MemoryStore, PgStore, Store};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, url = %url, "NATS unavailable, domain events will not be published");
                None
            }
        },
        None => None,
    };

    let services = Services::new(store, config.pricing(), EventPublisher::new(nats));
    services.accounts.ensure_admin(&config.admin).await?;

    let app = api::router(services).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
    );

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(tax_percent = %config.tax_rate_percent, "storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
