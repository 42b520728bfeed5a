//! Response-action console API server.

use respond_api::config::ApiConfig;
use respond_api::server::{self, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env()?;
    let store = config.build_store()?;
    if config.admin_secret.is_none() {
        tracing::warn!("RESPOND_ADMIN_SECRET not set; admin routes are disabled");
    }
    tracing::info!(store = config.store.name(), "action store ready");

    let state = Arc::new(AppState::new(store, config.admin_secret.clone()));
    let app = server::router(state);
    tracing::info!("respond API listening on {}", config.listen);
    axum::serve(
        tokio::net::TcpListener::bind(config.listen).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
