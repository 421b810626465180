mod app;
mod config;
mod db;
mod errors;
mod external;
mod logging;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::external::twelvedata::TwelveDataProvider;
use crate::logging::LoggingConfig;
use crate::services::session_service::SessionKeys;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().context("invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let provider = TwelveDataProvider::new(
        config.price_api_key.clone(),
        config.price_api_url.clone(),
        config.price_lookup_timeout,
    )
    .context("failed to create quote provider")?;
    tracing::info!(
        "Using quote service at {} (timeout {:?})",
        config.price_api_url,
        config.price_lookup_timeout
    );

    let state = AppState {
        pool,
        quote_provider: Arc::new(provider),
        session_keys: Arc::new(SessionKeys::new(&config.session_secret, config.session_ttl_hours)),
        starting_cash: config.starting_cash.clone(),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("stocksim backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
