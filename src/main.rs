//! misslog API Server
//!
//! Run with: cargo run --bin misslog
//!
//! # Configuration
//!
//! Read from the first config file found (see `misslog-cli config`), then
//! overridden by environment variables:
//! - `MISSLOG_DATA_DIR`: Data directory
//! - `MISSLOG_API_HOST` / `MISSLOG_API_PORT`: Bind address
//! - `MISSLOG_RETENTION_DAYS`: Expire misses older than this (0 = keep)
//! - `MISSLOG_LOG_LEVEL` / `MISSLOG_LOG_FORMAT`: Logging (`pretty` or `json`)
//! - `RUST_LOG`: Full filter directive, wins over `MISSLOG_LOG_LEVEL`

use anyhow::Context;
use misslog::api::{serve, AppState};
use misslog::config::{Config, LoggingConfig};
use misslog::retention::{spawn_sweeper, RetentionPolicy};
use misslog::store::LogStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!("Starting misslog API server v{}", env!("CARGO_PKG_VERSION"));

    let store_config = config.storage.to_store_config();
    tracing::info!("Data directory: {:?}", store_config.data_dir);

    let store = Arc::new(
        LogStore::open(&store_config)
            .with_context(|| format!("opening log store in {:?}", store_config.data_dir))?,
    );
    tracing::info!(events = store.count()?, "Log store ready");

    let sweeper = spawn_sweeper(
        Arc::clone(&store),
        RetentionPolicy::from_config(&config.retention),
    );

    let api_config = config.api.to_api_config();
    let state = AppState::new(Arc::clone(&store), api_config.clone());

    // Run server
    serve(state, &api_config).await.context("API server failed")?;

    // Graceful shutdown
    if let Some(handle) = sweeper {
        handle.abort();
    }

    tracing::info!("Checkpointing log store...");
    store.checkpoint().context("checkpointing log store")?;
    tracing::info!("misslog API server stopped");

    Ok(())
}

/// Initialize tracing with pretty or JSON output
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("misslog={},tower_http=debug", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
