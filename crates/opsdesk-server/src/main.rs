//! Server binary for the Opsdesk business operations backend.
//!
//! Wires configuration, the document store, and the REST API together
//! and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`opsdesk.yaml`, `OPSDESK__*`, conventional env vars)
//! 2. Initialize structured logging (tracing)
//! 3. Open the document store and run migrations
//! 4. Build shared API state (token issuer, password hasher)
//! 5. Seed the bootstrap admin account
//! 6. Serve until shutdown
//! 7. Close the store

mod bootstrap;
mod error;

use std::sync::Arc;

use opsdesk_api::{shutdown_signal, start_server, AppState, ServerConfig};
use opsdesk_core::config::LoggingConfig;
use opsdesk_core::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server itself fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration. Logging is not up yet, so a failure here is
    //    reported by the returned error alone.
    let config = AppConfig::load()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "opsdesk-server starting");
    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.database.backend,
        default_page_limit = config.pagination.default_limit,
        max_page_limit = config.pagination.max_limit,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("auth.jwt_secret is the development default; set JWT_SECRET in production");
    }

    // 3. Open the document store.
    let store = bootstrap::open_store(&config.database).await?;
    info!(backend = store.backend_name(), "Document store ready");

    // 4. Build shared state.
    let state = Arc::new(AppState::from_config(store, &config)?);

    // 5. Seed the bootstrap admin.
    if bootstrap::seed_admin(&state.store, &config.auth, &state.passwords).await? {
        info!("Bootstrap admin seeded");
    }

    // 6. Serve until shutdown.
    let server_config = ServerConfig::from(&config.server);
    let result = start_server(&server_config, Arc::clone(&state), shutdown_signal()).await;

    // 7. Close the store even if serving failed.
    state.store.close().await;
    result?;

    info!("opsdesk-server shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
