//! HTTP server for mdexport.
//!
//! Serves the conversion API:
//! - `POST /api/convert/{format}` returns the converted document as a download
//! - `POST /api/preview` returns the sanitized HTML with title and TOC
//! - `GET /api/limits` publishes the per-format input ceilings
//!
//! Mutating requests pass origin validation; PDF exports are rate limited
//! per client address.
//!
//! # Quick Start
//!
//! ```ignore
//! use mdexport_config::Config;
//! use mdexport_server::run_server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     run_server(&config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Client ──HTTP──► axum router (mdexport-server)
//!                      │
//!                      ├─► origin check ──► 403
//!                      ├─► PDF rate limit (CounterStore) ──► 429
//!                      │
//!                      └─► Converter (mdexport-core)
//!                              ├─► PDF  (headless Chrome)
//!                              ├─► DOCX (WordprocessingML package)
//!                              └─► HTML / TXT
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod rate_limit;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use mdexport_config::Config;
use mdexport_core::Converter;

pub use error::ServerError;
pub use rate_limit::{CounterStore, InMemoryCounterStore};

use crate::middleware::origin::OriginPolicy;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

/// Build the router with an in-memory rate-limit store.
///
/// Handlers extract the client address, so serve the router with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(converter: Arc<Converter>, config: &Config) -> Router {
    router_with_store(converter, config, Arc::new(InMemoryCounterStore::new()))
}

/// Build the router with a caller-provided rate-limit store.
pub fn router_with_store(
    converter: Arc<Converter>,
    config: &Config,
    store: Arc<dyn CounterStore>,
) -> Router {
    let state = Arc::new(AppState {
        converter,
        pdf_limiter: RateLimiter::new(store, &config.rate_limit),
        origins: OriginPolicy::from_config(config),
    });
    app::create_router(state)
}

/// Run the server.
///
/// # Errors
///
/// Returns an error if the address is invalid or the server fails to start.
pub async fn run_server(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let converter = Arc::new(Converter::from_config(config));
    let app = router(converter, config);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.server.host, config.server.port))?;
    tracing::info!(
        address = %addr,
        production = config.server.production,
        rate_limit = config.rate_limit.enabled,
        "Starting server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
