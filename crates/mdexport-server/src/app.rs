//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};

use crate::handlers;
use crate::middleware::{origin, request_log, security};
use crate::state::AppState;

/// Room for JSON escaping and the `filename` field on top of the largest
/// accepted document.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.converter.limits().max().saturating_mul(2) + BODY_OVERHEAD;

    let router = Router::new()
        .route("/api/convert/{format}", post(handlers::convert::convert))
        .route("/api/preview", post(handlers::preview::preview))
        .route("/api/limits", get(handlers::limits::get_limits))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            origin::require_allowed_origin,
        ))
        .layer(DefaultBodyLimit::max(body_limit));

    security::with_security_headers(router)
        .layer(middleware::from_fn(request_log::log_request))
        .with_state(state)
}
