//! Limits API endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use mdexport_core::SizeLimits;

use crate::state::AppState;

/// Handle GET /api/limits.
///
/// Publishes the per-format input ceilings the converter enforces.
pub(crate) async fn get_limits(State(state): State<Arc<AppState>>) -> Json<SizeLimits> {
    Json(*state.converter.limits())
}
