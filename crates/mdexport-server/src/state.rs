//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use mdexport_core::Converter;

use crate::middleware::origin::OriginPolicy;
use crate::rate_limit::RateLimiter;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Stateless converter shared by every request.
    pub(crate) converter: Arc<Converter>,
    /// Limiter for PDF exports, keyed by client address.
    pub(crate) pdf_limiter: RateLimiter,
    /// Origin policy for mutating requests.
    pub(crate) origins: OriginPolicy,
}
