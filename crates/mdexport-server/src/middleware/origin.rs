//! Origin validation for mutating requests.
//!
//! A request's origin is its `Origin` header, or the scheme and authority
//! of its `Referer` when `Origin` is missing. Same-origin requests (origin
//! matches the `Host` header) are always accepted.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use mdexport_config::Config;
use mdexport_core::ConvertError;

use crate::error::ServerError;
use crate::state::AppState;

/// Which origins may call mutating endpoints.
#[derive(Debug, Clone)]
pub(crate) struct OriginPolicy {
    allowed: Vec<String>,
    production: bool,
}

impl OriginPolicy {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            allowed: config
                .security
                .allowed_origins
                .iter()
                .map(|origin| normalize(origin))
                .collect(),
            production: config.server.production,
        }
    }

    /// Decide whether a request with `headers` may proceed.
    pub(crate) fn check(&self, headers: &HeaderMap) -> Result<(), ConvertError> {
        let Some(origin) = request_origin(headers) else {
            return if self.production {
                Err(ConvertError::Forbidden)
            } else {
                Ok(())
            };
        };

        if self.allowed.contains(&origin) || is_same_origin(&origin, headers) {
            Ok(())
        } else {
            tracing::warn!(%origin, "Rejected request from disallowed origin");
            Err(ConvertError::Forbidden)
        }
    }
}

/// Reject mutating requests whose origin is not allowed.
pub(crate) async fn require_allowed_origin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(next.run(request).await);
    }
    state.origins.check(request.headers())?;
    Ok(next.run(request).await)
}

fn request_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers.get(header::ORIGIN) {
        // An unreadable or opaque ("null") origin is still an origin.
        return Some(origin.to_str().map(normalize).unwrap_or_default());
    }
    headers
        .get(header::REFERER)
        .and_then(|referer| referer.to_str().ok())
        .and_then(origin_of_url)
}

/// Scheme and authority of an absolute `http(s)` URL.
fn origin_of_url(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return None;
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }
    Some(normalize(&format!("{scheme}://{authority}")))
}

fn is_same_origin(origin: &str, headers: &HeaderMap) -> bool {
    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
        .is_some_and(|authority| authority == host)
}

fn normalize(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}
