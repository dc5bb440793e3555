//! Error types for the HTTP server.

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use mdexport_core::{ConvertError, ErrorCategory, UnknownFormat};
use serde_json::json;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Conversion failed or the request was refused.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Format path segment is not a supported format.
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormat),

    /// Request body is not the expected JSON.
    #[error("Invalid request body: {0}")]
    Json(#[from] JsonRejection),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Convert(error) => match error {
                ConvertError::InvalidInputType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ConvertError::InputTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                ConvertError::RenderEngineTimeout => StatusCode::GATEWAY_TIMEOUT,
                ConvertError::RenderEngineError(_) => StatusCode::BAD_GATEWAY,
                ConvertError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                ConvertError::Forbidden => StatusCode::FORBIDDEN,
                ConvertError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::UnknownFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Json(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, category, retryable) = match &self {
            Self::Convert(error) => (error.user_message(), error.category(), error.is_retryable()),
            Self::UnknownFormat(UnknownFormat(name)) => (
                format!("Unsupported export format {name:?}. Use pdf, docx, html or txt."),
                ErrorCategory::FixInput,
                false,
            ),
            Self::Json(rejection) => (rejection.body_text(), ErrorCategory::FixInput, false),
        };

        if category == ErrorCategory::ServerFault {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = json!({
            "error": message,
            "kind": category,
            "retryable": retryable,
        });
        let mut response = (status, axum::Json(body)).into_response();

        if let Self::Convert(ConvertError::RateLimited { retry_after }) = &self {
            // Round up so clients never retry before the window frees a slot.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn status_of(error: ConvertError) -> StatusCode {
        ServerError::from(error).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ConvertError::InvalidInputType(String::new())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_of(ConvertError::InputTooLarge { size: 2, limit: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(ConvertError::RenderEngineTimeout),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(ConvertError::RenderEngineError("x".to_owned())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(ConvertError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(ConvertError::Internal("x".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ServerError::from(ConvertError::RateLimited {
            retry_after: Duration::from_millis(12_300),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "13");
    }

    #[test]
    fn test_unknown_format_is_unsupported_media_type() {
        let response = ServerError::from(UnknownFormat("odt".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
