//! Conversion endpoint.
//!
//! `POST /api/convert/{format}` returns the artifact bytes as a download.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use mdexport_core::{ConvertError, ExportFormat};

use crate::error::ServerError;
use crate::handlers::{ConvertRequest, document_source};
use crate::state::AppState;

/// Number of soft parse findings for the returned artifact.
const PARSE_WARNINGS: &str = "x-parse-warnings";

/// Handle POST /api/convert/{format}.
///
/// The format is validated and PDF requests are rate limited before any
/// conversion work.
pub(crate) async fn convert(
    State(state): State<Arc<AppState>>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Path(format): Path<String>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let format: ExportFormat = format.parse()?;

    if format == ExportFormat::Pdf {
        state
            .pdf_limiter
            .check(&client.ip().to_string())
            .map_err(|retry_after| {
                tracing::info!(client = %client.ip(), ?retry_after, "PDF export rate limited");
                ConvertError::RateLimited { retry_after }
            })?;
    }

    let Json(request) = payload?;
    let source = document_source(request)?;
    let artifact = state.converter.convert(&source, format).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.content_type),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&artifact.file_name),
    );
    headers.insert(
        HeaderName::from_static(PARSE_WARNINGS),
        HeaderValue::from(artifact.warnings.len()),
    );

    Ok((headers, artifact.bytes).into_response())
}

/// `attachment` disposition with the name reduced to header-safe ASCII.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_sanitizes_name() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("a\"b\r\nc d.txt"),
            "attachment; filename=\"a_b__c_d.txt\""
        );
        assert_eq!(
            content_disposition("résumé.docx"),
            "attachment; filename=\"r_sum_.docx\""
        );
    }
}
