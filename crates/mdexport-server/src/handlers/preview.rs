//! Preview endpoint.
//!
//! Renders the sanitized HTML fragment the exports are built from, with
//! title and table of contents.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use mdexport_core::ConvertError;
use mdexport_markdown::{ParseDegraded, TocEntry, parse_markdown, render_html};
use serde::Serialize;

use crate::error::ServerError;
use crate::handlers::{ConvertRequest, document_source};
use crate::state::AppState;

/// Response for POST /api/preview.
#[derive(Serialize)]
pub(crate) struct PreviewResponse {
    /// Sanitized HTML fragment.
    html: String,
    /// Text of the first level-1 heading.
    title: Option<String>,
    toc: Vec<TocEntry>,
    warnings: Vec<ParseDegraded>,
}

/// Handle POST /api/preview.
///
/// Bound by the HTML export ceiling.
pub(crate) async fn preview(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, ServerError> {
    let Json(request) = payload?;
    let source = document_source(request)?;

    let limit = state.converter.limits().html;
    if source.size() > limit {
        return Err(ConvertError::InputTooLarge {
            size: source.size(),
            limit,
        }
        .into());
    }

    let parsed = parse_markdown(source.text());
    Ok(Json(PreviewResponse {
        html: render_html(&parsed.document),
        title: parsed.document.title(),
        toc: parsed.document.toc(),
        warnings: parsed.warnings,
    }))
}
