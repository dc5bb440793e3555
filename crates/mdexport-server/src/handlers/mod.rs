//! HTTP request handlers.

pub(crate) mod convert;
pub(crate) mod limits;
pub(crate) mod preview;

use mdexport_core::{ConvertError, DocumentSource};
use serde::Deserialize;

/// JSON body shared by the convert and preview endpoints.
#[derive(Deserialize)]
pub(crate) struct ConvertRequest {
    /// Markdown text.
    content: String,
    /// Name of the uploaded file; absent for pasted text.
    #[serde(default)]
    filename: Option<String>,
}

/// Uploads are validated by name, pasted text is taken as is.
pub(crate) fn document_source(request: ConvertRequest) -> Result<DocumentSource, ConvertError> {
    match request.filename {
        Some(name) => DocumentSource::from_file(&name, request.content.into_bytes()),
        None => Ok(DocumentSource::pasted(request.content)),
    }
}
