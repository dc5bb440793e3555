//! Stateless conversion of a document source to an export artifact.

use std::fmt::Write;
use std::time::Instant;

use mdexport_config::Config;
use mdexport_markdown::{
    ParseDegraded, SanitizedDocument, escape_html, parse_markdown, render_html, render_text,
    slugify,
};
use mdexport_pdf::PdfExporter;

use crate::error::ConvertError;
use crate::format::ExportFormat;
use crate::limits::SizeLimits;
use crate::source::DocumentSource;

const HTML_EXPORT_CSS: &str = "body{font-family:-apple-system,\"Segoe UI\",Helvetica,Arial,sans-serif;line-height:1.5;max-width:48rem;margin:2rem auto;padding:0 1rem;color:#1f2328}pre{background:#f6f8fa;padding:.75em;overflow:auto}code,pre{font-family:ui-monospace,Menlo,Consolas,monospace}table{border-collapse:collapse}th,td{border:1px solid #d1d9e0;padding:.3em .6em}blockquote{margin:0;padding:0 1em;color:#59636e;border-left:.25em solid #d1d9e0}img{max-width:100%}";

/// Converted bytes plus the metadata needed to serve or save them.
#[derive(Clone, Debug)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    pub content_type: &'static str,
    /// Suggested download name, e.g. `guide.pdf`.
    pub file_name: String,
    /// Soft findings from parsing; the artifact is still complete.
    pub warnings: Vec<ParseDegraded>,
}

/// Converts document sources into artifacts.
///
/// Pure with respect to its input: no state survives between calls, so a
/// single converter is shared across requests.
#[derive(Clone)]
pub struct Converter {
    pdf: PdfExporter,
    limits: SizeLimits,
}

impl Converter {
    /// Create a converter. The PDF exporter's ceiling is aligned with `limits`.
    pub fn new(pdf: PdfExporter, limits: SizeLimits) -> Self {
        Self {
            pdf: pdf.with_max_bytes(limits.pdf),
            limits,
        }
    }

    /// Create a converter with a Chrome PDF engine from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PdfExporter::from_config(config),
            SizeLimits::from(&config.limits),
        )
    }

    pub fn limits(&self) -> &SizeLimits {
        &self.limits
    }

    /// Convert `source` to `format`.
    ///
    /// The per-format size ceiling is checked before any parsing.
    ///
    /// # Errors
    ///
    /// - [`ConvertError::InputTooLarge`] if the source exceeds the ceiling
    /// - [`ConvertError::RenderEngineTimeout`] / [`ConvertError::RenderEngineError`]
    ///   if PDF rendering fails
    /// - [`ConvertError::Internal`] if DOCX packaging fails
    pub async fn convert(
        &self,
        source: &DocumentSource,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ConvertError> {
        let size = source.size();
        let limit = self.limits.for_format(format);
        if size > limit {
            tracing::info!(%format, size, limit, "Rejected oversized input");
            return Err(ConvertError::InputTooLarge { size, limit });
        }

        let start = Instant::now();
        let (bytes, title, warnings) = match format {
            ExportFormat::Pdf => {
                let output = self.pdf.render(source.text()).await.inspect_err(|e| {
                    tracing::error!(error = %e, "PDF export failed");
                })?;
                (output.bytes, output.title, output.warnings)
            }
            ExportFormat::Docx => {
                let parsed = parse_markdown(source.text());
                let html = render_html(&parsed.document);
                let bytes = mdexport_docx::to_docx(&html).inspect_err(|e| {
                    tracing::error!(error = %e, "DOCX export failed");
                })?;
                (bytes, parsed.document.title(), parsed.warnings)
            }
            ExportFormat::Html => {
                let parsed = parse_markdown(source.text());
                let html = html_document(&parsed.document);
                (html.into_bytes(), parsed.document.title(), parsed.warnings)
            }
            ExportFormat::Txt => {
                let parsed = parse_markdown(source.text());
                let text = render_text(&parsed.document);
                (text.into_bytes(), parsed.document.title(), parsed.warnings)
            }
        };

        let file_name = artifact_name(source, title.as_deref(), format);
        tracing::info!(
            %format,
            input_bytes = size,
            output_bytes = bytes.len(),
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Export complete"
        );
        Ok(ExportArtifact {
            bytes,
            format,
            content_type: format.content_type(),
            file_name,
            warnings,
        })
    }
}

/// Standalone HTML page around the rendered fragment.
pub fn html_document(document: &SanitizedDocument) -> String {
    let body = render_html(document);
    let title = document.title().unwrap_or_else(|| "Document".to_owned());
    let mut out = String::with_capacity(body.len() + HTML_EXPORT_CSS.len() + 256);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    write!(out, "<title>{}</title>\n<style>", escape_html(&title)).unwrap();
    out.push_str(HTML_EXPORT_CSS);
    out.push_str("</style>\n</head>\n<body>\n");
    out.push_str(&body);
    out.push_str("\n</body>\n</html>\n");
    out
}

/// File stem of the upload, else the slugified title, else `document`.
fn artifact_name(source: &DocumentSource, title: Option<&str>, format: ExportFormat) -> String {
    let stem = source
        .file_stem()
        .map(str::to_owned)
        .or_else(|| title.map(slugify).filter(|slug| !slug.is_empty()))
        .unwrap_or_else(|| "document".to_owned());
    format!("{stem}.{}", format.extension())
}
