//! Markdown to PDF pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mdexport_config::{Config, DEFAULT_PDF_MAX_BYTES};
use mdexport_markdown::{ParseDegraded, parse_markdown};

use crate::chrome::ChromeEngine;
use crate::document::print_document;
use crate::engine::{EngineError, PdfEngine, PrintOptions};

/// Default time budget for one print.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// PDF export error.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// Input exceeds the PDF size ceiling.
    #[error("Input is {size} bytes, PDF limit is {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },
    /// The engine did not finish within the time budget.
    #[error("PDF rendering timed out after {0:?}")]
    Timeout(Duration),
    /// The engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// PDF bytes plus what parsing found out about the document.
#[derive(Debug)]
pub struct PdfOutput {
    pub bytes: Vec<u8>,
    /// Text of the first level-1 heading.
    pub title: Option<String>,
    pub warnings: Vec<ParseDegraded>,
}

/// Converts Markdown to PDF through a [`PdfEngine`].
///
/// Holds no per-document state; one exporter serves concurrent requests.
#[derive(Clone)]
pub struct PdfExporter {
    engine: Arc<dyn PdfEngine>,
    options: PrintOptions,
    max_bytes: usize,
    timeout: Duration,
}

impl PdfExporter {
    /// Create an exporter with default options, limit and timeout.
    pub fn new(engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            engine,
            options: PrintOptions::default(),
            max_bytes: DEFAULT_PDF_MAX_BYTES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a Chrome-backed exporter from configuration.
    pub fn from_config(config: &Config) -> Self {
        let pdf = &config.pdf_resolved;
        Self::new(Arc::new(ChromeEngine::from_config(pdf)))
            .with_options(PrintOptions::from(pdf))
            .with_max_bytes(config.limits.pdf_max_bytes)
            .with_timeout(pdf.timeout)
    }

    #[must_use]
    pub fn with_options(mut self, options: PrintOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Input ceiling in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Convert Markdown to PDF bytes.
    ///
    /// # Errors
    ///
    /// See [`PdfExporter::render`].
    pub async fn to_pdf(&self, markdown: &str) -> Result<Vec<u8>, PdfError> {
        self.render(markdown).await.map(|output| output.bytes)
    }

    /// Convert Markdown to PDF, keeping parse warnings.
    ///
    /// The size check runs before any parsing or engine work. Engine
    /// failures are returned as-is and never retried.
    ///
    /// # Errors
    ///
    /// - [`PdfError::InputTooLarge`] if `markdown` exceeds the ceiling
    /// - [`PdfError::Timeout`] if the engine runs past the time budget
    /// - [`PdfError::Engine`] if the engine fails to launch, load or print
    pub async fn render(&self, markdown: &str) -> Result<PdfOutput, PdfError> {
        let size = markdown.len();
        if size > self.max_bytes {
            return Err(PdfError::InputTooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let parsed = parse_markdown(markdown);
        let html = print_document(&parsed.document, &self.options);

        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();
        let deadline = Instant::now() + self.timeout;
        let task = tokio::task::spawn_blocking(move || engine.print(&html, &options, deadline));

        let start = Instant::now();
        let bytes = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                // The blocking call observes the same deadline and unwinds on its own.
                tracing::warn!(timeout = ?self.timeout, "PDF engine timed out");
                return Err(PdfError::Timeout(self.timeout));
            }
            Ok(Err(join_error)) => {
                return Err(EngineError::Crashed(join_error.to_string()).into());
            }
            Ok(Ok(Err(EngineError::DeadlineExceeded))) => {
                return Err(PdfError::Timeout(self.timeout));
            }
            Ok(Ok(result)) => result?,
        };

        tracing::info!(
            input_bytes = size,
            pdf_bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "PDF export complete"
        );
        Ok(PdfOutput {
            bytes,
            title: parsed.document.title(),
            warnings: parsed.warnings,
        })
    }
}
