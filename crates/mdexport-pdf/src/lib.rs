//! Markdown to PDF export.
//!
//! Markdown is parsed and sanitized, rendered to HTML, wrapped in a print
//! document and handed to a [`PdfEngine`] on a blocking thread. The call is
//! bounded by a timeout, and the engine receives the same deadline so a hung
//! browser releases its session instead of leaking it.
//!
//! # Example
//!
//! ```ignore
//! use mdexport_pdf::PdfExporter;
//!
//! let config = mdexport_config::Config::load(None, None)?;
//! let exporter = PdfExporter::from_config(&config);
//! let pdf = exporter.to_pdf("# Report\n\nBody").await?;
//! ```

mod chrome;
mod document;
mod engine;
mod exporter;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use chrome::ChromeEngine;
pub use document::print_document;
pub use engine::{EngineError, PdfEngine, PrintOptions};
pub use exporter::{DEFAULT_TIMEOUT, PdfError, PdfExporter, PdfOutput};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEngine;
