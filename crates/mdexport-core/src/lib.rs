//! Conversion core for mdexport.
//!
//! - [`DocumentSource`] validates uploads (extension, UTF-8) and pasted text
//! - [`Converter`] turns a source into an [`ExportArtifact`] for one
//!   [`ExportFormat`], enforcing the per-format [`SizeLimits`]
//! - [`Orchestrator`] holds the current document and discards results of
//!   exports that were overtaken by a newer load
//!
//! Errors are [`ConvertError`] values with an [`ErrorCategory`] and a
//! user-safe message.

mod converter;
mod error;
mod format;
mod limits;
mod orchestrator;
mod source;
mod telemetry;

pub use converter::{Converter, ExportArtifact, html_document};
pub use error::{ConvertError, ErrorCategory, format_bytes};
pub use format::{ExportFormat, UnknownFormat};
pub use limits::SizeLimits;
pub use orchestrator::{ExportOutcome, Orchestrator, OrchestratorState};
pub use source::{ACCEPTED_EXTENSIONS, DocumentSource};
pub use telemetry::{NullTelemetry, TelemetryEvent, TelemetrySink, TracingTelemetry};
