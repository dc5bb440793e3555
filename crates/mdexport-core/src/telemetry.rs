//! Telemetry sink abstraction.
//!
//! The orchestrator reports what happened; where events go (analytics,
//! logs, nowhere) is decided by the sink handed to it.

use std::time::Duration;

use crate::error::ErrorCategory;
use crate::format::ExportFormat;

/// Event emitted by the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryEvent {
    DocumentLoaded {
        /// `file` or `pasted`.
        kind: &'static str,
        bytes: usize,
    },
    DocumentCleared,
    ExportSucceeded {
        format: ExportFormat,
        bytes: usize,
        elapsed: Duration,
    },
    ExportFailed {
        format: ExportFormat,
        category: ErrorCategory,
    },
    /// An export finished after a newer document was loaded.
    ExportDiscarded { format: ExportFormat },
}

/// Receiver for telemetry events. Must not block.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &TelemetryEvent);
}

/// Drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn record(&self, _event: &TelemetryEvent) {}
}

/// Logs events with `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::DocumentLoaded { kind, bytes } => {
                tracing::debug!(kind, bytes, "telemetry: document loaded");
            }
            TelemetryEvent::DocumentCleared => tracing::debug!("telemetry: document cleared"),
            TelemetryEvent::ExportSucceeded {
                format,
                bytes,
                elapsed,
            } => {
                tracing::debug!(%format, bytes, ?elapsed, "telemetry: export succeeded");
            }
            TelemetryEvent::ExportFailed { format, category } => {
                tracing::debug!(%format, ?category, "telemetry: export failed");
            }
            TelemetryEvent::ExportDiscarded { format } => {
                tracing::debug!(%format, "telemetry: stale export discarded");
            }
        }
    }
}
