//! Conversion state machine.
//!
//! ```text
//!            LOAD                 EXPORT ok
//!   Idle ─────────────▶ Ready ◀──────────┐
//!    ▲  ◀─── CLEAR ───   │  └─────────────┘
//!    │                   │ EXPORT failed
//!    │ DISMISS (no src)  ▼
//!    └──────────────── Error ── DISMISS (src) ──▶ Ready
//! ```
//!
//! Every `LOAD` and `CLEAR` bumps a generation counter. An export captures
//! the generation it started under and only touches state if that
//! generation is still current, so the last load always wins.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::converter::{Converter, ExportArtifact};
use crate::error::ConvertError;
use crate::format::ExportFormat;
use crate::source::DocumentSource;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Observable orchestrator state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Ready,
    Error(ConvertError),
}

/// Result of [`Orchestrator::export`].
#[derive(Debug)]
pub enum ExportOutcome {
    Completed(ExportArtifact),
    Failed(ConvertError),
    /// A newer document was loaded (or the document was cleared) while the
    /// export ran. State was left untouched.
    Stale,
    /// No document is loaded, or an error is waiting to be dismissed.
    NotReady,
}

struct Inner {
    state: OrchestratorState,
    source: Option<Arc<DocumentSource>>,
    generation: u64,
}

/// Holds the current document and dispatches exports.
///
/// # Panics
///
/// Methods panic if the internal mutex is poisoned.
pub struct Orchestrator {
    converter: Arc<Converter>,
    telemetry: Arc<dyn TelemetrySink>,
    inner: Mutex<Inner>,
}

impl Orchestrator {
    pub fn new(converter: Arc<Converter>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            converter,
            telemetry,
            inner: Mutex::new(Inner {
                state: OrchestratorState::Idle,
                source: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn state(&self) -> OrchestratorState {
        self.lock().state.clone()
    }

    /// Current document, if any.
    pub fn source(&self) -> Option<Arc<DocumentSource>> {
        self.lock().source.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Replace the current document. Valid from any state.
    pub fn load(&self, source: DocumentSource) {
        let event = TelemetryEvent::DocumentLoaded {
            kind: source.kind(),
            bytes: source.size(),
        };
        {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.source = Some(Arc::new(source));
            inner.state = OrchestratorState::Ready;
            tracing::debug!(generation = inner.generation, "Document loaded");
        }
        self.telemetry.record(&event);
    }

    /// Drop the current document. Valid from any state.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.source = None;
            inner.state = OrchestratorState::Idle;
        }
        self.telemetry.record(&TelemetryEvent::DocumentCleared);
    }

    /// Leave the error state: back to `Ready` when a document is loaded,
    /// otherwise `Idle`. No effect in other states.
    pub fn dismiss_error(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, OrchestratorState::Error(_)) {
            inner.state = if inner.source.is_some() {
                OrchestratorState::Ready
            } else {
                OrchestratorState::Idle
            };
        }
    }

    /// Export the current document.
    ///
    /// Never mutates the document. On failure the state moves to `Error`,
    /// unless the export went stale meanwhile.
    pub async fn export(&self, format: ExportFormat) -> ExportOutcome {
        let (source, generation) = {
            let inner = self.lock();
            match (&inner.state, &inner.source) {
                (OrchestratorState::Ready, Some(source)) => {
                    (Arc::clone(source), inner.generation)
                }
                _ => return ExportOutcome::NotReady,
            }
        };

        let start = Instant::now();
        let result = self.converter.convert(&source, format).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            drop(inner);
            tracing::debug!(%format, generation, "Discarding stale export");
            self.telemetry
                .record(&TelemetryEvent::ExportDiscarded { format });
            return ExportOutcome::Stale;
        }

        match result {
            Ok(artifact) => {
                inner.state = OrchestratorState::Ready;
                drop(inner);
                self.telemetry.record(&TelemetryEvent::ExportSucceeded {
                    format,
                    bytes: artifact.bytes.len(),
                    elapsed: start.elapsed(),
                });
                ExportOutcome::Completed(artifact)
            }
            Err(error) => {
                inner.state = OrchestratorState::Error(error.clone());
                drop(inner);
                self.telemetry.record(&TelemetryEvent::ExportFailed {
                    format,
                    category: error.category(),
                });
                ExportOutcome::Failed(error)
            }
        }
    }
}
