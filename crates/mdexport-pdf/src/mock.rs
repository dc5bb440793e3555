//! In-process engine for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::engine::{EngineError, PdfEngine, PrintOptions};

/// Minimal valid-looking PDF returned by default.
const DEFAULT_OUTPUT: &[u8] = b"%PDF-1.7\n%%EOF\n";

/// Records calls and returns canned output.
///
/// A configured delay honors the deadline: the mock sleeps until the
/// deadline at most and then reports [`EngineError::DeadlineExceeded`].
#[derive(Debug)]
pub struct MockEngine {
    output: Vec<u8>,
    delay: Option<Duration>,
    failure: Option<String>,
    calls: AtomicUsize,
    last_html: Mutex<Option<String>>,
    last_options: Mutex<Option<PrintOptions>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: DEFAULT_OUTPUT.to_vec(),
            delay: None,
            failure: None,
            calls: AtomicUsize::new(0),
            last_html: Mutex::new(None),
            last_options: Mutex::new(None),
        }
    }

    /// Engine whose every call fails with a launch error.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_owned()),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: Vec<u8>) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `print` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// HTML passed to the most recent call.
    pub fn last_html(&self) -> Option<String> {
        self.last_html.lock().ok()?.clone()
    }

    /// Options passed to the most recent call.
    pub fn last_options(&self) -> Option<PrintOptions> {
        self.last_options.lock().ok()?.clone()
    }
}

impl PdfEngine for MockEngine {
    fn print(
        &self,
        html: &str,
        options: &PrintOptions,
        deadline: Instant,
    ) -> Result<Vec<u8>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_html.lock() {
            *last = Some(html.to_owned());
        }
        if let Ok(mut last) = self.last_options.lock() {
            *last = Some(options.clone());
        }

        if let Some(delay) = self.delay {
            let budget = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(delay.min(budget));
            if delay > budget {
                return Err(EngineError::DeadlineExceeded);
            }
        }
        if let Some(message) = &self.failure {
            return Err(EngineError::Launch(message.clone()));
        }
        Ok(self.output.clone())
    }
}
