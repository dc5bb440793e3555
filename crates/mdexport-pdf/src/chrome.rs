//! Headless Chrome print engine.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use mdexport_config::PdfConfig;

use crate::engine::{EngineError, PdfEngine, PrintOptions};

/// Print engine driving a headless Chrome/Chromium process.
///
/// Each call launches a fresh browser so that no page state leaks between
/// documents.
#[derive(Clone, Debug, Default)]
pub struct ChromeEngine {
    chrome_path: Option<PathBuf>,
    sandbox: bool,
}

impl ChromeEngine {
    /// Create an engine using an explicit executable, or auto-detection when `None`.
    #[must_use]
    pub fn new(chrome_path: Option<PathBuf>, sandbox: bool) -> Self {
        Self {
            chrome_path,
            sandbox,
        }
    }

    /// Create an engine from the resolved `[pdf]` configuration.
    #[must_use]
    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new(config.chrome_path.clone(), config.sandbox)
    }
}

/// Browser process plus tab, closed on drop.
///
/// Dropping `Browser` terminates the process; the tab is closed first so
/// that an in-flight print is abandoned.
struct Session {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl Session {
    fn launch(engine: &ChromeEngine, budget: Duration) -> Result<Self, EngineError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(engine.sandbox)
            .path(engine.chrome_path.clone())
            .idle_browser_timeout(budget)
            .build()
            .map_err(|e| EngineError::Launch(e.to_string()))?;
        let browser = Browser::new(options).map_err(|e| EngineError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| EngineError::Launch(e.to_string()))?;
        tab.set_default_timeout(budget);
        Ok(Self {
            tab,
            _browser: browser,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            tracing::debug!(error = %e, "Failed to close browser tab");
        }
    }
}

fn remaining(deadline: Instant) -> Result<Duration, EngineError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        Err(EngineError::DeadlineExceeded)
    } else {
        Ok(left)
    }
}

impl PdfEngine for ChromeEngine {
    fn print(
        &self,
        html: &str,
        options: &PrintOptions,
        deadline: Instant,
    ) -> Result<Vec<u8>, EngineError> {
        // Removed when dropped, on every return path.
        let mut page = tempfile::Builder::new()
            .prefix("mdexport-")
            .suffix(".html")
            .tempfile()?;
        page.write_all(html.as_bytes())?;
        page.flush()?;

        let session = Session::launch(self, remaining(deadline)?)?;
        let url = format!("file://{}", page.path().display());

        session
            .tab
            .navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| EngineError::Navigate(e.to_string()))?;

        remaining(deadline)?;
        let (paper_width, paper_height) = options.paper_inches();
        let margin = options.margin_inches();
        let pdf_options = PrintToPdfOptions {
            landscape: Some(false),
            display_header_footer: Some(false),
            print_background: Some(options.print_background),
            scale: Some(1.0),
            paper_width: Some(paper_width),
            paper_height: Some(paper_height),
            margin_top: Some(margin),
            margin_bottom: Some(margin),
            margin_left: Some(margin),
            margin_right: Some(margin),
            prefer_css_page_size: Some(false),
            ..Default::default()
        };

        let bytes = session
            .tab
            .print_to_pdf(Some(pdf_options))
            .map_err(|e| EngineError::Print(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), "Chrome print complete");
        Ok(bytes)
    }
}
