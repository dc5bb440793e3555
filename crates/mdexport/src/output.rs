//! Colored status output on stderr.
//!
//! Stdout stays free for piping; everything the CLI reports goes here.

use std::path::Path;

use console::{Style, Term};
use mdexport_core::format_bytes;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    ok: Style,
    warn: Style,
    fail: Style,
    heading: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red(),
            heading: Style::new().cyan().bold(),
        }
    }

    fn styled(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }

    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.styled(&self.warn, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.styled(&self.fail, msg);
    }

    /// Startup banner line (cyan bold).
    pub(crate) fn banner(&self, msg: &str) {
        self.styled(&self.heading, msg);
    }

    /// Report a written artifact (green).
    pub(crate) fn written(&self, path: &Path, bytes: usize) {
        self.styled(
            &self.ok,
            &format!("Wrote {} ({})", path.display(), format_bytes(bytes)),
        );
    }

    /// One yellow line per soft parse finding.
    pub(crate) fn parse_warnings<W: std::fmt::Display>(&self, warnings: &[W]) {
        for warning in warnings {
            self.warning(&format!("Warning: {warning}"));
        }
    }
}
