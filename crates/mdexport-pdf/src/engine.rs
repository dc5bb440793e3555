//! Print engine abstraction.

use std::time::Instant;

use mdexport_config::{Paper, PdfConfig};

/// Page layout passed to the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct PrintOptions {
    /// Paper size.
    pub paper: Paper,
    /// Margin on every side, in millimetres.
    pub margin_mm: f64,
    /// Print background colours (table header shading, code blocks).
    pub print_background: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            paper: Paper::A4,
            margin_mm: 20.0,
            print_background: true,
        }
    }
}

impl From<&PdfConfig> for PrintOptions {
    fn from(config: &PdfConfig) -> Self {
        Self {
            paper: config.paper,
            margin_mm: config.margin_mm,
            print_background: true,
        }
    }
}

impl PrintOptions {
    /// Paper width and height in inches.
    pub fn paper_inches(&self) -> (f64, f64) {
        match self.paper {
            Paper::A4 => (8.27, 11.69),
            Paper::Letter => (8.5, 11.0),
        }
    }

    /// Margin in inches.
    pub fn margin_inches(&self) -> f64 {
        self.margin_mm / 25.4
    }

    /// CSS `size` keyword for `@page`.
    pub fn css_page_size(&self) -> &'static str {
        match self.paper {
            Paper::A4 => "A4",
            Paper::Letter => "letter",
        }
    }
}

/// Error from a print engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Browser could not be started.
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    /// Document could not be loaded.
    #[error("Failed to load document: {0}")]
    Navigate(String),
    /// Printing failed.
    #[error("Failed to print document: {0}")]
    Print(String),
    /// Temporary file handling failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The time budget ran out inside the engine.
    #[error("Print deadline exceeded")]
    DeadlineExceeded,
    /// The engine thread panicked.
    #[error("Print engine crashed: {0}")]
    Crashed(String),
}

/// Blocking HTML-to-PDF engine.
///
/// Implementations must give up once `deadline` passes and release every
/// resource they acquired on all exit paths. Called from a blocking thread.
pub trait PdfEngine: Send + Sync {
    /// Print a complete HTML document to PDF bytes.
    fn print(
        &self,
        html: &str,
        options: &PrintOptions,
        deadline: Instant,
    ) -> Result<Vec<u8>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_sizes() {
        let a4 = PrintOptions::default();
        assert_eq!(a4.paper_inches(), (8.27, 11.69));
        assert_eq!(a4.css_page_size(), "A4");

        let letter = PrintOptions {
            paper: Paper::Letter,
            ..PrintOptions::default()
        };
        assert_eq!(letter.paper_inches(), (8.5, 11.0));
        assert_eq!(letter.css_page_size(), "letter");
    }

    #[test]
    fn test_margin_conversion() {
        let options = PrintOptions {
            margin_mm: 25.4,
            ..PrintOptions::default()
        };
        assert!((options.margin_inches() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_config() {
        let config = PdfConfig {
            paper: Paper::Letter,
            margin_mm: 10.0,
            ..PdfConfig::default()
        };
        let options = PrintOptions::from(&config);
        assert_eq!(options.paper, Paper::Letter);
        assert!((options.margin_mm - 10.0).abs() < f64::EPSILON);
    }
}
