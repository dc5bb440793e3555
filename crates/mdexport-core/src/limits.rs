//! Per-format input ceilings.

use mdexport_config::{DEFAULT_MAX_BYTES, DEFAULT_PDF_MAX_BYTES, LimitsConfig};
use serde::Serialize;

use crate::format::ExportFormat;

/// Largest accepted input per format, in bytes.
///
/// Serialized as-is by `GET /api/limits` so clients show the same numbers
/// the converter enforces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SizeLimits {
    pub pdf: usize,
    pub docx: usize,
    pub html: usize,
    pub txt: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            pdf: DEFAULT_PDF_MAX_BYTES,
            docx: DEFAULT_MAX_BYTES,
            html: DEFAULT_MAX_BYTES,
            txt: DEFAULT_MAX_BYTES,
        }
    }
}

impl From<&LimitsConfig> for SizeLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            pdf: config.pdf_max_bytes,
            docx: config.max_bytes,
            html: config.max_bytes,
            txt: config.max_bytes,
        }
    }
}

impl SizeLimits {
    pub fn for_format(&self, format: ExportFormat) -> usize {
        match format {
            ExportFormat::Pdf => self.pdf,
            ExportFormat::Docx => self.docx,
            ExportFormat::Html => self.html,
            ExportFormat::Txt => self.txt,
        }
    }

    /// Largest limit over all formats.
    pub fn max(&self) -> usize {
        self.pdf.max(self.docx).max(self.html).max(self.txt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = SizeLimits::default();
        assert_eq!(limits.for_format(ExportFormat::Pdf), 1024 * 1024);
        assert_eq!(limits.for_format(ExportFormat::Docx), 5 * 1024 * 1024);
        assert_eq!(limits.max(), 5 * 1024 * 1024);
    }

    #[test]
    fn test_from_config() {
        let config = LimitsConfig {
            pdf_max_bytes: 10,
            max_bytes: 20,
        };
        let limits = SizeLimits::from(&config);
        assert_eq!(limits.for_format(ExportFormat::Pdf), 10);
        assert_eq!(limits.for_format(ExportFormat::Txt), 20);
    }
}
