//! Export formats.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Target format of a conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Html,
    Txt,
}

impl ExportFormat {
    /// Every supported format.
    pub const ALL: [Self; 4] = [Self::Pdf, Self::Docx, Self::Html, Self::Txt];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Html => "html",
            Self::Txt => "txt",
        }
    }

    /// File extension of artifacts, without the dot.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// MIME type of artifacts.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => mdexport_docx::CONTENT_TYPE,
            Self::Html => "text/html; charset=utf-8",
            Self::Txt => "text/plain; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a format name outside [`ExportFormat::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown export format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFormat(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("pdf".parse::<ExportFormat>(), Ok(ExportFormat::Pdf));
        assert_eq!("DOCX".parse::<ExportFormat>(), Ok(ExportFormat::Docx));
        assert_eq!(
            "odt".parse::<ExportFormat>(),
            Err(UnknownFormat("odt".to_owned()))
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(ExportFormat::Pdf.content_type(), "application/pdf");
        assert!(ExportFormat::Docx.content_type().contains("wordprocessingml"));
        assert_eq!(ExportFormat::Txt.to_string(), "txt");
    }
}
