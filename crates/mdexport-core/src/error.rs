//! Conversion errors and their user-facing categories.

use std::time::Duration;

use mdexport_docx::DocxError;
use mdexport_pdf::PdfError;
use serde::Serialize;

/// What the user can do about an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Change the input (type or size).
    FixInput,
    /// Retry, the failure was transient.
    TryAgain,
    /// Wait until the rate limit window passes.
    Wait,
    /// The request is not allowed.
    Blocked,
    /// Nothing the user can do.
    ServerFault,
}

/// Conversion failure.
///
/// Display output may carry internal details and is meant for logs; use
/// [`ConvertError::user_message`] for anything shown to users.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("Invalid input: {0}")]
    InvalidInputType(String),

    #[error("Input is {size} bytes, limit is {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Render engine timed out")]
    RenderEngineTimeout,

    #[error("Render engine failed: {0}")]
    RenderEngineError(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Origin not allowed")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInputType(_) | Self::InputTooLarge { .. } => ErrorCategory::FixInput,
            Self::RenderEngineTimeout => ErrorCategory::TryAgain,
            Self::RateLimited { .. } => ErrorCategory::Wait,
            Self::Forbidden => ErrorCategory::Blocked,
            Self::RenderEngineError(_) | Self::Internal(_) => ErrorCategory::ServerFault,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::TryAgain | ErrorCategory::Wait
        )
    }

    /// Message safe to show to users: no paths, engine output or internals.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInputType(_) => {
                "Unsupported file. Upload a UTF-8 .md, .markdown or .txt file.".to_owned()
            }
            Self::InputTooLarge { limit, .. } => format!(
                "The document is too large for this format. The limit is {}.",
                format_bytes(*limit)
            ),
            Self::RenderEngineTimeout => {
                "Rendering took too long. Try again or shorten the document.".to_owned()
            }
            Self::RateLimited { retry_after } => format!(
                "Too many exports. Try again in {} seconds.",
                retry_after.as_secs().max(1)
            ),
            Self::Forbidden => "This request is not allowed.".to_owned(),
            Self::RenderEngineError(_) | Self::Internal(_) => {
                "Something went wrong on our side. Please try again later.".to_owned()
            }
        }
    }
}

impl From<PdfError> for ConvertError {
    fn from(error: PdfError) -> Self {
        match error {
            PdfError::InputTooLarge { size, limit } => Self::InputTooLarge { size, limit },
            PdfError::Timeout(_) => Self::RenderEngineTimeout,
            PdfError::Engine(e) => Self::RenderEngineError(e.to_string()),
        }
    }
}

impl From<DocxError> for ConvertError {
    fn from(error: DocxError) -> Self {
        Self::Internal(error.to_string())
    }
}

/// Human-readable size: `1 MiB`, `512 KiB`, `300 bytes`.
pub fn format_bytes(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes.is_multiple_of(MIB) {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= KIB && bytes.is_multiple_of(KIB) {
        format!("{} KiB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdexport_pdf::EngineError;

    #[test]
    fn test_categories() {
        assert_eq!(
            ConvertError::InvalidInputType(String::new()).category(),
            ErrorCategory::FixInput
        );
        assert_eq!(
            ConvertError::InputTooLarge { size: 2, limit: 1 }.category(),
            ErrorCategory::FixInput
        );
        assert_eq!(
            ConvertError::RenderEngineTimeout.category(),
            ErrorCategory::TryAgain
        );
        assert_eq!(
            ConvertError::RateLimited {
                retry_after: Duration::from_secs(3)
            }
            .category(),
            ErrorCategory::Wait
        );
        assert_eq!(ConvertError::Forbidden.category(), ErrorCategory::Blocked);
        assert_eq!(
            ConvertError::RenderEngineError("x".to_owned()).category(),
            ErrorCategory::ServerFault
        );
    }

    #[test]
    fn test_user_message_hides_internals() {
        let error = ConvertError::RenderEngineError("/usr/bin/chromium exited 127".to_owned());
        assert!(!error.user_message().contains("chromium"));
        assert!(error.to_string().contains("chromium"));
    }

    #[test]
    fn test_too_large_message_names_limit() {
        let error = ConvertError::InputTooLarge {
            size: 2 * 1024 * 1024,
            limit: 1024 * 1024,
        };
        assert!(error.user_message().contains("1 MiB"));
    }

    #[test]
    fn test_from_pdf_error() {
        assert_eq!(
            ConvertError::from(PdfError::Timeout(Duration::from_secs(1))),
            ConvertError::RenderEngineTimeout
        );
        assert!(matches!(
            ConvertError::from(PdfError::Engine(EngineError::Launch("no chrome".to_owned()))),
            ConvertError::RenderEngineError(message) if message.contains("no chrome")
        ));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MiB");
        assert_eq!(format_bytes(2048), "2 KiB");
        assert_eq!(format_bytes(1500), "1500 bytes");
    }

    #[test]
    fn test_retryable() {
        assert!(ConvertError::RenderEngineTimeout.is_retryable());
        assert!(!ConvertError::Forbidden.is_retryable());
    }
}
