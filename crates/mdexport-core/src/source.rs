//! Document sources.

use std::path::Path;

use crate::error::ConvertError;

/// File extensions accepted for upload.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Markdown input: an uploaded file or pasted text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentSource {
    File {
        name: String,
        /// Size of the upload in bytes.
        size: usize,
        text: String,
    },
    Pasted { text: String },
}

impl DocumentSource {
    /// Validate an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidInputType`] if the extension is not
    /// accepted or the content is not UTF-8.
    pub fn from_file(name: &str, bytes: Vec<u8>) -> Result<Self, ConvertError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        if !extension
            .as_deref()
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext))
        {
            return Err(ConvertError::InvalidInputType(format!(
                "expected a .md, .markdown or .txt file, got {name:?}"
            )));
        }

        let size = bytes.len();
        let mut text = String::from_utf8(bytes)
            .map_err(|_| ConvertError::InvalidInputType("file is not valid UTF-8".to_owned()))?;
        if let Some(stripped) = text.strip_prefix('\u{feff}') {
            text = stripped.to_owned();
        }

        Ok(Self::File {
            name: name.to_owned(),
            size,
            text,
        })
    }

    /// Wrap pasted text.
    pub fn pasted(text: impl Into<String>) -> Self {
        Self::Pasted { text: text.into() }
    }

    /// Markdown text.
    pub fn text(&self) -> &str {
        match self {
            Self::File { text, .. } | Self::Pasted { text } => text,
        }
    }

    /// Size in bytes: the upload size for files, UTF-8 length for pasted text.
    pub fn size(&self) -> usize {
        match self {
            Self::File { size, .. } => *size,
            Self::Pasted { text } => text.len(),
        }
    }

    /// Original file name, if uploaded.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::File { name, .. } => Some(name),
            Self::Pasted { .. } => None,
        }
    }

    /// File name without directory or extension.
    pub(crate) fn file_stem(&self) -> Option<&str> {
        self.file_name()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Pasted { .. } => "pasted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_accepts_markdown_extensions() {
        for name in ["a.md", "b.MARKDOWN", "notes.txt"] {
            let source = DocumentSource::from_file(name, b"# hi".to_vec()).unwrap();
            assert_eq!(source.text(), "# hi");
            assert_eq!(source.size(), 4);
        }
    }

    #[test]
    fn test_from_file_rejects_other_types() {
        for name in ["a.pdf", "README", "x.md.exe"] {
            let err = DocumentSource::from_file(name, b"x".to_vec()).unwrap_err();
            assert!(matches!(err, ConvertError::InvalidInputType(_)), "{name}");
        }
    }

    #[test]
    fn test_from_file_rejects_invalid_utf8() {
        let err = DocumentSource::from_file("a.md", vec![0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInputType(_)));
    }

    #[test]
    fn test_from_file_strips_bom_keeps_size() {
        let source = DocumentSource::from_file("a.md", "\u{feff}# T".as_bytes().to_vec()).unwrap();
        assert_eq!(source.text(), "# T");
        assert_eq!(source.size(), 6);
    }

    #[test]
    fn test_pasted_size_is_utf8_length() {
        let source = DocumentSource::pasted("héllo");
        assert_eq!(source.size(), 6);
        assert_eq!(source.file_name(), None);
        assert_eq!(source.file_stem(), None);
    }

    #[test]
    fn test_file_stem() {
        let source = DocumentSource::from_file("docs/guide.md", Vec::new()).unwrap();
        assert_eq!(source.file_stem(), Some("guide"));
    }
}
