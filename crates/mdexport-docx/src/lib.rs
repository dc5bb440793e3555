//! Sanitized HTML to DOCX export.
//!
//! The input HTML goes through the same allow-list sanitizer as Markdown,
//! and the resulting tree is written as WordprocessingML:
//!
//! - headings use `Heading1`..`Heading6` with a bookmark per anchor id
//! - code blocks become one `CodeBlock` paragraph per line
//! - table rows carry `w:cantSplit`, the header row `w:tblHeader`
//! - every list has its own numbering instance, restarting at its start number
//!
//! Output is deterministic: fixed zip timestamps, no creation dates, and
//! hyperlink relationship ids assigned in order of first use.

mod body;
mod numbering;
mod package;
mod parts;

use mdexport_markdown::{SanitizedDocument, parse_html};

use crate::body::BodyWriter;

/// MIME type of DOCX packages.
pub const CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// DOCX packaging error.
#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    /// Zip archive could not be written.
    #[error("Failed to write DOCX archive")]
    Zip(#[from] zip::result::ZipError),
    /// I/O error while writing a part.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Convert HTML to DOCX bytes.
///
/// The HTML is sanitized first, so markup outside the allow-list never
/// reaches the document.
pub fn to_docx(html: &str) -> Result<Vec<u8>, DocxError> {
    let parsed = parse_html(html);
    if !parsed.warnings.is_empty() {
        tracing::debug!(
            warnings = parsed.warnings.len(),
            "Sanitizer changed DOCX input"
        );
    }
    render_docx(&parsed.document)
}

/// Write a sanitized document as DOCX bytes.
pub fn render_docx(document: &SanitizedDocument) -> Result<Vec<u8>, DocxError> {
    let writer = BodyWriter::write(document.blocks());
    let title = document.title();

    let document_xml = parts::document(writer.body());
    let styles = parts::styles();
    let numbering = writer.numbering().to_xml();
    let document_rels = parts::document_rels(writer.links());
    let core = parts::core_properties(title.as_deref());

    let bytes = package::write_package(&[
        ("[Content_Types].xml", parts::content_types()),
        ("_rels/.rels", parts::package_rels()),
        ("docProps/core.xml", &core),
        ("word/document.xml", &document_xml),
        ("word/styles.xml", &styles),
        ("word/numbering.xml", &numbering),
        ("word/_rels/document.xml.rels", &document_rels),
    ])?;

    tracing::debug!(bytes = bytes.len(), links = writer.links().len(), "DOCX written");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdexport_markdown::{parse_markdown, render_html};
    use pretty_assertions::assert_eq;
    use quick_xml::events::Event;
    use quick_xml::reader::Reader;
    use std::io::{Cursor, Read};

    fn markdown_to_docx(markdown: &str) -> Vec<u8> {
        to_docx(&render_html(&parse_markdown(markdown).document)).unwrap()
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    /// Element names (start and empty tags) in document order.
    fn element_names(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut names = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => {
                    names.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
                Event::Eof => break,
                _ => {}
            }
        }
        names
    }

    /// `w:val` of every `w:pStyle` in document order.
    fn paragraph_styles(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut styles = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Empty(e) if e.name().as_ref() == b"w:pStyle" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"w:val" {
                            styles.push(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        styles
    }

    #[test]
    fn test_package_parts() {
        let bytes = markdown_to_docx("# Title\n\nBody");
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_owned).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/numbering.xml",
                "word/styles.xml",
            ]
        );
        assert!(read_part(&bytes, "docProps/core.xml").contains("<dc:title>Title</dc:title>"));
    }

    #[test]
    fn test_every_table_row_cant_split() {
        let bytes = markdown_to_docx("| h1 | h2 |\n|---|:-:|\n| a | b |\n| c | d |\n| e | f |");
        let xml = read_part(&bytes, "word/document.xml");
        let names = element_names(&xml);

        let rows = names.iter().filter(|n| *n == "w:tr").count();
        let cant_split = names.iter().filter(|n| *n == "w:cantSplit").count();
        let header = names.iter().filter(|n| *n == "w:tblHeader").count();
        assert_eq!(rows, 4);
        assert_eq!(cant_split, rows);
        assert_eq!(header, 1);
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
    }

    #[test]
    fn test_block_styles() {
        let bytes = markdown_to_docx(
            "# One\n\n## Two\n\nText\n\n> quoted\n\n```\nx\ny\n```\n\n###### Six",
        );
        let xml = read_part(&bytes, "word/document.xml");
        assert_eq!(
            paragraph_styles(&xml),
            vec!["Heading1", "Heading2", "Quote", "CodeBlock", "CodeBlock", "Heading6"]
        );
    }

    #[test]
    fn test_ordered_lists_restart() {
        let bytes = markdown_to_docx("3. a\n4. b\n\nbreak\n\n1. c\n\n- d");
        let numbering = read_part(&bytes, "word/numbering.xml");
        assert!(numbering.contains(r#"<w:num w:numId="1"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="3"/>"#));
        assert!(numbering.contains(r#"<w:num w:numId="2"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/>"#));
        assert!(numbering.contains(r#"<w:num w:numId="3"><w:abstractNumId w:val="0"/></w:num>"#));
    }

    #[test]
    fn test_hyperlink_relationships() {
        let bytes = markdown_to_docx("[site](https://example.com) and <me@example.com>");
        let rels = read_part(&bytes, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Id="rId3""#) && rels.contains(r#"Target="https://example.com""#));
        assert!(rels.contains(r#"Target="mailto:me@example.com""#));
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains(r#"<w:hyperlink r:id="rId3">"#));
        assert!(xml.contains(r#"<w:hyperlink r:id="rId4">"#));
    }

    #[test]
    fn test_output_is_deterministic() {
        let markdown = "# Report\n\n| a |\n|---|\n| [x](https://x.example) |\n\n1. one\n2. two";
        assert_eq!(markdown_to_docx(markdown), markdown_to_docx(markdown));
    }

    #[test]
    fn test_unsafe_html_never_reaches_document() {
        let bytes = to_docx(concat!(
            "<p>ok<script>alert(1)</script></p>",
            "<img src=x onerror=\"alert(2)\" alt=\"pic\">",
            "<a href=\"javascript:alert(3)\">click</a>",
        ))
        .unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        let rels = read_part(&bytes, "word/_rels/document.xml.rels");
        for needle in ["alert", "script", "javascript", "onerror"] {
            assert!(!xml.contains(needle), "{needle} in document");
            assert!(!rels.contains(needle), "{needle} in rels");
        }
        assert!(xml.contains("click"));
        assert!(xml.contains("pic"));
    }

    #[test]
    fn test_empty_document() {
        let bytes = to_docx("").unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(xml.contains("<w:body><w:sectPr>"));
    }
}
