//! Sanitizing Markdown parser with HTML and plain-text renderers.
//!
//! Parsing happens in two stages:
//!
//! 1. pulldown-cmark events (GFM tables, task lists, strikethrough,
//!    autolinks) are folded into a [`Block`] tree. Raw HTML becomes generic
//!    elements, parsed with html5ever for block HTML.
//! 2. The sanitizer maps allow-listed elements onto typed nodes, unwraps
//!    unknown containers, removes dangerous elements with their content and
//!    drops unsafe URLs. Its output, [`SanitizedDocument`], is the only input
//!    the renderers accept.
//!
//! Parsing is total: malformed input degrades to literal text and is
//! reported through [`ParseDegraded`] warnings, never as an error.
//!
//! # Example
//!
//! ```
//! use mdexport_markdown::{parse_markdown, render_html, render_text};
//!
//! let parsed = parse_markdown("# Notes\n\n- [x] ship<script>x</script>");
//! assert_eq!(parsed.document.title().as_deref(), Some("Notes"));
//! assert!(!render_html(&parsed.document).contains("<script"));
//! assert_eq!(render_text(&parsed.document), "Notes\n\n- [x] ship\n");
//! ```

mod html;
mod html_import;
mod markdown;
mod sanitize;
mod text;
mod tree;
mod util;

use std::fmt;

pub use html::render_html;
pub use sanitize::is_safe_url;
pub use text::render_text;
pub use tree::{Alignment, Block, Inline, List, ListItem, RawElement, Table, plain_text};
pub use util::{escape_html, slugify};

/// Soft finding recorded while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum ParseDegraded {
    /// A fenced code block runs to the end of its container.
    UnterminatedFence { line: usize },
    /// An element was removed together with its content.
    RemovedElement { element: String },
    /// An attribute was removed from an element.
    RemovedAttribute { element: String, attribute: String },
    /// A link or image target used a disallowed scheme.
    UnsafeUrl { url: String },
}

impl fmt::Display for ParseDegraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedFence { line } => {
                write!(f, "code fence opened on line {line} is never closed")
            }
            Self::RemovedElement { element } => write!(f, "removed <{element}> element"),
            Self::RemovedAttribute { element, attribute } => {
                write!(f, "removed {attribute} attribute from <{element}>")
            }
            Self::UnsafeUrl { url } => write!(f, "removed unsafe URL {url:?}"),
        }
    }
}

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Anchor ID for linking.
    pub id: String,
}

/// Document tree that passed the allow-list sanitizer.
///
/// Contains only typed nodes: no generic elements, no event handler
/// attributes, no URL outside `http`, `https`, `mailto` or relative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedDocument {
    blocks: Vec<Block>,
}

impl SanitizedDocument {
    pub(crate) fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Top-level blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Whether the document has no content.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Text of the first level-1 heading.
    pub fn title(&self) -> Option<String> {
        self.headings()
            .find(|(level, _, _)| *level == 1)
            .map(|(_, _, children)| plain_text(children).trim().to_owned())
    }

    /// Table of contents entries for every heading, in document order.
    pub fn toc(&self) -> Vec<TocEntry> {
        self.headings()
            .map(|(level, id, children)| TocEntry {
                level,
                title: plain_text(children).trim().to_owned(),
                id: id.to_owned(),
            })
            .collect()
    }

    /// Copy of the document with every image replaced by its alt text.
    ///
    /// For renderers whose output is loaded on the server, where an image
    /// source would be fetched from the server's own network and disk.
    #[must_use]
    pub fn without_images(&self) -> Self {
        Self::new(
            self.blocks
                .iter()
                .cloned()
                .map(tree::block_without_images)
                .collect(),
        )
    }

    fn headings(&self) -> impl Iterator<Item = (u8, &str, &[Inline])> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading {
                level,
                id,
                children,
            } => Some((*level, id.as_str(), children.as_slice())),
            _ => None,
        })
    }
}

/// Result of parsing: the sanitized tree plus soft warnings.
#[derive(Clone, Debug)]
pub struct Parsed {
    pub document: SanitizedDocument,
    pub warnings: Vec<ParseDegraded>,
}

/// Parse Markdown into a sanitized document.
pub fn parse_markdown(markdown: &str) -> Parsed {
    let (blocks, mut warnings) = markdown::parse(markdown);
    let document = sanitize::sanitize(blocks, &mut warnings);
    Parsed { document, warnings }
}

/// Parse an HTML document or fragment into a sanitized document.
///
/// Uses the same allow-list as [`parse_markdown`], so rendering a document
/// and importing the HTML again yields the same tree.
pub fn parse_html(html: &str) -> Parsed {
    let blocks = html_import::import_blocks(html);
    let mut warnings = Vec::new();
    let document = sanitize::sanitize(blocks, &mut warnings);
    Parsed { document, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Render to HTML, import the HTML again, and compare the trees.
    fn assert_round_trip(markdown: &str) {
        let parsed = parse_markdown(markdown);
        let html = render_html(&parsed.document);
        let reparsed = parse_html(&html);
        assert_eq!(parsed.document, reparsed.document, "html: {html}");
        assert!(reparsed.warnings.is_empty(), "{:?}", reparsed.warnings);
    }

    #[test]
    fn test_round_trip_table() {
        assert_round_trip("| Left | Center | Right | None |\n|:--|:-:|--:|---|\n| a | *b* | `c` | d |\n| 1 | 2 | 3 | 4 |");
    }

    #[test]
    fn test_round_trip_task_lists() {
        assert_round_trip("- [x] done\n- [ ] todo\n  - [x] nested\n\n1. [ ] numbered");
    }

    #[test]
    fn test_round_trip_loose_task_list() {
        assert_round_trip("- [x] first\n\n- [ ] second");
    }

    #[test]
    fn test_round_trip_strikethrough() {
        assert_round_trip("This is ~~wrong~~ right, **~~both~~**.");
    }

    #[test]
    fn test_round_trip_fenced_code() {
        assert_round_trip("```rust\nfn main() {\n    println!(\"<hi> & bye\");\n}\n```\n\n```\n\n  indented first\n```");
    }

    #[test]
    fn test_round_trip_autolinks() {
        assert_round_trip("Visit <https://example.com>, https://rust-lang.org/learn or www.example.org.\nMail <me@example.com>.");
    }

    #[test]
    fn test_round_trip_mixed_document() {
        assert_round_trip(concat!(
            "# Title\n\n",
            "Intro with *emphasis*, **strong**, a [link](https://a.example \"t\") ",
            "and ![img](pic.png \"cap\").  \nHard break.\n\n",
            "> quote\n>\n> - inside\n\n",
            "3. three\n4. four\n\n",
            "---\n\n",
            "## Title\n",
        ));
    }

    #[test]
    fn test_script_removed_everywhere() {
        let parsed = parse_markdown(concat!(
            "<script>alert(1)</script>\n\n",
            "<div onclick=\"x()\"><iframe src=\"https://evil\"></iframe>ok</div>\n\n",
            "inline <script>alert(2)</script> and <a href=\"javascript:alert(3)\">link</a>\n\n",
            "[md](javascript:alert(4)) ![img](  JaVaScRiPt:alert(5))\n",
        ));
        let html = render_html(&parsed.document);
        for needle in ["<script", "alert(", "javascript", "JaVaScRiPt", "onclick", "iframe"] {
            assert!(!html.contains(needle), "{needle} in {html}");
        }
        assert!(html.contains("ok"));
        assert!(
            parsed
                .warnings
                .iter()
                .any(|w| matches!(w, ParseDegraded::UnsafeUrl { .. }))
        );
        assert!(
            parsed
                .warnings
                .iter()
                .any(|w| matches!(w, ParseDegraded::RemovedAttribute { attribute, .. } if attribute == "onclick"))
        );
    }

    #[test]
    fn test_without_images_keeps_alt_text() {
        let parsed = parse_markdown(concat!(
            "# Chart ![logo](/logo.png)\n\n",
            "See ![the *chart*](https://img.example/c.png \"Q1\") now.\n\n",
            "- [![badge](https://ci.example/b.svg)](https://ci.example)\n\n",
            "| a |\n|---|\n| ![](cell.png)x |\n",
        ));
        let document = parsed.document.without_images();
        let html = render_html(&document);

        assert!(!html.contains("<img"), "{html}");
        assert!(!html.contains("img.example"));
        assert!(html.contains("<p>See the chart now.</p>"), "{html}");
        assert!(html.contains(r#"<a href="https://ci.example">badge</a>"#), "{html}");
        assert!(html.contains("<td>x</td>"), "{html}");
        assert_eq!(document.title().as_deref(), Some("Chart logo"));
        assert!(render_html(&parsed.document).contains("<img"));
    }

    #[test]
    fn test_title_and_toc() {
        let parsed = parse_markdown("Intro\n\n# Guide\n\n## Setup\n\n## Setup\n\n# Second");
        assert_eq!(parsed.document.title().as_deref(), Some("Guide"));
        assert_eq!(
            parsed.document.toc(),
            vec![
                TocEntry {
                    level: 1,
                    title: "Guide".to_owned(),
                    id: "guide".to_owned()
                },
                TocEntry {
                    level: 2,
                    title: "Setup".to_owned(),
                    id: "setup".to_owned()
                },
                TocEntry {
                    level: 2,
                    title: "Setup".to_owned(),
                    id: "setup-1".to_owned()
                },
                TocEntry {
                    level: 1,
                    title: "Second".to_owned(),
                    id: "second".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_malformed_markdown_never_panics() {
        let inputs = [
            "",
            "```",
            "~~~\n",
            "| a |\n|---|\n| b | c | d |",
            "[unclosed](",
            "<div><p>unclosed",
            "</sup></div>",
            "* * *\n- \n1.\n> > >",
            "\u{0}\u{feff}#\t",
            "<a href=\"\u{1}javascript:x\">y</a>",
            "- [x]\n- [ ]",
            "<table><tr><td>no head</td></tr></table>",
            "<ul><p>stray</p><li>ok</li></ul>",
            "<pre></pre><h7>x</h7>",
        ];
        for input in inputs {
            let parsed = parse_markdown(input);
            let _ = render_html(&parsed.document);
            let _ = render_text(&parsed.document);
        }
    }

    #[test]
    fn test_unterminated_fence_reported() {
        let parsed = parse_markdown("# Doc\n\n```python\nprint('x')\n");
        assert_eq!(
            parsed.warnings,
            vec![ParseDegraded::UnterminatedFence { line: 3 }]
        );
        assert_eq!(
            render_html(&parsed.document),
            r#"<h1 id="doc">Doc</h1><pre><code class="language-python">print(&#x27;x&#x27;)
</code></pre>"#
        );
    }

    #[test]
    fn test_parse_degraded_display() {
        assert_eq!(
            ParseDegraded::UnterminatedFence { line: 4 }.to_string(),
            "code fence opened on line 4 is never closed"
        );
        assert_eq!(
            ParseDegraded::RemovedElement {
                element: "script".to_owned()
            }
            .to_string(),
            "removed <script> element"
        );
    }
}
