//! Document tree shared by the parser, the sanitizer and the renderers.
//!
//! The parser produces blocks that may still contain raw HTML as generic
//! [`Block::Element`] / [`Inline::Element`] nodes. The sanitizer replaces
//! every generic element with typed nodes (or removes it), so a
//! [`SanitizedDocument`](crate::SanitizedDocument) never contains one.

/// Column alignment of a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    /// No explicit alignment.
    #[default]
    None,
    /// `text-align:left`.
    Left,
    /// `text-align:center`.
    Center,
    /// `text-align:right`.
    Right,
}

impl Alignment {
    /// CSS keyword, or `None` for an unaligned column.
    pub fn css(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }

    pub(crate) fn from_css(value: &str) -> Self {
        match value {
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            _ => Self::None,
        }
    }
}

impl From<pulldown_cmark::Alignment> for Alignment {
    fn from(value: pulldown_cmark::Alignment) -> Self {
        match value {
            pulldown_cmark::Alignment::None => Self::None,
            pulldown_cmark::Alignment::Left => Self::Left,
            pulldown_cmark::Alignment::Center => Self::Center,
            pulldown_cmark::Alignment::Right => Self::Right,
        }
    }
}

/// Raw HTML element awaiting sanitization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawElement<T> {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<T>,
}

impl<T> RawElement<T> {
    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Block-level node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// `<h1>`..`<h6>` with a unique anchor id.
    Heading {
        level: u8,
        id: String,
        children: Vec<Inline>,
    },
    /// `<p>`.
    Paragraph(Vec<Inline>),
    /// Inline run without a paragraph wrapper (tight list items).
    Plain(Vec<Inline>),
    /// Fenced or indented code.
    CodeBlock {
        lang: Option<String>,
        content: String,
    },
    /// `<blockquote>`.
    BlockQuote(Vec<Block>),
    /// `<ul>` / `<ol>`.
    List(List),
    /// `<table>`.
    Table(Table),
    /// `<hr>`.
    ThematicBreak,
    /// Unsanitized HTML element.
    Element(RawElement<Block>),
}

/// Ordered or unordered list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    /// First item number (1 for unordered lists).
    pub start: u64,
    /// Items hold inline runs rather than paragraphs.
    pub tight: bool,
    pub items: Vec<ListItem>,
}

impl List {
    pub(crate) fn new(ordered: bool, start: u64, items: Vec<ListItem>) -> Self {
        let tight = items
            .iter()
            .all(|item| !item.blocks.iter().any(|b| matches!(b, Block::Paragraph(_))));
        Self {
            ordered,
            start,
            tight,
            items,
        }
    }
}

/// List item with an optional task checkbox.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListItem {
    /// `Some(checked)` for task list items.
    pub task: Option<bool>,
    pub blocks: Vec<Block>,
}

/// Table with a header row and body rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    /// Header cells (empty when the table has no header).
    pub head: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

impl Table {
    /// Alignment of the given column.
    pub fn alignment(&self, column: usize) -> Alignment {
        self.alignments.get(column).copied().unwrap_or_default()
    }
}

/// Inline node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Superscript(Vec<Inline>),
    Subscript(Vec<Inline>),
    Link {
        href: String,
        title: Option<String>,
        children: Vec<Inline>,
    },
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    HardBreak,
    /// Unsanitized HTML element.
    Element(RawElement<Inline>),
}

/// Append an inline, merging adjacent text nodes.
pub(crate) fn push_inline(out: &mut Vec<Inline>, inline: Inline) {
    if let Inline::Text(text) = &inline {
        if text.is_empty() {
            return;
        }
        if let Some(Inline::Text(last)) = out.last_mut() {
            last.push_str(text);
            return;
        }
    }
    out.push(inline);
}

/// Append a run of inlines, merging text at the seam.
pub(crate) fn extend_inlines(out: &mut Vec<Inline>, inlines: Vec<Inline>) {
    for inline in inlines {
        push_inline(out, inline);
    }
}

/// Concatenated text content, ignoring formatting.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_text(inlines, &mut out);
    out
}

fn collect_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Superscript(children)
            | Inline::Subscript(children)
            | Inline::Link { children, .. } => collect_text(children, out),
            Inline::Element(element) => collect_text(&element.children, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::HardBreak => out.push('\n'),
        }
    }
}

/// Flatten blocks into inline content.
///
/// Used where HTML nests block elements in a position that only accepts
/// inlines (table cells, headings, paragraphs).
pub(crate) fn blocks_into_inlines(blocks: Vec<Block>) -> Vec<Inline> {
    let mut out = Vec::new();
    for block in blocks {
        match block {
            Block::Heading { children, .. } | Block::Paragraph(children) | Block::Plain(children) => {
                extend_inlines(&mut out, children);
            }
            Block::CodeBlock { content, .. } => push_inline(&mut out, Inline::Code(content)),
            Block::BlockQuote(children) => extend_inlines(&mut out, blocks_into_inlines(children)),
            Block::List(list) => {
                for item in list.items {
                    extend_inlines(&mut out, blocks_into_inlines(item.blocks));
                }
            }
            Block::Table(table) => {
                for cell in table.head.into_iter().chain(table.rows.into_iter().flatten()) {
                    extend_inlines(&mut out, cell);
                }
            }
            Block::ThematicBreak => {}
            Block::Element(element) => out.push(Inline::Element(RawElement {
                tag: element.tag,
                attrs: element.attrs,
                children: blocks_into_inlines(element.children),
            })),
        }
    }
    out
}

/// Replace every image with its alt text, keeping the rest of the tree.
pub(crate) fn block_without_images(block: Block) -> Block {
    match block {
        Block::Heading {
            level,
            id,
            children,
        } => Block::Heading {
            level,
            id,
            children: inlines_without_images(children),
        },
        Block::Paragraph(children) => Block::Paragraph(inlines_without_images(children)),
        Block::Plain(children) => Block::Plain(inlines_without_images(children)),
        Block::BlockQuote(children) => {
            Block::BlockQuote(children.into_iter().map(block_without_images).collect())
        }
        Block::List(mut list) => {
            for item in &mut list.items {
                let blocks = std::mem::take(&mut item.blocks);
                item.blocks = blocks.into_iter().map(block_without_images).collect();
            }
            Block::List(list)
        }
        Block::Table(table) => Block::Table(Table {
            alignments: table.alignments,
            head: table.head.into_iter().map(inlines_without_images).collect(),
            rows: table
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(inlines_without_images).collect())
                .collect(),
        }),
        Block::Element(element) => Block::Element(RawElement {
            tag: element.tag,
            attrs: element.attrs,
            children: element.children.into_iter().map(block_without_images).collect(),
        }),
        block @ (Block::CodeBlock { .. } | Block::ThematicBreak) => block,
    }
}

fn inlines_without_images(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(inlines.len());
    for inline in inlines {
        let inline = match inline {
            Inline::Image { alt, .. } => Inline::Text(alt),
            Inline::Emphasis(children) => Inline::Emphasis(inlines_without_images(children)),
            Inline::Strong(children) => Inline::Strong(inlines_without_images(children)),
            Inline::Strikethrough(children) => {
                Inline::Strikethrough(inlines_without_images(children))
            }
            Inline::Superscript(children) => Inline::Superscript(inlines_without_images(children)),
            Inline::Subscript(children) => Inline::Subscript(inlines_without_images(children)),
            Inline::Link {
                href,
                title,
                children,
            } => Inline::Link {
                href,
                title,
                children: inlines_without_images(children),
            },
            Inline::Element(element) => Inline::Element(RawElement {
                tag: element.tag,
                attrs: element.attrs,
                children: inlines_without_images(element.children),
            }),
            inline @ (Inline::Text(_) | Inline::Code(_) | Inline::HardBreak) => inline,
        };
        push_inline(&mut out, inline);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_inline_merges_text() {
        let mut out = Vec::new();
        push_inline(&mut out, Inline::Text("a".to_owned()));
        push_inline(&mut out, Inline::Text("b".to_owned()));
        push_inline(&mut out, Inline::HardBreak);
        push_inline(&mut out, Inline::Text(String::new()));
        assert_eq!(out, vec![Inline::Text("ab".to_owned()), Inline::HardBreak]);
    }

    #[test]
    fn test_plain_text_nested() {
        let inlines = vec![
            Inline::Text("a ".to_owned()),
            Inline::Strong(vec![Inline::Emphasis(vec![Inline::Text("b".to_owned())])]),
            Inline::Code(" c".to_owned()),
        ];
        assert_eq!(plain_text(&inlines), "a b c");
    }

    #[test]
    fn test_list_tightness() {
        let tight = List::new(
            false,
            1,
            vec![ListItem {
                task: None,
                blocks: vec![Block::Plain(vec![Inline::Text("x".to_owned())])],
            }],
        );
        assert!(tight.tight);

        let loose = List::new(
            false,
            1,
            vec![ListItem {
                task: None,
                blocks: vec![Block::Paragraph(vec![Inline::Text("x".to_owned())])],
            }],
        );
        assert!(!loose.tight);
    }

    #[test]
    fn test_table_alignment_out_of_range() {
        let table = Table {
            alignments: vec![Alignment::Right],
            ..Table::default()
        };
        assert_eq!(table.alignment(0), Alignment::Right);
        assert_eq!(table.alignment(3), Alignment::None);
    }
}
