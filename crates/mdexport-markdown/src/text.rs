//! Plain-text renderer.

use crate::SanitizedDocument;
use crate::tree::{Block, Inline, List};

/// Render a sanitized document as plain text.
///
/// Top-level blocks are separated by a blank line. List nesting is kept as
/// indentation, task items carry `[x]` / `[ ]` markers, and links whose text
/// differs from their target are written as `text (url)`.
pub fn render_text(document: &SanitizedDocument) -> String {
    let mut out = blocks_text(document.blocks(), "\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn blocks_text(blocks: &[Block], separator: &str) -> String {
    blocks
        .iter()
        .map(block_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn block_text(block: &Block) -> String {
    match block {
        Block::Heading { children, .. } | Block::Paragraph(children) | Block::Plain(children) => {
            inline_text(children)
        }
        Block::CodeBlock { content, .. } => content.trim_end_matches('\n').to_owned(),
        Block::BlockQuote(children) => blocks_text(children, "\n\n")
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_owned()
                } else {
                    format!("> {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::List(list) => list_text(list),
        Block::Table(table) => std::iter::once(&table.head)
            .filter(|head| !head.is_empty())
            .chain(&table.rows)
            .map(|row| {
                row.iter()
                    .map(|cell| inline_text(cell))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::ThematicBreak => "---".to_owned(),
        Block::Element(element) => blocks_text(&element.children, "\n\n"),
    }
}

fn list_text(list: &List) -> String {
    let separator = if list.tight { "\n" } else { "\n\n" };
    let mut number = list.start;
    let mut items = Vec::with_capacity(list.items.len());
    for item in &list.items {
        let mut marker = if list.ordered {
            format!("{number}. ")
        } else {
            "- ".to_owned()
        };
        number += 1;
        match item.task {
            Some(true) => marker.push_str("[x] "),
            Some(false) => marker.push_str("[ ] "),
            None => {}
        }
        let indent = " ".repeat(if list.ordered { marker.len().min(4) } else { 2 });
        let body = blocks_text(&item.blocks, separator);

        let mut text = String::new();
        for (i, line) in body.lines().enumerate() {
            if i == 0 {
                text.push_str(&marker);
            } else {
                text.push('\n');
                if !line.is_empty() {
                    text.push_str(&indent);
                }
            }
            text.push_str(line);
        }
        if text.is_empty() {
            text.push_str(marker.trim_end());
        }
        items.push(text);
    }
    items.join(separator)
}

fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        push_inline_text(inline, &mut out);
    }
    out
}

fn push_inline_text(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text(text) | Inline::Code(text) => out.push_str(text),
        Inline::Emphasis(children)
        | Inline::Strong(children)
        | Inline::Strikethrough(children)
        | Inline::Superscript(children)
        | Inline::Subscript(children) => out.push_str(&inline_text(children)),
        Inline::Link { href, children, .. } => {
            let text = inline_text(children);
            let target = href.strip_prefix("mailto:").unwrap_or(href);
            out.push_str(&text);
            if text != target && !href.starts_with('#') {
                out.push_str(" (");
                out.push_str(href);
                out.push(')');
            }
        }
        Inline::Image { alt, .. } => out.push_str(alt),
        Inline::HardBreak => out.push('\n'),
        Inline::Element(element) => out.push_str(&inline_text(&element.children)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_markdown;
    use pretty_assertions::assert_eq;

    fn text(md: &str) -> String {
        render_text(&parse_markdown(md).document)
    }

    #[test]
    fn test_title_and_task_list() {
        let out = text("# Title\n\n- [x] done\n- [ ] todo");
        assert_eq!(out, "Title\n\n- [x] done\n- [ ] todo\n");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Title");
        assert!(lines[2].starts_with("- [x] "));
        assert!(lines[3].starts_with("- [ ] "));
    }

    #[test]
    fn test_formatting_stripped() {
        assert_eq!(
            text("Some **bold**, *em*, ~~gone~~ and `code`."),
            "Some bold, em, gone and code.\n"
        );
    }

    #[test]
    fn test_nested_ordered_list() {
        assert_eq!(
            text("1. one\n   - a\n   - b\n2. two"),
            "1. one\n   - a\n   - b\n2. two\n"
        );
    }

    #[test]
    fn test_nested_unordered_list() {
        assert_eq!(text("- a\n  - b\n    - c"), "- a\n  - b\n    - c\n");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            text("[docs](https://docs.rs) and https://example.com and [top](#top)"),
            "docs (https://docs.rs) and https://example.com and top\n"
        );
    }

    #[test]
    fn test_image_alt() {
        assert_eq!(text("![a diagram](d.png)"), "a diagram\n");
    }

    #[test]
    fn test_table_rows() {
        assert_eq!(
            text("| a | b |\n|---|---|\n| 1 | 2 |"),
            "a | b\n1 | 2\n"
        );
    }

    #[test]
    fn test_blockquote_and_code() {
        assert_eq!(
            text("> quoted\n\n```\nlet x = 1;\n```"),
            "> quoted\n\nlet x = 1;\n"
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(text(""), "");
    }
}
