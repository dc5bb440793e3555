//! HTML renderer.
//!
//! Produces a deterministic HTML5 fragment with no whitespace between tags,
//! so that importing the output again yields the same tree.

use std::fmt::Write;

use crate::SanitizedDocument;
use crate::tree::{Block, Inline, List, Table};
use crate::util::escape_html;

/// Render a sanitized document to an HTML5 fragment.
///
/// # Example
///
/// ```
/// use mdexport_markdown::{parse_markdown, render_html};
///
/// let parsed = parse_markdown("**bold** and `code`");
/// assert_eq!(
///     render_html(&parsed.document),
///     "<p><strong>bold</strong> and <code>code</code></p>"
/// );
/// ```
pub fn render_html(document: &SanitizedDocument) -> String {
    let mut out = String::with_capacity(4096);
    blocks(document.blocks(), &mut out);
    out
}

fn blocks(blocks: &[Block], out: &mut String) {
    for block in blocks {
        self::block(block, out);
    }
}

fn block(block: &Block, out: &mut String) {
    match block {
        Block::Heading {
            level,
            id,
            children,
        } => {
            write!(out, r#"<h{level} id="{}">"#, escape_html(id)).unwrap();
            inlines(children, out);
            write!(out, "</h{level}>").unwrap();
        }
        Block::Paragraph(children) => {
            out.push_str("<p>");
            inlines(children, out);
            out.push_str("</p>");
        }
        Block::Plain(children) => inlines(children, out),
        Block::CodeBlock { lang, content } => {
            if let Some(lang) = lang {
                write!(
                    out,
                    r#"<pre><code class="language-{}">{}</code></pre>"#,
                    escape_html(lang),
                    escape_html(content)
                )
                .unwrap();
            } else {
                write!(out, "<pre><code>{}</code></pre>", escape_html(content)).unwrap();
            }
        }
        Block::BlockQuote(children) => {
            out.push_str("<blockquote>");
            blocks(children, out);
            out.push_str("</blockquote>");
        }
        Block::List(list) => self::list(list, out),
        Block::Table(table) => self::table(table, out),
        Block::ThematicBreak => out.push_str("<hr>"),
        Block::Element(element) => blocks(&element.children, out),
    }
}

fn list(list: &List, out: &mut String) {
    let tag = if list.ordered { "ol" } else { "ul" };
    if list.ordered && list.start != 1 {
        write!(out, r#"<ol start="{}">"#, list.start).unwrap();
    } else {
        write!(out, "<{tag}>").unwrap();
    }
    for item in &list.items {
        out.push_str("<li>");
        match item.task {
            Some(true) => out.push_str(r#"<input type="checkbox" disabled checked>"#),
            Some(false) => out.push_str(r#"<input type="checkbox" disabled>"#),
            None => {}
        }
        blocks(&item.blocks, out);
        out.push_str("</li>");
    }
    write!(out, "</{tag}>").unwrap();
}

fn table(table: &Table, out: &mut String) {
    out.push_str("<table>");
    if !table.head.is_empty() {
        out.push_str("<thead>");
        row(table, &table.head, "th", out);
        out.push_str("</thead>");
    }
    if !table.rows.is_empty() {
        out.push_str("<tbody>");
        for cells in &table.rows {
            row(table, cells, "td", out);
        }
        out.push_str("</tbody>");
    }
    out.push_str("</table>");
}

fn row(table: &Table, cells: &[Vec<Inline>], tag: &str, out: &mut String) {
    out.push_str("<tr>");
    for (column, cell) in cells.iter().enumerate() {
        match table.alignment(column).css() {
            Some(align) => write!(out, r#"<{tag} style="text-align:{align}">"#).unwrap(),
            None => write!(out, "<{tag}>").unwrap(),
        }
        inlines(cell, out);
        write!(out, "</{tag}>").unwrap();
    }
    out.push_str("</tr>");
}

fn inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        self::inline(inline, out);
    }
}

fn wrap(tag: &str, children: &[Inline], out: &mut String) {
    write!(out, "<{tag}>").unwrap();
    inlines(children, out);
    write!(out, "</{tag}>").unwrap();
}

fn inline(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_html(text)),
        Inline::Code(code) => write!(out, "<code>{}</code>", escape_html(code)).unwrap(),
        Inline::Emphasis(children) => wrap("em", children, out),
        Inline::Strong(children) => wrap("strong", children, out),
        Inline::Strikethrough(children) => wrap("s", children, out),
        Inline::Superscript(children) => wrap("sup", children, out),
        Inline::Subscript(children) => wrap("sub", children, out),
        Inline::Link {
            href,
            title,
            children,
        } => {
            write!(out, r#"<a href="{}""#, escape_html(href)).unwrap();
            if let Some(title) = title {
                write!(out, r#" title="{}""#, escape_html(title)).unwrap();
            }
            out.push('>');
            inlines(children, out);
            out.push_str("</a>");
        }
        Inline::Image { src, alt, title } => {
            write!(
                out,
                r#"<img src="{}" alt="{}""#,
                escape_html(src),
                escape_html(alt)
            )
            .unwrap();
            if let Some(title) = title {
                write!(out, r#" title="{}""#, escape_html(title)).unwrap();
            }
            out.push('>');
        }
        Inline::HardBreak => out.push_str("<br>"),
        Inline::Element(element) => inlines(&element.children, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_html, parse_markdown};
    use pretty_assertions::assert_eq;

    fn render(md: &str) -> String {
        render_html(&parse_markdown(md).document)
    }

    #[test]
    fn test_bold_and_code() {
        assert_eq!(
            render("**bold** and `code`"),
            "<p><strong>bold</strong> and <code>code</code></p>"
        );
    }

    #[test]
    fn test_heading_ids() {
        assert_eq!(
            render("# Hello World\n\n## Hello World"),
            r#"<h1 id="hello-world">Hello World</h1><h2 id="hello-world-1">Hello World</h2>"#
        );
    }

    #[test]
    fn test_task_list() {
        assert_eq!(
            render("- [x] done\n- [ ] todo"),
            r#"<ul><li><input type="checkbox" disabled checked>done</li><li><input type="checkbox" disabled>todo</li></ul>"#
        );
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(
            render("5. five\n6. six"),
            r#"<ol start="5"><li>five</li><li>six</li></ol>"#
        );
    }

    #[test]
    fn test_table_alignment() {
        assert_eq!(
            render("| a | b |\n|:-:|---|\n| 1 | 2 |"),
            concat!(
                "<table><thead><tr>",
                r#"<th style="text-align:center">a</th><th>b</th>"#,
                "</tr></thead><tbody><tr>",
                r#"<td style="text-align:center">1</td><td>2</td>"#,
                "</tr></tbody></table>"
            )
        );
    }

    #[test]
    fn test_code_block_escaped() {
        assert_eq!(
            render("```html\n<b>&</b>\n```"),
            r#"<pre><code class="language-html">&lt;b&gt;&amp;&lt;/b&gt;
</code></pre>"#
        );
    }

    #[test]
    fn test_strikethrough_and_link_title() {
        assert_eq!(
            render(r#"~~old~~ [x](https://a.example "T")"#),
            r#"<p><s>old</s> <a href="https://a.example" title="T">x</a></p>"#
        );
    }

    #[test]
    fn test_script_never_rendered() {
        let html = render(
            "<script>alert(1)</script>\n\nhi <img src=x onerror=alert(1)> [a](javascript:alert(1))",
        );
        assert!(!html.contains("<script"));
        assert!(!html.contains("onerror"));
        assert!(!html.contains("javascript:"));
        assert_eq!(html, r#"<p>hi <img src="x" alt=""> a</p>"#);
    }

    #[test]
    fn test_html_import_renders_same() {
        let html = r#"<h2 id="x">Title</h2><p>a <b>b</b> <i>c</i></p>"#;
        assert_eq!(
            render_html(&parse_html(html).document),
            r#"<h2 id="title">Title</h2><p>a <strong>b</strong> <em>c</em></p>"#
        );
    }
}
