//! HTML to unsanitized tree conversion.
//!
//! Parses HTML with html5ever and maps the DOM onto generic
//! [`Block::Element`] / [`Inline::Element`] nodes. Nothing is filtered here;
//! the sanitizer decides what survives.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::tree::{Block, Inline, RawElement, push_inline};

/// Elements that start a new block when they appear in block context.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "li", "main", "nav", "ol", "p", "pre", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Parse an HTML document or fragment into unsanitized blocks.
pub(crate) fn import_blocks(html: &str) -> Vec<Block> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let mut blocks = Vec::new();
    for child in dom.document.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) {
            block_node(child, &mut blocks, &mut Vec::new());
        }
    }
    blocks
}

/// Convert the children of a block container.
fn block_children(handle: &Handle) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut run = Vec::new();
    for child in handle.children.borrow().iter() {
        block_node(child, &mut blocks, &mut run);
    }
    flush_run(&mut blocks, &mut run);
    blocks
}

/// Convert one node in block context.
///
/// Inline content accumulates in `run` until the next block element.
fn block_node(handle: &Handle, blocks: &mut Vec<Block>, run: &mut Vec<Inline>) {
    let NodeData::Element { name, attrs, .. } = &handle.data else {
        inline_node(handle, run);
        return;
    };
    let tag = name.local.as_ref().to_ascii_lowercase();
    if !BLOCK_TAGS.contains(&tag.as_str()) {
        inline_node(handle, run);
        return;
    }

    flush_run(blocks, run);
    let attrs = attrs
        .borrow()
        .iter()
        .map(|a| (a.name.local.to_string(), a.value.to_string()))
        .collect();
    let children = if tag == "pre" {
        // Whitespace is content inside <pre>.
        let inlines = inline_children(handle);
        if inlines.is_empty() {
            Vec::new()
        } else {
            vec![Block::Plain(inlines)]
        }
    } else {
        block_children(handle)
    };
    blocks.push(Block::Element(RawElement {
        tag,
        attrs,
        children,
    }));
}

/// Close an inline run, dropping it when it is only inter-tag whitespace.
fn flush_run(blocks: &mut Vec<Block>, run: &mut Vec<Inline>) {
    if run.is_empty() {
        return;
    }
    let inlines = std::mem::take(run);
    let whitespace_only = inlines
        .iter()
        .all(|i| matches!(i, Inline::Text(t) if t.trim().is_empty()));
    if !whitespace_only {
        blocks.push(Block::Plain(inlines));
    }
}

fn inline_children(handle: &Handle) -> Vec<Inline> {
    let mut out = Vec::new();
    for child in handle.children.borrow().iter() {
        inline_node(child, &mut out);
    }
    out
}

/// Convert one node in inline context.
fn inline_node(handle: &Handle, out: &mut Vec<Inline>) {
    match &handle.data {
        NodeData::Text { contents } => {
            push_inline(out, Inline::Text(contents.borrow().to_string()));
        }
        NodeData::Element { name, attrs, .. } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect();
            out.push(Inline::Element(RawElement {
                tag: name.local.as_ref().to_ascii_lowercase(),
                attrs,
                children: inline_children(handle),
            }));
        }
        // Comments, doctypes, processing instructions
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element<T>(tag: &str, children: Vec<T>) -> RawElement<T> {
        RawElement {
            tag: tag.to_owned(),
            attrs: Vec::new(),
            children,
        }
    }

    /// Strip the implied html/head/body wrappers.
    fn body(html: &str) -> Vec<Block> {
        let blocks = import_blocks(html);
        let Some(Block::Element(root)) = blocks.into_iter().next() else {
            panic!("expected html root");
        };
        assert_eq!(root.tag, "html");
        let Some(Block::Element(body)) = root.children.into_iter().nth(1) else {
            panic!("expected body");
        };
        assert_eq!(body.tag, "body");
        body.children
    }

    #[test]
    fn test_paragraph_with_inline() {
        assert_eq!(
            body("<p>a <strong>b</strong></p>"),
            vec![Block::Element(element(
                "p",
                vec![Block::Plain(vec![
                    Inline::Text("a ".to_owned()),
                    Inline::Element(element("strong", vec![Inline::Text("b".to_owned())])),
                ])]
            ))]
        );
    }

    #[test]
    fn test_whitespace_between_blocks_dropped() {
        let blocks = body("<ul>\n  <li>x</li>\n</ul>");
        let Block::Element(list) = &blocks[0] else {
            panic!("expected ul");
        };
        assert_eq!(list.children.len(), 1);
    }

    #[test]
    fn test_pre_keeps_whitespace() {
        let blocks = body("<pre><code>  a\n  b\n</code></pre>");
        let Block::Element(pre) = &blocks[0] else {
            panic!("expected pre");
        };
        let Block::Plain(inlines) = &pre.children[0] else {
            panic!("expected inline run");
        };
        let Inline::Element(code) = &inlines[0] else {
            panic!("expected code");
        };
        assert_eq!(code.children, vec![Inline::Text("  a\n  b\n".to_owned())]);
    }

    #[test]
    fn test_attributes_kept() {
        let blocks = body(r#"<p><a href="/x" onclick="evil()">y</a></p>"#);
        let Block::Element(p) = &blocks[0] else {
            panic!("expected p");
        };
        let Block::Plain(inlines) = &p.children[0] else {
            panic!("expected run");
        };
        let Inline::Element(a) = &inlines[0] else {
            panic!("expected a");
        };
        assert_eq!(a.attr("href"), Some("/x"));
        assert_eq!(a.attr("onclick"), Some("evil()"));
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            body("<p>a<!-- hidden -->b</p>"),
            vec![Block::Element(element(
                "p",
                vec![Block::Plain(vec![Inline::Text("ab".to_owned())])]
            ))]
        );
    }
}
