//! Allow-list sanitizer.
//!
//! The only code path that produces a [`SanitizedDocument`]. Generic HTML
//! elements are mapped onto typed nodes, unknown containers are unwrapped,
//! and dangerous elements are removed together with their content. Every
//! `href`/`src` is checked against the safe scheme list.

use std::sync::LazyLock;

use regex::Regex;

use crate::tree::{
    Alignment, Block, Inline, List, ListItem, RawElement, Table, blocks_into_inlines,
    extend_inlines, plain_text, push_inline,
};
use crate::util::HeadingIds;
use crate::{ParseDegraded, SanitizedDocument};

/// Elements removed together with everything inside them.
const REMOVED_TAGS: &[&str] = &[
    "applet", "base", "button", "embed", "frame", "frameset", "iframe", "input", "link", "math",
    "meta", "noscript", "object", "option", "script", "select", "style", "svg", "template",
    "textarea", "title",
];

/// URL schemes allowed in `href` and `src`.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Regex to match `text-align` in a cell style attribute.
static TEXT_ALIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)text-align\s*:\s*(left|center|right)").unwrap());

/// Check whether a URL may appear in `href` or `src`.
///
/// ASCII whitespace and control characters are ignored when locating the
/// scheme, matching how browsers resolve `java\tscript:`.
pub fn is_safe_url(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    let Some(colon) = compact.find(':') else {
        return true;
    };
    let candidate = &compact[..colon];
    if candidate.contains(['/', '?', '#']) {
        // Colon belongs to a path, query or fragment: relative URL.
        return true;
    }
    SAFE_SCHEMES
        .iter()
        .any(|scheme| candidate.eq_ignore_ascii_case(scheme))
}

/// Check a code block language against a conservative charset.
fn is_valid_language(lang: &str) -> bool {
    !lang.is_empty()
        && lang.len() <= 64
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '#' | '.' | '_'))
}

/// Sanitize unsanitized blocks into a [`SanitizedDocument`].
pub(crate) fn sanitize(blocks: Vec<Block>, warnings: &mut Vec<ParseDegraded>) -> SanitizedDocument {
    let mut sanitizer = Sanitizer {
        ids: HeadingIds::default(),
        warnings,
    };
    let blocks = sanitizer.blocks(blocks);
    SanitizedDocument::new(blocks)
}

struct Sanitizer<'a> {
    ids: HeadingIds,
    warnings: &'a mut Vec<ParseDegraded>,
}

impl Sanitizer<'_> {
    fn blocks(&mut self, input: Vec<Block>) -> Vec<Block> {
        let mut out = Vec::with_capacity(input.len());
        for block in input {
            self.block(block, &mut out);
        }
        out
    }

    fn block(&mut self, block: Block, out: &mut Vec<Block>) {
        match block {
            Block::Heading {
                level, children, ..
            } => {
                let children = self.inlines(children);
                out.push(self.heading(level, children));
            }
            Block::Paragraph(children) => out.push(Block::Paragraph(self.inlines(children))),
            Block::Plain(children) => {
                let children = self.inlines(children);
                if !children.is_empty() {
                    out.push(Block::Plain(children));
                }
            }
            Block::CodeBlock { lang, content } => {
                let lang = self.language(lang);
                out.push(Block::CodeBlock { lang, content });
            }
            Block::BlockQuote(children) => out.push(Block::BlockQuote(self.blocks(children))),
            Block::List(list) => {
                let items = list
                    .items
                    .into_iter()
                    .map(|item| ListItem {
                        task: item.task,
                        blocks: self.blocks(item.blocks),
                    })
                    .collect();
                out.push(Block::List(List::new(list.ordered, list.start, items)));
            }
            Block::Table(table) => {
                let head = table.head.into_iter().map(|c| self.inlines(c)).collect();
                let rows = table
                    .rows
                    .into_iter()
                    .map(|row| row.into_iter().map(|c| self.inlines(c)).collect())
                    .collect();
                out.push(Block::Table(Table {
                    alignments: table.alignments,
                    head,
                    rows,
                }));
            }
            Block::ThematicBreak => out.push(Block::ThematicBreak),
            Block::Element(element) => self.block_element(element, out),
        }
    }

    fn heading(&mut self, level: u8, children: Vec<Inline>) -> Block {
        let id = self.ids.assign(&plain_text(&children));
        Block::Heading {
            level,
            id,
            children,
        }
    }

    fn language(&mut self, lang: Option<String>) -> Option<String> {
        let lang = lang?;
        if is_valid_language(&lang) {
            Some(lang)
        } else {
            self.warnings.push(ParseDegraded::RemovedAttribute {
                element: "code".to_owned(),
                attribute: "class".to_owned(),
            });
            None
        }
    }

    /// Warn about event handler attributes; returns `false` for removed elements.
    fn admit<T>(&mut self, element: &RawElement<T>) -> bool {
        if REMOVED_TAGS.contains(&element.tag.as_str()) {
            self.warnings.push(ParseDegraded::RemovedElement {
                element: element.tag.clone(),
            });
            return false;
        }
        for (name, _) in &element.attrs {
            if name.to_ascii_lowercase().starts_with("on") {
                self.warnings.push(ParseDegraded::RemovedAttribute {
                    element: element.tag.clone(),
                    attribute: name.clone(),
                });
            }
        }
        true
    }

    fn block_element(&mut self, element: RawElement<Block>, out: &mut Vec<Block>) {
        if !self.admit(&element) {
            return;
        }
        match element.tag.as_str() {
            "p" => {
                let children = self.inlines(blocks_into_inlines(element.children));
                out.push(Block::Paragraph(children));
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = element.tag.as_bytes()[1] - b'0';
                let children = self.inlines(blocks_into_inlines(element.children));
                out.push(self.heading(level, children));
            }
            "ul" | "ol" => out.push(self.list(element)),
            "pre" => out.push(self.code_block(element.children)),
            "table" => out.push(self.table(element.children)),
            "blockquote" => out.push(Block::BlockQuote(self.blocks(element.children))),
            "hr" => out.push(Block::ThematicBreak),
            // Benign containers: keep the content, drop the wrapper.
            _ => {
                for child in element.children {
                    self.block(child, out);
                }
            }
        }
    }

    fn list(&mut self, element: RawElement<Block>) -> Block {
        let ordered = element.tag == "ol";
        let start = if ordered {
            element
                .attr("start")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(1)
        } else {
            1
        };

        let mut items = Vec::new();
        for child in element.children {
            match child {
                Block::Element(li) if li.tag == "li" => {
                    if self.admit(&li) {
                        items.push(self.list_item(li.children));
                    }
                }
                other => {
                    let blocks = self.blocks(vec![other]);
                    if !blocks.is_empty() {
                        items.push(ListItem { task: None, blocks });
                    }
                }
            }
        }
        Block::List(List::new(ordered, start, items))
    }

    fn list_item(&mut self, mut children: Vec<Block>) -> ListItem {
        let task = match children.first_mut() {
            Some(Block::Plain(inlines)) => take_checkbox(inlines),
            Some(Block::Element(p)) if p.tag == "p" => match p.children.first_mut() {
                Some(Block::Plain(inlines)) => take_checkbox(inlines),
                _ => None,
            },
            _ => None,
        };
        // An emptied leading run is dropped by `blocks`.
        ListItem {
            task,
            blocks: self.blocks(children),
        }
    }

    fn code_block(&mut self, children: Vec<Block>) -> Block {
        let inlines = blocks_into_inlines(children);
        let lang = inlines.iter().find_map(|inline| match inline {
            Inline::Element(code) if code.tag == "code" => code.attr("class").and_then(|class| {
                class
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix("language-"))
                    .map(str::to_owned)
            }),
            _ => None,
        });
        Block::CodeBlock {
            lang: self.language(lang),
            content: plain_text(&inlines),
        }
    }

    fn table(&mut self, children: Vec<Block>) -> Block {
        let mut head_rows = Vec::new();
        let mut body_rows = Vec::new();
        for child in children {
            let Block::Element(section) = child else {
                continue;
            };
            match section.tag.as_str() {
                "thead" => head_rows.extend(section.children),
                "tbody" | "tfoot" => body_rows.extend(section.children),
                "tr" => body_rows.push(Block::Element(section)),
                _ => {}
            }
        }

        let mut alignments = Vec::new();
        let mut head = Vec::new();
        let mut head_rows = head_rows.into_iter();
        if let Some(first) = head_rows.next() {
            (head, alignments) = self.table_row(first);
        }
        let mut rows = Vec::new();
        for row in head_rows.chain(body_rows) {
            let (cells, row_alignments) = self.table_row(row);
            if head.is_empty() && rows.is_empty() {
                alignments = row_alignments;
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }
        Block::Table(Table {
            alignments,
            head,
            rows,
        })
    }

    fn table_row(&mut self, row: Block) -> (Vec<Vec<Inline>>, Vec<Alignment>) {
        let Block::Element(row) = row else {
            return (Vec::new(), Vec::new());
        };
        if row.tag != "tr" {
            return (Vec::new(), Vec::new());
        }
        let mut cells = Vec::new();
        let mut alignments = Vec::new();
        for cell in row.children {
            let Block::Element(cell) = cell else {
                continue;
            };
            if !matches!(cell.tag.as_str(), "th" | "td") {
                continue;
            }
            let alignment = cell
                .attr("style")
                .and_then(|style| TEXT_ALIGN_RE.captures(style))
                .map_or(Alignment::None, |caps| {
                    Alignment::from_css(&caps[1].to_ascii_lowercase())
                });
            alignments.push(alignment);
            cells.push(self.inlines(blocks_into_inlines(cell.children)));
        }
        (cells, alignments)
    }

    fn inlines(&mut self, input: Vec<Inline>) -> Vec<Inline> {
        let mut out = Vec::with_capacity(input.len());
        for inline in input {
            self.inline(inline, &mut out);
        }
        out
    }

    fn inline(&mut self, inline: Inline, out: &mut Vec<Inline>) {
        match inline {
            Inline::Text(_) | Inline::Code(_) | Inline::HardBreak => push_inline(out, inline),
            Inline::Emphasis(children) => out.push(Inline::Emphasis(self.inlines(children))),
            Inline::Strong(children) => out.push(Inline::Strong(self.inlines(children))),
            Inline::Strikethrough(children) => {
                out.push(Inline::Strikethrough(self.inlines(children)));
            }
            Inline::Superscript(children) => out.push(Inline::Superscript(self.inlines(children))),
            Inline::Subscript(children) => out.push(Inline::Subscript(self.inlines(children))),
            Inline::Link {
                href,
                title,
                children,
            } => self.link(href, title, children, out),
            Inline::Image { src, alt, title } => self.image(src, alt, title, out),
            Inline::Element(element) => self.inline_element(element, out),
        }
    }

    fn link(
        &mut self,
        href: String,
        title: Option<String>,
        children: Vec<Inline>,
        out: &mut Vec<Inline>,
    ) {
        let children = self.inlines(children);
        if is_safe_url(&href) {
            out.push(Inline::Link {
                href,
                title: title.filter(|t| !t.is_empty()),
                children,
            });
        } else {
            self.warnings.push(ParseDegraded::UnsafeUrl { url: href });
            extend_inlines(out, children);
        }
    }

    fn image(&mut self, src: String, alt: String, title: Option<String>, out: &mut Vec<Inline>) {
        if is_safe_url(&src) {
            out.push(Inline::Image {
                src,
                alt,
                title: title.filter(|t| !t.is_empty()),
            });
        } else {
            self.warnings.push(ParseDegraded::UnsafeUrl { url: src });
            push_inline(out, Inline::Text(alt));
        }
    }

    fn inline_element(&mut self, element: RawElement<Inline>, out: &mut Vec<Inline>) {
        if !self.admit(&element) {
            return;
        }
        let RawElement {
            tag,
            attrs,
            children,
        } = element;
        let attr = |name: &str| {
            attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        match tag.as_str() {
            "strong" | "b" => out.push(Inline::Strong(self.inlines(children))),
            "em" | "i" => out.push(Inline::Emphasis(self.inlines(children))),
            "s" | "del" | "strike" => out.push(Inline::Strikethrough(self.inlines(children))),
            "sup" => out.push(Inline::Superscript(self.inlines(children))),
            "sub" => out.push(Inline::Subscript(self.inlines(children))),
            "code" => out.push(Inline::Code(plain_text(&children))),
            "br" => out.push(Inline::HardBreak),
            "a" => match attr("href") {
                Some(href) => self.link(href, attr("title"), children, out),
                None => {
                    let children = self.inlines(children);
                    extend_inlines(out, children);
                }
            },
            "img" => {
                let alt = attr("alt").unwrap_or_default();
                match attr("src") {
                    Some(src) => self.image(src, alt, attr("title"), out),
                    None => push_inline(out, Inline::Text(alt)),
                }
            }
            "hr" => {}
            _ => {
                let children = self.inlines(children);
                extend_inlines(out, children);
            }
        }
    }
}

/// Remove a leading `<input type="checkbox">` and return its checked state.
fn take_checkbox(inlines: &mut Vec<Inline>) -> Option<bool> {
    let checked = match inlines.first() {
        Some(Inline::Element(input))
            if input.tag == "input"
                && input
                    .attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) =>
        {
            input.attr("checked").is_some()
        }
        _ => return None,
    };
    inlines.remove(0);
    if let Some(Inline::Text(text)) = inlines.first_mut() {
        let trimmed = text.trim_start().to_owned();
        if trimmed.is_empty() {
            inlines.remove(0);
        } else {
            *text = trimmed;
        }
    }
    Some(checked)
}
