//! Markdown to unsanitized tree conversion.
//!
//! Folds pulldown-cmark events into [`Block`]s using an explicit frame stack.
//! Raw HTML is kept as generic elements: block HTML goes through the html5ever
//! importer, inline HTML tags are paired up on the frame stack.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};

use crate::ParseDegraded;
use crate::html_import::import_blocks;
use crate::tree::{Block, Inline, List, ListItem, RawElement, Table, plain_text, push_inline};

/// Regex to match an inline HTML opening (or self-closing) tag.
static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^<([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>$"#,
    )
    .unwrap()
});

/// Regex to match an inline HTML closing tag.
static CLOSE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</([A-Za-z][A-Za-z0-9-]*)\s*>$").unwrap());

/// Regex to match one attribute inside an opening tag.
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap()
});

/// Regex to match character references in attribute values.
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|amp|lt|gt|quot|apos);").unwrap()
});

/// Regex to match GFM extended autolink candidates.
static AUTOLINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<]+").unwrap());

/// Elements that never have content.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Parse Markdown into unsanitized blocks plus parse warnings.
pub(crate) fn parse(markdown: &str) -> (Vec<Block>, Vec<ParseDegraded>) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::new(markdown);
    for (event, range) in Parser::new_ext(markdown, options).into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}

#[derive(Clone, Copy)]
enum SpanKind {
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
}

/// Open container on the builder stack.
enum Frame {
    Root(Vec<Block>),
    BlockQuote(Vec<Block>),
    List {
        ordered: bool,
        start: u64,
        items: Vec<ListItem>,
    },
    Item {
        task: Option<bool>,
        blocks: Vec<Block>,
        /// Inline content of a tight item, not yet wrapped in a block.
        run: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        children: Vec<Inline>,
    },
    CodeBlock {
        lang: Option<String>,
        content: String,
    },
    HtmlBlock(String),
    Table(Table),
    Row {
        head: bool,
        cells: Vec<Vec<Inline>>,
    },
    Cell(Vec<Inline>),
    Span {
        kind: SpanKind,
        children: Vec<Inline>,
    },
    Link {
        href: String,
        title: String,
        children: Vec<Inline>,
    },
    Image {
        src: String,
        title: String,
        alt: Vec<Inline>,
    },
    RawInline(RawElement<Inline>),
}

struct TreeBuilder<'s> {
    source: &'s str,
    stack: Vec<Frame>,
    warnings: Vec<ParseDegraded>,
    /// Next text follows a task list marker.
    after_task_marker: bool,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            stack: vec![Frame::Root(Vec::new())],
            warnings: Vec::new(),
            after_task_marker: false,
        }
    }

    fn finish(mut self) -> (Vec<Block>, Vec<ParseDegraded>) {
        while self.stack.len() > 1 {
            self.close_top();
        }
        let blocks = match self.stack.pop() {
            Some(Frame::Root(blocks)) => blocks,
            _ => Vec::new(),
        };
        (blocks, self.warnings)
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start_tag(tag, range),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline(Inline::Code(code.into_string())),
            Event::Html(html) => self.block_html(&html),
            Event::InlineHtml(html) => self.inline_html(&html),
            Event::SoftBreak => self.inline(Inline::Text("\n".to_owned())),
            Event::HardBreak => self.inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::ThematicBreak),
            Event::TaskListMarker(checked) => self.task_marker(checked),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Extensions not enabled: keep the source text.
                self.inline(Inline::Text(self.source[range].to_owned()));
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph(Vec::new()),
            Tag::Heading { level, .. } => Frame::Heading {
                level: heading_level_to_num(level),
                children: Vec::new(),
            },
            Tag::BlockQuote(_) => Frame::BlockQuote(Vec::new()),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        self.check_fence(range);
                        fence_language(&info)
                    }
                    CodeBlockKind::Indented => None,
                };
                Frame::CodeBlock {
                    lang,
                    content: String::new(),
                }
            }
            Tag::HtmlBlock => Frame::HtmlBlock(String::new()),
            Tag::List(start) => Frame::List {
                ordered: start.is_some(),
                start: start.unwrap_or(1),
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                task: None,
                blocks: Vec::new(),
                run: Vec::new(),
            },
            Tag::Table(alignments) => Frame::Table(Table {
                alignments: alignments.into_iter().map(Into::into).collect(),
                ..Table::default()
            }),
            Tag::TableHead => Frame::Row {
                head: true,
                cells: Vec::new(),
            },
            Tag::TableRow => Frame::Row {
                head: false,
                cells: Vec::new(),
            },
            Tag::TableCell => Frame::Cell(Vec::new()),
            Tag::Emphasis => span(SpanKind::Emphasis),
            Tag::Strong => span(SpanKind::Strong),
            Tag::Strikethrough => span(SpanKind::Strikethrough),
            Tag::Superscript => span(SpanKind::Superscript),
            Tag::Subscript => span(SpanKind::Subscript),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => Frame::Link {
                href: if link_type == LinkType::Email {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.into_string()
                },
                title: title.into_string(),
                children: Vec::new(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                src: dest_url.into_string(),
                title: title.into_string(),
                alt: Vec::new(),
            },
            // Extensions not enabled.
            Tag::FootnoteDefinition(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::MetadataBlock(_) => return,
        };
        if matches!(
            frame,
            Frame::Paragraph(_)
                | Frame::Heading { .. }
                | Frame::BlockQuote(_)
                | Frame::CodeBlock { .. }
                | Frame::HtmlBlock(_)
                | Frame::List { .. }
                | Frame::Table(_)
        ) {
            self.flush_item_run();
        }
        self.stack.push(frame);
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if matches!(
            tag,
            TagEnd::FootnoteDefinition
                | TagEnd::DefinitionList
                | TagEnd::DefinitionListTitle
                | TagEnd::DefinitionListDefinition
                | TagEnd::MetadataBlock(_)
        ) {
            return;
        }
        // Unclosed inline HTML ends with its enclosing markdown container.
        while matches!(self.stack.last(), Some(Frame::RawInline(_))) {
            self.close_top();
        }
        self.close_top();
    }

    /// Pop the top frame and attach its node to the parent.
    fn close_top(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Root(blocks) => {
                for block in blocks {
                    self.push_block(block);
                }
            }
            Frame::BlockQuote(blocks) => self.push_block(Block::BlockQuote(blocks)),
            Frame::List {
                ordered,
                start,
                items,
            } => self.push_block(Block::List(List::new(ordered, start, items))),
            Frame::Item {
                task,
                mut blocks,
                run,
            } => {
                flush_run(&mut blocks, run);
                let item = ListItem { task, blocks };
                match self.stack.last_mut() {
                    Some(Frame::List { items, .. }) => items.push(item),
                    _ => {
                        for block in item.blocks {
                            self.push_block(block);
                        }
                    }
                }
            }
            Frame::Paragraph(children) => self.push_block(Block::Paragraph(autolink(children))),
            Frame::Heading { level, children } => self.push_block(Block::Heading {
                level,
                id: String::new(),
                children: autolink(children),
            }),
            Frame::CodeBlock { lang, content } => {
                self.push_block(Block::CodeBlock { lang, content });
            }
            Frame::HtmlBlock(html) => {
                for block in import_blocks(&html) {
                    self.push_block(block);
                }
            }
            Frame::Table(table) => self.push_block(Block::Table(table)),
            Frame::Row { head, cells } => {
                if let Some(Frame::Table(table)) = self.stack.last_mut() {
                    if head {
                        table.head = cells;
                    } else {
                        table.rows.push(cells);
                    }
                }
            }
            Frame::Cell(children) => {
                if let Some(Frame::Row { cells, .. }) = self.stack.last_mut() {
                    cells.push(autolink(children));
                }
            }
            Frame::Span { kind, children } => self.inline(match kind {
                SpanKind::Emphasis => Inline::Emphasis(children),
                SpanKind::Strong => Inline::Strong(children),
                SpanKind::Strikethrough => Inline::Strikethrough(children),
                SpanKind::Superscript => Inline::Superscript(children),
                SpanKind::Subscript => Inline::Subscript(children),
            }),
            Frame::Link {
                href,
                title,
                children,
            } => self.inline(Inline::Link {
                href,
                title: non_empty(title),
                children,
            }),
            Frame::Image { src, title, alt } => self.inline(Inline::Image {
                src,
                alt: plain_text(&alt),
                title: non_empty(title),
            }),
            Frame::RawInline(element) => self.inline(Inline::Element(element)),
        }
    }

    /// Attach a block to the nearest block container.
    fn push_block(&mut self, block: Block) {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Root(blocks) | Frame::BlockQuote(blocks) => {
                    blocks.push(block);
                    return;
                }
                Frame::Item { blocks, run, .. } => {
                    flush_run(blocks, std::mem::take(run));
                    blocks.push(block);
                    return;
                }
                _ => {}
            }
        }
    }

    /// Wrap pending tight-item inlines before a nested block starts.
    fn flush_item_run(&mut self) {
        if let Some(Frame::Item { blocks, run, .. }) = self.stack.last_mut() {
            flush_run(blocks, std::mem::take(run));
        }
    }

    /// Attach an inline to the innermost inline container.
    fn inline(&mut self, inline: Inline) {
        self.after_task_marker = false;
        let target = match self.stack.last_mut() {
            Some(
                Frame::Paragraph(children)
                | Frame::Heading { children, .. }
                | Frame::Cell(children)
                | Frame::Span { children, .. }
                | Frame::Link { children, .. }
                | Frame::Item { run: children, .. },
            ) => children,
            Some(Frame::Image { alt, .. }) => alt,
            Some(Frame::RawInline(element)) => &mut element.children,
            Some(Frame::CodeBlock { content, .. }) => {
                content.push_str(&plain_text(std::slice::from_ref(&inline)));
                return;
            }
            _ => {
                self.push_block(Block::Plain(vec![inline]));
                return;
            }
        };
        push_inline(target, inline);
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::CodeBlock { content, .. }) => content.push_str(text),
            Some(Frame::HtmlBlock(html)) => html.push_str(text),
            _ => {
                let text = if self.after_task_marker {
                    text.trim_start()
                } else {
                    text
                };
                if !text.is_empty() {
                    self.inline(Inline::Text(text.to_owned()));
                }
            }
        }
    }

    fn task_marker(&mut self, checked: bool) {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Item { task, .. } = frame {
                *task = Some(checked);
                break;
            }
        }
        self.after_task_marker = true;
    }

    fn block_html(&mut self, html: &str) {
        if let Some(Frame::HtmlBlock(buffer)) = self.stack.last_mut() {
            buffer.push_str(html);
        } else {
            self.inline_html(html);
        }
    }

    fn inline_html(&mut self, html: &str) {
        let html = html.trim();
        if let Some(caps) = CLOSE_TAG_RE.captures(html) {
            let tag = caps[1].to_ascii_lowercase();
            if matches!(self.stack.last(), Some(Frame::RawInline(open)) if open.tag == tag) {
                self.close_top();
            }
            return;
        }
        let Some(caps) = OPEN_TAG_RE.captures(html) else {
            // Comments, declarations, processing instructions
            return;
        };
        let tag = caps[1].to_ascii_lowercase();
        let attrs = ATTR_RE
            .captures_iter(&caps[2])
            .map(|attr| {
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map_or(String::new(), |v| decode_entities(v.as_str()));
                (attr[1].to_ascii_lowercase(), value)
            })
            .collect();
        let element = RawElement {
            tag,
            attrs,
            children: Vec::new(),
        };
        if !caps[3].is_empty() || VOID_TAGS.contains(&element.tag.as_str()) {
            self.inline(Inline::Element(element));
        } else {
            self.after_task_marker = false;
            self.stack.push(Frame::RawInline(element));
        }
    }

    /// Report a fenced code block that runs to the end of its container.
    fn check_fence(&mut self, range: Range<usize>) {
        let Some(block) = self.source.get(range.clone()) else {
            return;
        };
        if !fence_is_closed(block) {
            let line = self.source[..range.start].matches('\n').count() + 1;
            self.warnings.push(ParseDegraded::UnterminatedFence { line });
        }
    }
}

fn span(kind: SpanKind) -> Frame {
    Frame::Span {
        kind,
        children: Vec::new(),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn flush_run(blocks: &mut Vec<Block>, run: Vec<Inline>) {
    if !run.is_empty() {
        blocks.push(Block::Plain(autolink(run)));
    }
}

/// Convert heading level enum to number (1-6).
fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Language from a fence info string (`rust,ignore` and `rust {.x}` yield `rust`).
fn fence_language(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .filter(|lang| !lang.is_empty())
        .map(str::to_owned)
}

/// Check whether a fenced block's source ends with a matching closing fence.
fn fence_is_closed(block: &str) -> bool {
    fn strip_prefix(line: &str) -> &str {
        line.trim_start_matches([' ', '\t', '>'])
    }

    let mut lines = block.lines();
    let Some(opening) = lines.next().map(strip_prefix) else {
        return false;
    };
    let Some(fence_char) = opening.chars().next().filter(|c| matches!(c, '`' | '~')) else {
        return false;
    };
    let fence_len = opening.chars().take_while(|&c| c == fence_char).count();
    let Some(closing) = lines.last().map(|line| strip_prefix(line).trim_end()) else {
        return false;
    };
    closing.len() >= fence_len && closing.chars().all(|c| c == fence_char)
}

fn decode_entities(value: &str) -> String {
    ENTITY_RE
        .replace_all(value, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                        .map_or_else(
                            || entity[1..].parse::<u32>().ok(),
                            |hex| u32::from_str_radix(hex, 16).ok(),
                        );
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

/// Turn bare `https://…` and `www.…` runs into links.
fn autolink(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match inline {
            Inline::Text(text) => link_text(&text, &mut out),
            Inline::Emphasis(children) => out.push(Inline::Emphasis(autolink(children))),
            Inline::Strong(children) => out.push(Inline::Strong(autolink(children))),
            Inline::Strikethrough(children) => out.push(Inline::Strikethrough(autolink(children))),
            Inline::Superscript(children) => out.push(Inline::Superscript(autolink(children))),
            Inline::Subscript(children) => out.push(Inline::Subscript(autolink(children))),
            Inline::Element(mut element) if element.tag != "a" => {
                element.children = autolink(element.children);
                out.push(Inline::Element(element));
            }
            other => out.push(other),
        }
    }
    out
}

fn link_text(text: &str, out: &mut Vec<Inline>) {
    let mut last = 0;
    for found in AUTOLINK_RE.find_iter(text) {
        let url = trim_autolink(found.as_str());
        let is_www = url.len() >= 4 && url[..4].eq_ignore_ascii_case("www.");
        let prefix_len = if is_www { 4 } else { url.find("://").map_or(0, |i| i + 3) };
        if url.len() <= prefix_len {
            continue;
        }
        push_inline(out, Inline::Text(text[last..found.start()].to_owned()));
        let href = if is_www {
            format!("http://{url}")
        } else {
            url.to_owned()
        };
        out.push(Inline::Link {
            href,
            title: None,
            children: vec![Inline::Text(url.to_owned())],
        });
        last = found.start() + url.len();
    }
    push_inline(out, Inline::Text(text[last..].to_owned()));
}

/// Drop trailing punctuation and unbalanced closing parentheses.
fn trim_autolink(candidate: &str) -> &str {
    let mut url = candidate;
    while let Some(last) = url.chars().last() {
        let trim = match last {
            '?' | '!' | '.' | ',' | ':' | '*' | '_' | '~' | '\'' | '"' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !trim {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}
