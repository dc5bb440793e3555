//! Sanitized tree to WordprocessingML body.

use std::collections::HashMap;
use std::fmt::Write;

use mdexport_markdown::{Alignment, Block, Inline, List, Table};

use crate::numbering::{MAX_LEVEL, Numbering, item_indent};
use crate::parts::{FIRST_LINK_RID, escape_xml};

const CHECKED: &str = "\u{2612} ";
const UNCHECKED: &str = "\u{2610} ";

/// Character formatting applied to a run.
#[derive(Clone, Copy, Default)]
struct RunStyle {
    bold: bool,
    italic: bool,
    strike: bool,
    code: bool,
    superscript: bool,
    subscript: bool,
    hyperlink: bool,
}

/// Paragraph properties shared by the blocks of one container.
#[derive(Clone, Copy, Default)]
struct Container {
    quote: bool,
    /// List level of the enclosing item, for continuation indent.
    item_level: Option<u8>,
}

/// Accumulates `w:body` content plus the numbering and hyperlink tables it
/// references.
#[derive(Default)]
pub(crate) struct BodyWriter {
    out: String,
    numbering: Numbering,
    links: Vec<String>,
    link_ids: HashMap<String, usize>,
    bookmarks: u32,
}

impl BodyWriter {
    pub(crate) fn write(blocks: &[Block]) -> Self {
        let mut writer = Self::default();
        writer.blocks(blocks, Container::default());
        writer
    }

    pub(crate) fn body(&self) -> &str {
        &self.out
    }

    pub(crate) fn numbering(&self) -> &Numbering {
        &self.numbering
    }

    /// External hyperlink targets in relationship order.
    pub(crate) fn links(&self) -> &[String] {
        &self.links
    }

    fn blocks(&mut self, blocks: &[Block], container: Container) {
        for block in blocks {
            self.block(block, container);
        }
    }

    fn block(&mut self, block: &Block, container: Container) {
        match block {
            Block::Heading {
                level,
                id,
                children,
            } => self.heading(*level, id, children),
            Block::Paragraph(children) | Block::Plain(children) => {
                self.paragraph_start(container, None);
                self.inlines(children, RunStyle::default());
                self.out.push_str("</w:p>");
            }
            Block::CodeBlock { content, .. } => self.code_block(content),
            Block::BlockQuote(children) => self.blocks(
                children,
                Container {
                    quote: true,
                    ..container
                },
            ),
            Block::List(list) => {
                let level = container.item_level.map_or(0, |level| level + 1);
                self.list(list, level.min(MAX_LEVEL), container.quote);
            }
            Block::Table(table) => self.table(table),
            Block::ThematicBreak => self.out.push_str(
                r#"<w:p><w:pPr><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="auto"/></w:pBdr></w:pPr></w:p>"#,
            ),
            Block::Element(element) => self.blocks(&element.children, container),
        }
    }

    /// Open `w:p` with style, continuation indent or list numbering.
    fn paragraph_start(&mut self, container: Container, numbering: Option<(u8, usize)>) {
        self.out.push_str("<w:p>");
        let style = container.quote.then_some("Quote");
        if style.is_none() && numbering.is_none() && container.item_level.is_none() {
            return;
        }
        self.out.push_str("<w:pPr>");
        if let Some(style) = style {
            write!(self.out, r#"<w:pStyle w:val="{style}"/>"#).unwrap();
        }
        if let Some((level, num_id)) = numbering {
            write!(
                self.out,
                r#"<w:numPr><w:ilvl w:val="{level}"/><w:numId w:val="{num_id}"/></w:numPr>"#
            )
            .unwrap();
        } else if let Some(level) = container.item_level {
            write!(self.out, r#"<w:ind w:left="{}"/>"#, item_indent(level)).unwrap();
        }
        self.out.push_str("</w:pPr>");
    }

    fn heading(&mut self, level: u8, id: &str, children: &[Inline]) {
        let level = level.clamp(1, 6);
        let name = bookmark_name(id);
        let bookmark = self.bookmarks;
        self.bookmarks += 1;
        write!(
            self.out,
            r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr><w:bookmarkStart w:id="{bookmark}" w:name="{}"/>"#,
            escape_xml(&name)
        )
        .unwrap();
        self.inlines(children, RunStyle::default());
        write!(self.out, r#"<w:bookmarkEnd w:id="{bookmark}"/></w:p>"#).unwrap();
    }

    /// One `CodeBlock` paragraph per source line.
    fn code_block(&mut self, content: &str) {
        let content = content.strip_suffix('\n').unwrap_or(content);
        for line in content.split('\n') {
            self.out
                .push_str(r#"<w:p><w:pPr><w:pStyle w:val="CodeBlock"/></w:pPr>"#);
            if !line.is_empty() {
                self.run(line, RunStyle::default());
            }
            self.out.push_str("</w:p>");
        }
    }

    fn list(&mut self, list: &List, level: u8, quote: bool) {
        let num_id = self.numbering.add(list.ordered, level, list.start);
        let item_container = Container {
            quote,
            item_level: Some(level),
        };

        for item in &list.items {
            let prefix = item.task.map(|checked| if checked { CHECKED } else { UNCHECKED });
            let (lead, rest) = match item.blocks.split_first() {
                Some((Block::Paragraph(children) | Block::Plain(children), rest)) => {
                    (Some(children), rest)
                }
                _ => (None, item.blocks.as_slice()),
            };

            // The numbered paragraph always exists, so an item starting with
            // a nested list or code block still shows its marker.
            self.paragraph_start(
                Container {
                    quote,
                    item_level: None,
                },
                Some((level, num_id)),
            );
            if let Some(prefix) = prefix {
                self.run(prefix, RunStyle::default());
            }
            if let Some(children) = lead {
                self.inlines(children, RunStyle::default());
            }
            self.out.push_str("</w:p>");

            self.blocks(rest, item_container);
        }
    }

    fn table(&mut self, table: &Table) {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain([table.head.len(), table.alignments.len()])
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        self.out.push_str(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="5000" w:type="pct"/></w:tblPr><w:tblGrid>"#,
        );
        let width = 9638 / columns;
        for _ in 0..columns {
            write!(self.out, r#"<w:gridCol w:w="{width}"/>"#).unwrap();
        }
        self.out.push_str("</w:tblGrid>");

        if !table.head.is_empty() {
            self.table_row(table, &table.head, columns, true);
        }
        for row in &table.rows {
            self.table_row(table, row, columns, false);
        }
        self.out.push_str("</w:tbl>");
    }

    /// Rows never split across pages; the header row repeats on each page.
    fn table_row(&mut self, table: &Table, cells: &[Vec<Inline>], columns: usize, header: bool) {
        self.out.push_str("<w:tr><w:trPr><w:cantSplit/>");
        if header {
            self.out.push_str("<w:tblHeader/>");
        }
        self.out.push_str("</w:trPr>");

        for column in 0..columns {
            self.out.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr><w:p>"#);
            let justify = match table.alignment(column) {
                Alignment::None => None,
                Alignment::Left => Some("left"),
                Alignment::Center => Some("center"),
                Alignment::Right => Some("right"),
            };
            if let Some(justify) = justify {
                write!(self.out, r#"<w:pPr><w:jc w:val="{justify}"/></w:pPr>"#).unwrap();
            }
            if let Some(children) = cells.get(column) {
                let style = RunStyle {
                    bold: header,
                    ..RunStyle::default()
                };
                self.inlines(children, style);
            }
            self.out.push_str("</w:p></w:tc>");
        }
        self.out.push_str("</w:tr>");
    }

    fn inlines(&mut self, inlines: &[Inline], style: RunStyle) {
        for inline in inlines {
            self.inline(inline, style);
        }
    }

    fn inline(&mut self, inline: &Inline, style: RunStyle) {
        match inline {
            Inline::Text(text) => self.run(text, style),
            Inline::Code(code) => self.run(code, RunStyle { code: true, ..style }),
            Inline::Emphasis(children) => self.inlines(children, RunStyle { italic: true, ..style }),
            Inline::Strong(children) => self.inlines(children, RunStyle { bold: true, ..style }),
            Inline::Strikethrough(children) => {
                self.inlines(children, RunStyle { strike: true, ..style });
            }
            Inline::Superscript(children) => self.inlines(
                children,
                RunStyle {
                    superscript: true,
                    ..style
                },
            ),
            Inline::Subscript(children) => self.inlines(
                children,
                RunStyle {
                    subscript: true,
                    ..style
                },
            ),
            Inline::Link { href, children, .. } => self.link(href, children, style),
            Inline::Image { alt, .. } => {
                // Remote images are never fetched; the alt text stands in.
                if !alt.is_empty() {
                    self.run(alt, RunStyle { italic: true, ..style });
                }
            }
            Inline::HardBreak => self.out.push_str("<w:r><w:br/></w:r>"),
            Inline::Element(element) => self.inlines(&element.children, style),
        }
    }

    fn link(&mut self, href: &str, children: &[Inline], style: RunStyle) {
        let link_style = RunStyle {
            hyperlink: true,
            ..style
        };
        if let Some(fragment) = href.strip_prefix('#') {
            write!(
                self.out,
                r#"<w:hyperlink w:anchor="{}">"#,
                escape_xml(&bookmark_name(fragment))
            )
            .unwrap();
        } else if is_external(href) {
            let rid = self.link_id(href);
            write!(self.out, r#"<w:hyperlink r:id="rId{rid}">"#).unwrap();
        } else {
            // Relative targets have no meaning outside the site.
            self.inlines(children, style);
            return;
        }
        self.inlines(children, link_style);
        self.out.push_str("</w:hyperlink>");
    }

    fn link_id(&mut self, href: &str) -> usize {
        if let Some(&id) = self.link_ids.get(href) {
            return id;
        }
        let id = FIRST_LINK_RID + self.links.len();
        self.links.push(href.to_owned());
        self.link_ids.insert(href.to_owned(), id);
        id
    }

    fn run(&mut self, text: &str, style: RunStyle) {
        if text.is_empty() {
            return;
        }
        self.out.push_str("<w:r>");
        let has_props = style.bold
            || style.italic
            || style.strike
            || style.code
            || style.superscript
            || style.subscript
            || style.hyperlink;
        if has_props {
            self.out.push_str("<w:rPr>");
            if style.hyperlink {
                self.out.push_str(r#"<w:rStyle w:val="Hyperlink"/>"#);
            }
            if style.code {
                self.out.push_str(
                    r#"<w:rFonts w:ascii="Consolas" w:hAnsi="Consolas" w:cs="Consolas"/>"#,
                );
            }
            if style.bold {
                self.out.push_str("<w:b/>");
            }
            if style.italic {
                self.out.push_str("<w:i/>");
            }
            if style.strike {
                self.out.push_str("<w:strike/>");
            }
            if style.superscript {
                self.out.push_str(r#"<w:vertAlign w:val="superscript"/>"#);
            } else if style.subscript {
                self.out.push_str(r#"<w:vertAlign w:val="subscript"/>"#);
            }
            self.out.push_str("</w:rPr>");
        }
        // Soft line breaks inside a paragraph render as spaces.
        let text = text.replace('\n', " ");
        write!(
            self.out,
            r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape_xml(&text)
        )
        .unwrap();
    }
}

fn is_external(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Longest bookmark name Word accepts.
const BOOKMARK_MAX: usize = 40;

/// Word bookmark names start with a letter and hold at most 40 characters.
///
/// Longer ids keep a prefix and end in a hash of the whole id, so ids that
/// differ only past the limit (`-1` dedup suffixes included) stay distinct.
fn bookmark_name(id: &str) -> String {
    let mut name = String::with_capacity(id.len() + 1);
    if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.push('h');
    }
    name.push_str(id);
    if name.chars().count() <= BOOKMARK_MAX {
        return name;
    }
    // FNV-1a, stable across runs and platforms.
    let hash = id.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    let mut short: String = name.chars().take(BOOKMARK_MAX - 9).collect();
    write!(short, "_{hash:08x}").unwrap();
    short
}
