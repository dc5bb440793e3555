//! List numbering definitions (`word/numbering.xml`).

use std::fmt::Write;

/// Deepest nesting level Word supports.
pub(crate) const MAX_LEVEL: u8 = 8;

const BULLET_ABSTRACT_ID: u32 = 0;
const DECIMAL_ABSTRACT_ID: u32 = 1;
const BULLETS: [&str; 3] = ["\u{2022}", "\u{25e6}", "\u{25aa}"];

/// One `w:num` instance per list in the document.
///
/// Every list gets its own instance so that each ordered list restarts at
/// its own start number instead of continuing the previous list.
#[derive(Debug, Default)]
pub(crate) struct Numbering {
    instances: Vec<Instance>,
}

#[derive(Debug)]
struct Instance {
    ordered: bool,
    level: u8,
    start: u64,
}

impl Numbering {
    /// Register a list and return its `w:numId`.
    pub(crate) fn add(&mut self, ordered: bool, level: u8, start: u64) -> usize {
        self.instances.push(Instance {
            ordered,
            level: level.min(MAX_LEVEL),
            start,
        });
        self.instances.len()
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut out = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        );
        write_abstract(&mut out, BULLET_ABSTRACT_ID, false);
        write_abstract(&mut out, DECIMAL_ABSTRACT_ID, true);

        for (index, instance) in self.instances.iter().enumerate() {
            let abstract_id = if instance.ordered {
                DECIMAL_ABSTRACT_ID
            } else {
                BULLET_ABSTRACT_ID
            };
            write!(
                out,
                r#"<w:num w:numId="{}"><w:abstractNumId w:val="{abstract_id}"/>"#,
                index + 1
            )
            .unwrap();
            if instance.ordered {
                write!(
                    out,
                    r#"<w:lvlOverride w:ilvl="{}"><w:startOverride w:val="{}"/></w:lvlOverride>"#,
                    instance.level, instance.start
                )
                .unwrap();
            }
            out.push_str("</w:num>");
        }
        out.push_str("</w:numbering>");
        out
    }
}

fn write_abstract(out: &mut String, id: u32, ordered: bool) {
    write!(
        out,
        r#"<w:abstractNum w:abstractNumId="{id}"><w:multiLevelType w:val="hybridMultilevel"/>"#
    )
    .unwrap();
    for level in 0..=MAX_LEVEL {
        let indent = 720 * (u32::from(level) + 1);
        let (format, text) = if ordered {
            ("decimal", format!("%{}.", level + 1))
        } else {
            ("bullet", BULLETS[usize::from(level) % BULLETS.len()].to_owned())
        };
        write!(
            out,
            r#"<w:lvl w:ilvl="{level}"><w:start w:val="1"/><w:numFmt w:val="{format}"/><w:lvlText w:val="{text}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="360"/></w:pPr></w:lvl>"#
        )
        .unwrap();
    }
    out.push_str("</w:abstractNum>");
}

/// Left indent of continuation paragraphs inside a list item.
pub(crate) fn item_indent(level: u8) -> u32 {
    720 * (u32::from(level.min(MAX_LEVEL)) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_ordered_list_restarts() {
        let mut numbering = Numbering::default();
        assert_eq!(numbering.add(true, 0, 1), 1);
        assert_eq!(numbering.add(false, 1, 1), 2);
        assert_eq!(numbering.add(true, 0, 7), 3);

        let xml = numbering.to_xml();
        assert!(xml.contains(r#"<w:num w:numId="1"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#));
        assert!(xml.contains(r#"<w:num w:numId="2"><w:abstractNumId w:val="0"/></w:num>"#));
        assert!(xml.contains(r#"<w:startOverride w:val="7"/>"#));
    }

    #[test]
    fn test_levels_clamped() {
        let mut numbering = Numbering::default();
        numbering.add(true, 12, 3);
        assert!(numbering.to_xml().contains(r#"<w:lvlOverride w:ilvl="8">"#));
        assert_eq!(item_indent(20), 720 * 9);
    }
}
