//! Bullet list expansion for filled templates.
//!
//! A list value such as `"• a\n• b"` lands in a single paragraph as line
//! breaks. After filling, such paragraphs are split into one paragraph per
//! line, and every line starting with a bullet gets the `List Paragraph` style
//! plus a hanging indent.

use crate::model::{Block, Document, Inline, Paragraph, RowPart, Run, TablePart};
use crate::xml::{XmlElement, XmlNode};

pub const BULLET: char = '•';

const LIST_STYLE: &str = "List Paragraph";

// Twentieths of a point: 0.5" left, 0.25" hanging, 3pt after, 1.15 lines.
const INDENT_LEFT: &str = "720";
const INDENT_HANGING: &str = "360";
const SPACING_AFTER: &str = "60";
const LINE_SPACING: &str = "276";

/// `w:pPr` children that must follow `w:spacing` and `w:ind`.
const AFTER_INDENT: &[&str] = &[
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

/// Split multi-line bullet paragraphs and format bullet lines, in body order
/// and inside table cells. Returns the number of bullet paragraphs formatted.
pub fn expand_bullets(document: &mut Document) -> usize {
    let list_style = document.styles().resolve(LIST_STYLE).map(str::to_string);
    if list_style.is_none() {
        tracing::debug!("No '{}' style, bullets keep their paragraph style", LIST_STYLE);
    }
    expand_blocks(&mut document.body, list_style.as_deref())
}

fn expand_blocks(blocks: &mut Vec<Block>, list_style: Option<&str>) -> usize {
    let mut formatted = 0;
    let mut index = 0;
    while index < blocks.len() {
        let lines = match &mut blocks[index] {
            Block::Paragraph(paragraph) => split_lines(paragraph),
            Block::Table(table) => {
                for part in &mut table.parts {
                    if let TablePart::Row(row) = part {
                        for cell in &mut row.parts {
                            if let RowPart::Cell(cell) = cell {
                                formatted += expand_blocks(&mut cell.blocks, list_style);
                            }
                        }
                    }
                }
                None
            }
            Block::Section(_) | Block::Raw(_) => None,
        };

        match lines {
            Some(lines) => {
                let count = lines.len();
                for (offset, mut line) in lines.into_iter().enumerate() {
                    if is_bullet(&line) {
                        apply_list_format(&mut line, list_style);
                        formatted += 1;
                    }
                    if offset == 0 {
                        blocks[index] = Block::Paragraph(line);
                    } else {
                        blocks.insert(index + offset, Block::Paragraph(line));
                    }
                }
                index += count;
            }
            None => {
                if let Block::Paragraph(paragraph) = &mut blocks[index] {
                    if is_bullet(paragraph) {
                        apply_list_format(paragraph, list_style);
                        formatted += 1;
                    }
                }
                index += 1;
            }
        }
    }
    formatted
}

fn is_bullet(paragraph: &Paragraph) -> bool {
    paragraph.text().trim_start().starts_with(BULLET)
}

/// One paragraph per line of a paragraph holding bullets and line breaks.
///
/// Runs keep their formatting on whichever line they fall. The first line keeps
/// the source paragraph; later lines copy its style and properties. Blank lines
/// are dropped.
fn split_lines(paragraph: &Paragraph) -> Option<Vec<Paragraph>> {
    let text = paragraph.text();
    if !text.contains(BULLET) || !text.contains('\n') {
        return None;
    }

    let mut lines: Vec<Vec<Inline>> = Vec::new();
    let mut current: Vec<Inline> = Vec::new();
    for inline in &paragraph.content {
        match inline {
            Inline::Run(run) => {
                for (i, piece) in run.text.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(std::mem::take(&mut current));
                    }
                    if !piece.is_empty() {
                        current.push(Inline::Run(Run::formatted(piece, run.format.clone())));
                    }
                }
            }
            other => current.push(other.clone()),
        }
    }
    lines.push(current);

    let mut out = Vec::with_capacity(lines.len());
    for (i, mut content) in lines.into_iter().enumerate() {
        trim_line(&mut content);
        if i == 0 {
            out.push(Paragraph {
                content,
                ..paragraph.clone()
            });
        } else if !content.is_empty() {
            out.push(Paragraph {
                attributes: Vec::new(),
                style: paragraph.style.clone(),
                properties: paragraph.properties.clone(),
                content,
            });
        }
    }
    Some(out)
}

/// Strip whitespace at both ends of a line and drop runs left empty.
fn trim_line(content: &mut Vec<Inline>) {
    for inline in content.iter_mut() {
        if let Inline::Run(run) = inline {
            run.text = run.text.trim_start().to_string();
            if !run.text.is_empty() {
                break;
            }
        }
    }
    for inline in content.iter_mut().rev() {
        if let Inline::Run(run) = inline {
            run.text = run.text.trim_end().to_string();
            if !run.text.is_empty() {
                break;
            }
        }
    }
    content.retain(|inline| !matches!(inline, Inline::Run(run) if run.text.is_empty()));
}

fn apply_list_format(paragraph: &mut Paragraph, list_style: Option<&str>) {
    if let Some(style) = list_style {
        paragraph.style = Some(style.to_string());
    }

    let mut properties = paragraph
        .properties
        .take()
        .unwrap_or_else(|| XmlElement::new("w:pPr"));
    properties.children.retain(|node| {
        !matches!(node, XmlNode::Element(el) if matches!(el.local_name(), "spacing" | "ind"))
    });
    let at = properties
        .children
        .iter()
        .position(|node| {
            matches!(node, XmlNode::Element(el) if AFTER_INDENT.contains(&el.local_name()))
        })
        .unwrap_or(properties.children.len());

    let spacing = XmlElement::new("w:spacing")
        .with_attribute("w:after", SPACING_AFTER)
        .with_attribute("w:line", LINE_SPACING)
        .with_attribute("w:lineRule", "auto");
    let indent = XmlElement::new("w:ind")
        .with_attribute("w:left", INDENT_LEFT)
        .with_attribute("w:hanging", INDENT_HANGING);
    properties.children.insert(at, XmlNode::Element(indent));
    properties.children.insert(at, XmlNode::Element(spacing));
    paragraph.properties = Some(properties);
}
