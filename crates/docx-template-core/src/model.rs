//! Document tree: blocks, paragraphs, and formatted runs.
//!
//! The tree is a plain ownership hierarchy (document owns blocks, paragraphs own
//! inlines, runs own their text and formatting). Anything the engine does not
//! edit is carried as raw XML so it survives a load/save cycle.

use serde::Serialize;

use crate::package::Package;
use crate::styles::StyleRegistry;
use crate::xml::{XmlElement, XmlNode};

/// Opaque run formatting: the run's `w:rPr` element, if any.
///
/// The templating engine never inspects this value; it only keeps it on a run
/// or copies it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFormat(Option<XmlElement>);

impl RunFormat {
    /// No explicit character formatting.
    pub fn plain() -> Self {
        Self(None)
    }

    pub fn from_properties(properties: XmlElement) -> Self {
        Self(Some(properties))
    }

    pub fn bold() -> Self {
        Self::with_toggle(XmlElement::new("w:b"))
    }

    pub fn italic() -> Self {
        Self::with_toggle(XmlElement::new("w:i"))
    }

    pub fn underline() -> Self {
        Self::with_toggle(XmlElement::new("w:u").with_attribute("w:val", "single"))
    }

    fn with_toggle(toggle: XmlElement) -> Self {
        Self(Some(XmlElement::new("w:rPr").with_child(toggle)))
    }

    pub fn properties(&self) -> Option<&XmlElement> {
        self.0.as_ref()
    }

    pub fn is_plain(&self) -> bool {
        self.0.is_none()
    }
}

/// A uniformly formatted span of text.
///
/// Tabs and line breaks inside the run are kept as `\t` and `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: RunFormat::plain(),
        }
    }

    pub fn formatted(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

/// Paragraph-level content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Run(Run),
    BookmarkStart { id: String, name: String },
    BookmarkEnd { id: String },
    /// Hyperlinks, proofing marks, runs with drawings or fields, whitespace.
    Raw(XmlNode),
}

/// Position of one run's text inside its paragraph's logical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunExtent {
    /// Index into [`Paragraph::content`].
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    /// Attributes of the `w:p` element (revision ids and the like).
    pub attributes: Vec<(String, String)>,
    /// Paragraph style id from `w:pStyle`.
    pub style: Option<String>,
    /// Remaining `w:pPr` content, `w:pStyle` removed.
    pub properties: Option<XmlElement>,
    pub content: Vec<Inline>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new().with_run(Run::new(text))
    }

    pub fn with_run(mut self, run: Run) -> Self {
        self.content.push(Inline::Run(run));
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.content.iter().filter_map(|inline| match inline {
            Inline::Run(run) => Some(run),
            _ => None,
        })
    }

    pub fn run_at_mut(&mut self, index: usize) -> Option<&mut Run> {
        match self.content.get_mut(index) {
            Some(Inline::Run(run)) => Some(run),
            _ => None,
        }
    }

    /// Logical text: all run texts concatenated, no separators.
    pub fn text(&self) -> String {
        self.runs().map(|run| run.text.as_str()).collect()
    }

    pub fn run_layout(&self) -> Vec<RunExtent> {
        let mut offset = 0;
        self.content
            .iter()
            .enumerate()
            .filter_map(|(index, inline)| match inline {
                Inline::Run(run) => {
                    let start = offset;
                    offset += run.text.len();
                    Some(RunExtent {
                        index,
                        start,
                        end: offset,
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Inline index of the named bookmark's start anchor.
    pub fn bookmark_position(&self, name: &str) -> Option<usize> {
        self.content.iter().position(|inline| {
            matches!(inline, Inline::BookmarkStart { name: n, .. } if n == name)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub attributes: Vec<(String, String)>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPart {
    Cell(TableCell),
    Raw(XmlNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub attributes: Vec<(String, String)>,
    pub parts: Vec<RowPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablePart {
    Row(TableRow),
    Raw(XmlNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub attributes: Vec<(String, String)>,
    pub parts: Vec<TablePart>,
}

impl Table {
    /// A simple grid table with one plain paragraph per cell.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        let columns = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        let mut grid = XmlElement::new("w:tblGrid");
        for _ in 0..columns {
            grid = grid.with_child(XmlElement::new("w:gridCol").with_attribute("w:w", "4680"));
        }
        let properties = XmlElement::new("w:tblPr").with_child(
            XmlElement::new("w:tblW")
                .with_attribute("w:w", "0")
                .with_attribute("w:type", "auto"),
        );

        let mut parts = vec![
            TablePart::Raw(XmlNode::Element(properties)),
            TablePart::Raw(XmlNode::Element(grid)),
        ];
        for row in rows {
            let cells = row
                .iter()
                .map(|text| {
                    RowPart::Cell(TableCell {
                        attributes: Vec::new(),
                        blocks: vec![Block::Paragraph(Paragraph::with_text(*text))],
                    })
                })
                .collect();
            parts.push(TablePart::Row(TableRow {
                attributes: Vec::new(),
                parts: cells,
            }));
        }

        Self {
            attributes: Vec::new(),
            parts,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &TableRow> {
        self.parts.iter().filter_map(|part| match part {
            TablePart::Row(row) => Some(row),
            _ => None,
        })
    }
}

impl TableRow {
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.parts.iter().filter_map(|part| match part {
            RowPart::Cell(cell) => Some(cell),
            _ => None,
        })
    }
}

/// Body-level content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    /// Final `w:sectPr`; new paragraphs are inserted before it.
    Section(XmlElement),
    Raw(XmlNode),
}

/// Summary of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub paragraph_count: usize,
    pub table_count: usize,
    pub style_count: usize,
    pub styles: Vec<String>,
}

/// An editable DOCX document.
#[derive(Debug, Clone)]
pub struct Document {
    pub body: Vec<Block>,
    pub(crate) styles: StyleRegistry,
    pub(crate) package: Package,
}

impl Document {
    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    /// All paragraphs in document order, including those inside table cells.
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        collect_paragraphs(&self.body, &mut out);
        out
    }

    pub fn paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        let mut out = Vec::new();
        collect_paragraphs_mut(&mut self.body, &mut out);
        out
    }

    /// Document text, one line per paragraph.
    pub fn text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Append a paragraph at the end of the body, ahead of the section properties.
    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        let at = self
            .body
            .iter()
            .rposition(|block| matches!(block, Block::Section(_)))
            .unwrap_or(self.body.len());
        self.body.insert(at, Block::Paragraph(paragraph));
    }

    pub fn push_table(&mut self, table: Table) {
        let at = self
            .body
            .iter()
            .rposition(|block| matches!(block, Block::Section(_)))
            .unwrap_or(self.body.len());
        self.body.insert(at, Block::Table(table));
    }

    /// Append a plain paragraph using the named style.
    ///
    /// The name may be a style's display name or id, matched case-insensitively.
    /// Unknown names fall back to the default paragraph style. Returns the style
    /// id that was applied.
    pub fn add_paragraph(&mut self, text: &str, style_name: Option<&str>) -> Option<String> {
        let style = match style_name {
            Some(name) => match self.styles.resolve(name) {
                Some(id) => Some(id.to_string()),
                None => {
                    tracing::debug!("Unknown paragraph style '{}', using default", name);
                    self.styles.default_style_id().map(str::to_string)
                }
            },
            None => None,
        };

        let mut paragraph = Paragraph::with_text(text);
        paragraph.style = style.clone();
        self.push_paragraph(paragraph);
        style
    }

    /// Insert plain text immediately after the named bookmark's start anchor.
    ///
    /// Returns `false` when no paragraph holds the bookmark.
    pub fn insert_at_bookmark(&mut self, name: &str, text: &str) -> bool {
        for paragraph in self.paragraphs_mut() {
            if let Some(position) = paragraph.bookmark_position(name) {
                paragraph
                    .content
                    .insert(position + 1, Inline::Run(Run::new(text)));
                return true;
            }
        }
        false
    }

    pub fn info(&self) -> DocumentInfo {
        let mut paragraph_count = 0;
        let mut table_count = 0;
        let mut styles: Vec<String> = Vec::new();

        for block in &self.body {
            match block {
                Block::Paragraph(paragraph) => {
                    paragraph_count += 1;
                    let name = match paragraph.style.as_deref() {
                        Some(id) => self.styles.display_name(id).unwrap_or(id).to_string(),
                        None => self.styles.default_display_name().to_string(),
                    };
                    if !styles.contains(&name) {
                        styles.push(name);
                    }
                }
                Block::Table(_) => table_count += 1,
                Block::Section(_) | Block::Raw(_) => {}
            }
        }

        DocumentInfo {
            paragraph_count,
            table_count,
            style_count: styles.len(),
            styles,
        }
    }
}

fn collect_paragraphs<'a>(blocks: &'a [Block], out: &mut Vec<&'a Paragraph>) {
    for block in blocks {
        match block {
            Block::Paragraph(paragraph) => out.push(paragraph),
            Block::Table(table) => {
                for part in &table.parts {
                    if let TablePart::Row(row) = part {
                        for cell in &row.parts {
                            if let RowPart::Cell(cell) = cell {
                                collect_paragraphs(&cell.blocks, out);
                            }
                        }
                    }
                }
            }
            Block::Section(_) | Block::Raw(_) => {}
        }
    }
}

fn collect_paragraphs_mut<'a>(blocks: &'a mut [Block], out: &mut Vec<&'a mut Paragraph>) {
    for block in blocks {
        match block {
            Block::Paragraph(paragraph) => out.push(paragraph),
            Block::Table(table) => {
                for part in &mut table.parts {
                    if let TablePart::Row(row) = part {
                        for cell in &mut row.parts {
                            if let RowPart::Cell(cell) = cell {
                                collect_paragraphs_mut(&mut cell.blocks, out);
                            }
                        }
                    }
                }
            }
            Block::Section(_) | Block::Raw(_) => {}
        }
    }
}
