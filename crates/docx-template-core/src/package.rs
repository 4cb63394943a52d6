//! DOCX container codec.
//!
//! A package is read into an ordered list of `(entry_name, bytes)` parts. Only
//! `word/document.xml` is turned into the editable [`Document`] tree; every other
//! part is written back byte-for-byte and in its original order.

use std::io::{Cursor, Read, Write};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Result, TemplateError};
use crate::model::{
    Block, Document, Inline, Paragraph, RowPart, Run, RunFormat, Table, TableCell, TablePart,
    TableRow,
};
use crate::styles::StyleRegistry;
use crate::xml::{self, XmlElement, XmlNode};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";

/// MIME type of a word-processing package.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Run children that carry no text and can be dropped when a run is edited.
const IGNORED_RUN_CHILDREN: &[&str] = &["lastRenderedPageBreak"];

/// Everything needed to write a loaded document back out.
#[derive(Debug, Clone)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
    /// `w:document` root with an emptied `w:body`.
    root: XmlElement,
}

impl Package {
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }
}

impl Document {
    /// Load a document from `.docx` bytes.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let parts = read_parts(bytes)?;
        Self::from_parts(parts)
    }

    /// A minimal valid document with the built-in paragraph styles.
    pub fn blank() -> Result<Self> {
        let parts = BLANK_PARTS
            .iter()
            .map(|(name, content)| (name.to_string(), content.as_bytes().to_vec()))
            .collect();
        Self::from_parts(parts)
    }

    fn from_parts(parts: Vec<(String, Vec<u8>)>) -> Result<Self> {
        let document_xml = part_text(&parts, DOCUMENT_PART)?.ok_or_else(|| {
            TemplateError::InvalidContainer(format!("missing {}", DOCUMENT_PART))
        })?;
        let mut root = xml::parse(document_xml)
            .map_err(|e| TemplateError::InvalidContainer(format!("{}: {}", DOCUMENT_PART, e)))?;
        if root.local_name() != "document" {
            return Err(TemplateError::InvalidContainer(format!(
                "{} root is <{}>, expected <w:document>",
                DOCUMENT_PART, root.name
            )));
        }
        let body = root.child_mut("body").ok_or_else(|| {
            TemplateError::InvalidContainer(format!("{} has no <w:body>", DOCUMENT_PART))
        })?;
        let blocks: Vec<Block> = std::mem::take(&mut body.children)
            .into_iter()
            .map(block_from_node)
            .collect();

        let styles = match part_text(&parts, STYLES_PART) {
            Ok(Some(styles_xml)) => match xml::parse(styles_xml) {
                Ok(styles_root) => StyleRegistry::from_xml(&styles_root),
                Err(e) => {
                    warn!("Ignoring unreadable {}: {}", STYLES_PART, e);
                    StyleRegistry::default()
                }
            },
            Ok(None) => StyleRegistry::default(),
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", STYLES_PART, e);
                StyleRegistry::default()
            }
        };

        debug!(
            "Loaded document with {} body blocks, {} paragraph styles, {} parts",
            blocks.len(),
            styles.len(),
            parts.len()
        );

        Ok(Document {
            body: blocks,
            styles,
            package: Package { parts, root },
        })
    }

    /// Serialize the document back to `.docx` bytes.
    pub fn save(&self) -> Result<Vec<u8>> {
        let mut root = self.package.root.clone();
        let body = root
            .child_mut("body")
            .ok_or_else(|| TemplateError::Xml("document root lost its <w:body>".to_string()))?;
        body.children = self.body.iter().map(block_to_node).collect();
        let document_xml = xml::write(&root)?;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, data) in &self.package.parts {
            let options = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            let data = if name == DOCUMENT_PART {
                &document_xml
            } else {
                data
            };
            writer
                .start_file(name.as_str(), options)
                .map_err(std::io::Error::other)?;
            writer.write_all(data)?;
        }

        let cursor = writer.finish().map_err(std::io::Error::other)?;
        Ok(cursor.into_inner())
    }

    pub fn package(&self) -> &Package {
        &self.package
    }
}

fn read_parts(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut parts = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| TemplateError::InvalidContainer(format!("{}: {}", name, e)))?;
        parts.push((name, data));
    }
    Ok(parts)
}

fn part_text<'a>(parts: &'a [(String, Vec<u8>)], name: &str) -> Result<Option<&'a str>> {
    match parts.iter().find(|(part, _)| part == name) {
        Some((_, data)) => {
            let data: &[u8] = data;
            let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
            std::str::from_utf8(data)
                .map(Some)
                .map_err(|e| TemplateError::InvalidContainer(format!("{}: {}", name, e)))
        }
        None => Ok(None),
    }
}

// ─── XML → model ────────────────────────────────────────────────────────────

fn block_from_node(node: XmlNode) -> Block {
    match node {
        XmlNode::Element(el) => match el.local_name() {
            "p" => Block::Paragraph(paragraph_from_element(el)),
            "tbl" => Block::Table(table_from_element(el)),
            "sectPr" => Block::Section(el),
            _ => Block::Raw(XmlNode::Element(el)),
        },
        other => Block::Raw(other),
    }
}

fn paragraph_from_element(el: XmlElement) -> Paragraph {
    let mut paragraph = Paragraph {
        attributes: el.attributes,
        ..Paragraph::default()
    };

    for node in el.children {
        let child = match node {
            XmlNode::Element(child) => child,
            other => {
                paragraph.content.push(Inline::Raw(other));
                continue;
            }
        };
        match child.local_name() {
            "pPr" => {
                let (style, properties) = split_paragraph_properties(child);
                paragraph.style = style;
                paragraph.properties = Some(properties);
            }
            "r" => paragraph.content.push(inline_from_run(child)),
            "bookmarkStart" => paragraph.content.push(Inline::BookmarkStart {
                id: child.attribute("id").unwrap_or_default().to_string(),
                name: child.attribute("name").unwrap_or_default().to_string(),
            }),
            "bookmarkEnd" => paragraph.content.push(Inline::BookmarkEnd {
                id: child.attribute("id").unwrap_or_default().to_string(),
            }),
            _ => paragraph.content.push(Inline::Raw(XmlNode::Element(child))),
        }
    }
    paragraph
}

/// Pull `w:pStyle` out of a `w:pPr` element.
fn split_paragraph_properties(mut properties: XmlElement) -> (Option<String>, XmlElement) {
    let mut style = None;
    properties.children.retain(|node| match node {
        XmlNode::Element(el) if el.local_name() == "pStyle" => {
            style = el.attribute("val").map(str::to_string);
            false
        }
        _ => true,
    });
    (style, properties)
}

/// A `w:r` becomes an editable [`Run`] only when it holds nothing but text,
/// tabs and line breaks; anything else is kept raw.
fn inline_from_run(el: XmlElement) -> Inline {
    match run_from_element(&el) {
        Some(run) => Inline::Run(run),
        None => Inline::Raw(XmlNode::Element(el)),
    }
}

fn run_from_element(el: &XmlElement) -> Option<Run> {
    let mut format = RunFormat::plain();
    let mut text = String::new();

    for node in &el.children {
        match node {
            XmlNode::Element(child) => match child.local_name() {
                "rPr" => format = RunFormat::from_properties(child.clone()),
                "t" => text.push_str(&child.text_content()),
                "tab" => text.push('\t'),
                "cr" => text.push('\n'),
                "br" if matches!(child.attribute("type"), None | Some("textWrapping")) => {
                    text.push('\n')
                }
                name if IGNORED_RUN_CHILDREN.contains(&name) => {}
                _ => return None,
            },
            XmlNode::Text(ws) if ws.trim().is_empty() => {}
            _ => return None,
        }
    }

    Some(Run { text, format })
}

fn table_from_element(el: XmlElement) -> Table {
    let parts = el
        .children
        .into_iter()
        .map(|node| match node {
            XmlNode::Element(row) if row.local_name() == "tr" => TablePart::Row(row_from_element(row)),
            other => TablePart::Raw(other),
        })
        .collect();
    Table {
        attributes: el.attributes,
        parts,
    }
}

fn row_from_element(el: XmlElement) -> TableRow {
    let parts = el
        .children
        .into_iter()
        .map(|node| match node {
            XmlNode::Element(cell) if cell.local_name() == "tc" => RowPart::Cell(TableCell {
                attributes: cell.attributes,
                blocks: cell.children.into_iter().map(block_from_node).collect(),
            }),
            other => RowPart::Raw(other),
        })
        .collect();
    TableRow {
        attributes: el.attributes,
        parts,
    }
}

// ─── model → XML ────────────────────────────────────────────────────────────

fn block_to_node(block: &Block) -> XmlNode {
    match block {
        Block::Paragraph(paragraph) => XmlNode::Element(paragraph_to_element(paragraph)),
        Block::Table(table) => XmlNode::Element(table_to_element(table)),
        Block::Section(el) => XmlNode::Element(el.clone()),
        Block::Raw(node) => node.clone(),
    }
}

fn paragraph_to_element(paragraph: &Paragraph) -> XmlElement {
    let mut el = XmlElement::new("w:p");
    el.attributes = paragraph.attributes.clone();

    let mut properties = paragraph
        .properties
        .clone()
        .unwrap_or_else(|| XmlElement::new("w:pPr"));
    if let Some(style) = &paragraph.style {
        properties.children.insert(
            0,
            XmlNode::Element(XmlElement::new("w:pStyle").with_attribute("w:val", style.as_str())),
        );
    }
    if !properties.children.is_empty() || !properties.attributes.is_empty() {
        el.children.push(XmlNode::Element(properties));
    }

    for inline in &paragraph.content {
        let node = match inline {
            Inline::Run(run) => XmlNode::Element(run_to_element(run)),
            Inline::BookmarkStart { id, name } => XmlNode::Element(
                XmlElement::new("w:bookmarkStart")
                    .with_attribute("w:id", id.as_str())
                    .with_attribute("w:name", name.as_str()),
            ),
            Inline::BookmarkEnd { id } => {
                XmlNode::Element(XmlElement::new("w:bookmarkEnd").with_attribute("w:id", id.as_str()))
            }
            Inline::Raw(node) => node.clone(),
        };
        el.children.push(node);
    }
    el
}

fn run_to_element(run: &Run) -> XmlElement {
    let mut el = XmlElement::new("w:r");
    if let Some(properties) = run.format.properties() {
        el.children.push(XmlNode::Element(properties.clone()));
    }

    let mut pending = String::new();
    for ch in run.text.chars() {
        match ch {
            '\t' | '\n' => {
                flush_text(&mut el, &mut pending);
                let name = if ch == '\t' { "w:tab" } else { "w:br" };
                el.children.push(XmlNode::Element(XmlElement::new(name)));
            }
            _ => pending.push(ch),
        }
    }
    flush_text(&mut el, &mut pending);
    el
}

fn flush_text(run: &mut XmlElement, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let text = XmlElement::new("w:t")
        .with_attribute("xml:space", "preserve")
        .with_text(std::mem::take(pending));
    run.children.push(XmlNode::Element(text));
}

fn table_to_element(table: &Table) -> XmlElement {
    let mut el = XmlElement::new("w:tbl");
    el.attributes = table.attributes.clone();
    for part in &table.parts {
        let node = match part {
            TablePart::Row(row) => XmlNode::Element(row_to_element(row)),
            TablePart::Raw(node) => node.clone(),
        };
        el.children.push(node);
    }
    el
}

fn row_to_element(row: &TableRow) -> XmlElement {
    let mut el = XmlElement::new("w:tr");
    el.attributes = row.attributes.clone();
    for part in &row.parts {
        let node = match part {
            RowPart::Cell(cell) => {
                let mut tc = XmlElement::new("w:tc");
                tc.attributes = cell.attributes.clone();
                tc.children = cell.blocks.iter().map(block_to_node).collect();
                XmlNode::Element(tc)
            }
            RowPart::Raw(node) => node.clone(),
        };
        el.children.push(node);
    }
    el
}

// ─── Blank package ──────────────────────────────────────────────────────────

const BLANK_PARTS: &[(&str, &str)] = &[
    ("[Content_Types].xml", CONTENT_TYPES_XML),
    ("_rels/.rels", ROOT_RELS_XML),
    ("word/document.xml", DOCUMENT_XML),
    ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML),
    ("word/styles.xml", STYLES_XML),
];

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:qFormat/><w:rPr><w:sz w:val="56"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="Heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="Heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="120"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr><w:ind w:left="720"/></w:pPr></w:style></w:styles>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blank_document_has_section_and_styles() {
        let doc = Document::blank().unwrap();
        assert!(matches!(doc.body.last(), Some(Block::Section(_))));
        assert_eq!(doc.styles().resolve("Heading 1"), Some("Heading1"));
        assert_eq!(doc.styles().default_style_id(), Some("Normal"));
    }

    #[test]
    fn test_save_then_load_keeps_runs_and_formats() {
        let mut doc = Document::blank().unwrap();
        doc.push_paragraph(
            Paragraph::new()
                .with_style("Heading1")
                .with_run(Run::new("Plain "))
                .with_run(Run::formatted("bold", RunFormat::bold()))
                .with_run(Run::new("\tafter tab\nnext line")),
        );

        let bytes = doc.save().unwrap();
        let reloaded = Document::load(&bytes).unwrap();

        let paragraphs = reloaded.paragraphs();
        assert_eq!(paragraphs.len(), 1);
        let paragraph = paragraphs[0];
        assert_eq!(paragraph.style.as_deref(), Some("Heading1"));
        assert_eq!(paragraph.text(), "Plain bold\tafter tab\nnext line");
        let formats: Vec<_> = paragraph.runs().map(|r| r.format.clone()).collect();
        assert_eq!(
            formats,
            vec![RunFormat::plain(), RunFormat::bold(), RunFormat::plain()]
        );
        assert!(matches!(reloaded.body.last(), Some(Block::Section(_))));
    }

    #[test]
    fn test_save_keeps_every_part_in_order() {
        let doc = Document::blank().unwrap();
        let bytes = doc.save().unwrap();
        let reloaded = Document::load(&bytes).unwrap();
        let names: Vec<_> = reloaded.package().part_names().collect();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "word/document.xml",
                "word/_rels/document.xml.rels",
                "word/styles.xml",
            ]
        );
    }

    #[test]
    fn test_runs_with_drawings_stay_raw() {
        let run = xml::parse(
            r#"<w:r xmlns:w="urn:w"><w:rPr><w:b/></w:rPr><w:drawing><w:inline/></w:drawing></w:r>"#,
        )
        .unwrap();
        assert!(matches!(inline_from_run(run), Inline::Raw(_)));
    }

    #[test]
    fn test_load_rejects_non_zip_bytes() {
        let err = Document::load(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidContainer(_)));
    }

    #[test]
    fn test_load_rejects_zip_without_document_part() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("hello.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = Document::load(&bytes).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidContainer(_)));
    }
}
