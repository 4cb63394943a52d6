//! Minimal lossless XML element tree for DOCX parts.
//!
//! Parts are read with `quick-xml` into [`XmlElement`] trees so that everything
//! the templating engine does not understand can be written back untouched.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, TemplateError};

/// A node in an XML element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

/// An XML element with its qualified name, attributes in source order, and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Name without namespace prefix (`w:p` -> `p`).
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Attribute value looked up by local name.
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local(key) == local_name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local_name)
    }

    pub fn child_mut(&mut self, local_name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(el) if el.local_name() == local_name => Some(el),
            _ => None,
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for node in &el.children {
        match node {
            XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
            XmlNode::Element(child) => collect_text(child, out),
            XmlNode::Comment(_) => {}
        }
    }
}

fn local(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

/// Parse an XML part and return its root element.
///
/// The declaration, doctype and processing instructions are dropped; [`write`]
/// always emits the standard OOXML declaration.
pub fn parse(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let el = element_from_start(&start)?;
                attach(&mut stack, &mut root, XmlNode::Element(el));
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| TemplateError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, XmlNode::Element(el));
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::CData(String::from_utf8_lossy(&data).into_owned()));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Comment(String::from_utf8_lossy(&comment).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(TemplateError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| TemplateError::Xml("document has no root element".to_string()))
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement> {
    let mut el = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if let XmlNode::Element(el) = node {
                if root.is_none() {
                    *root = Some(el);
                }
            }
        }
    }
}

/// Serialize a root element as a standalone UTF-8 XML part.
pub fn write(root: &XmlElement) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Text(BytesText::from_escaped("\r\n")))?;
    write_element(&mut writer, root)?;
    Ok(writer.into_inner().into_inner())
}

fn write_element<W: Write>(writer: &mut Writer<W>, el: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for node in &el.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
            XmlNode::Comment(comment) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_keeps_attributes_and_entities() {
        let root = parse(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="urn:w"><w:body><w:p w:rsidR="00A1"><w:r><w:t xml:space="preserve">Fish &amp; chips </w:t></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();

        assert_eq!(root.local_name(), "document");
        let body = root.child("body").unwrap();
        let p = body.child("p").unwrap();
        assert_eq!(p.attribute("rsidR"), Some("00A1"));
        assert_eq!(p.text_content(), "Fish & chips ");
    }

    #[test]
    fn test_write_then_parse_is_stable() {
        let root = XmlElement::new("w:document")
            .with_attribute("xmlns:w", "urn:w")
            .with_child(
                XmlElement::new("w:body").with_child(
                    XmlElement::new("w:p").with_child(
                        XmlElement::new("w:r").with_child(XmlElement::new("w:t").with_text("a < b \"q\"")),
                    ),
                ),
            );

        let bytes = write(&root).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));

        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn test_parse_rejects_truncated_xml() {
        assert!(parse("<w:document><w:body>").is_err());
        assert!(parse("not xml at all").is_err());
    }
}
