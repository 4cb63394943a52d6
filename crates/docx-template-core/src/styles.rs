//! Paragraph style registry read from `word/styles.xml`.

use crate::xml::XmlElement;

const FALLBACK_DISPLAY_NAME: &str = "Normal";

#[derive(Debug, Clone, PartialEq, Eq)]
struct StyleEntry {
    id: String,
    name: String,
    is_default: bool,
}

/// Paragraph styles declared by the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleRegistry {
    entries: Vec<StyleEntry>,
}

impl StyleRegistry {
    /// Collect `w:style w:type="paragraph"` declarations from a styles part root.
    pub fn from_xml(root: &XmlElement) -> Self {
        let entries = root
            .elements()
            .filter(|el| el.local_name() == "style" && el.attribute("type") == Some("paragraph"))
            .filter_map(|el| {
                let id = el.attribute("styleId")?.to_string();
                let name = el
                    .child("name")
                    .and_then(|n| n.attribute("val"))
                    .unwrap_or(id.as_str())
                    .to_string();
                let is_default = matches!(el.attribute("default"), Some("1") | Some("true"));
                Some(StyleEntry {
                    id,
                    name,
                    is_default,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Style id for a display name or id, compared case-insensitively.
    pub fn resolve(&self, name_or_id: &str) -> Option<&str> {
        let wanted = name_or_id.trim();
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(wanted))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| entry.id.eq_ignore_ascii_case(wanted))
            })
            .map(|entry| entry.id.as_str())
    }

    pub fn default_style_id(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.is_default)
            .map(|entry| entry.id.as_str())
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.name.as_str())
    }

    /// Display name of the default paragraph style.
    pub fn default_display_name(&self) -> &str {
        self.entries
            .iter()
            .find(|entry| entry.is_default)
            .map(|entry| entry.name.as_str())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    fn registry() -> StyleRegistry {
        let root = xml::parse(
            r#"<w:styles xmlns:w="urn:w">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="character" w:styleId="Strong"><w:name w:val="Strong"/></w:style>
</w:styles>"#,
        )
        .unwrap();
        StyleRegistry::from_xml(&root)
    }

    #[test]
    fn test_only_paragraph_styles_are_registered() {
        let styles = registry();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles.resolve("Strong"), None);
    }

    #[test]
    fn test_resolve_by_name_or_id() {
        let styles = registry();
        assert_eq!(styles.resolve("Heading 1"), Some("Heading1"));
        assert_eq!(styles.resolve("heading1"), Some("Heading1"));
        assert_eq!(styles.resolve("Nope"), None);
        assert_eq!(styles.default_style_id(), Some("Normal"));
    }
}
