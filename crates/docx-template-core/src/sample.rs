//! Built-in documents served by the sample endpoints.

use crate::error::Result;
use crate::model::{Document, Paragraph, Run, RunFormat, Table};

const HEADING_1: &str = "Heading1";
const HEADING_2: &str = "Heading2";

/// A short document mixing bold, italic and underlined runs with a table.
pub fn sample_document() -> Result<Document> {
    let mut doc = Document::blank()?;

    doc.push_paragraph(Paragraph::with_text("Sample Document").with_style(HEADING_1));
    doc.push_paragraph(
        Paragraph::new()
            .with_run(Run::new("This is a "))
            .with_run(Run::formatted("bold", RunFormat::bold()))
            .with_run(Run::new(" word in a sentence.")),
    );
    doc.push_paragraph(
        Paragraph::new()
            .with_run(Run::new("This paragraph has some "))
            .with_run(Run::formatted("italic text", RunFormat::italic()))
            .with_run(Run::new(" and some "))
            .with_run(Run::formatted("underlined text", RunFormat::underline()))
            .with_run(Run::new(".")),
    );
    doc.push_table(Table::from_rows(&[
        &["Name", "Value"],
        &["Sample Item", "Sample Value"],
    ]));
    doc.push_paragraph(Paragraph::with_text(
        "This is a paragraph that can be modified during testing.",
    ));

    Ok(doc)
}

/// A resume skeleton using the catalogued `{{PLACEHOLDER}}` tokens.
pub fn resume_template() -> Result<Document> {
    let mut doc = Document::blank()?;

    doc.push_paragraph(Paragraph::with_text("{{NAME}}").with_style(HEADING_1));
    doc.push_paragraph(Paragraph::with_text(
        "Phone: {{PHONE}} | Email: {{EMAIL}} | LinkedIn: {{LINKEDIN}}",
    ));

    for (heading, token) in [
        ("PROFESSIONAL SUMMARY", "{{PROFESSIONAL_SUMMARY}}"),
        ("TECHNICAL SKILLS", "{{TECHNICAL_SKILLS}}"),
        ("PROFESSIONAL EXPERIENCE", "{{PROFESSIONAL_EXPERIENCE}}"),
        ("PROJECTS", "{{PROJECTS}}"),
        ("EDUCATION", "{{EDUCATION}}"),
    ] {
        doc.push_paragraph(Paragraph::with_text(heading).with_style(HEADING_2));
        doc.push_paragraph(Paragraph::with_text(token));
    }

    doc.push_paragraph(Paragraph::with_text("\nGenerated on {{CURRENT_DATE}}"));
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::catalog;
    use crate::template::placeholders_in;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sample_document_shape() {
        let doc = sample_document().unwrap();
        let info = doc.info();
        assert_eq!(info.paragraph_count, 4);
        assert_eq!(info.table_count, 1);
        assert!(doc.text().contains("Sample Value"));
    }

    #[test]
    fn test_resume_template_uses_catalogued_placeholders() {
        let doc = resume_template().unwrap();
        let found = placeholders_in(&doc);
        let catalogued: Vec<String> = catalog()
            .iter()
            .map(|info| info.placeholder.trim_matches(|c| c == '{' || c == '}').to_string())
            .collect();
        assert_eq!(found, catalogued);
    }
}
