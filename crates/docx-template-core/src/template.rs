//! `{{placeholder}}` discovery and template filling.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::bullets;
use crate::error::Result;
use crate::model::Document;
use crate::placeholder::{self, CustomMappings, PlaceholderMap};
use crate::walker::{replace_all, ReplaceOptions};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern is valid"));

/// Replacement categories reported after filling a resume template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BasicFields,
    ContactFields,
    TechnicalSkills,
    ProfessionalExperience,
    Projects,
    Education,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::BasicFields,
        Category::ContactFields,
        Category::TechnicalSkills,
        Category::ProfessionalExperience,
        Category::Projects,
        Category::Education,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::BasicFields => "basic_fields",
            Category::ContactFields => "contact_fields",
            Category::TechnicalSkills => "technical_skills",
            Category::ProfessionalExperience => "professional_experience",
            Category::Projects => "projects",
            Category::Education => "education",
        }
    }
}

/// Bucket a placeholder key for reporting.
pub fn categorize(key: &str) -> Category {
    let key = key.to_lowercase();
    if ["contact", "phone", "email", "linkedin"]
        .iter()
        .any(|term| key.contains(term))
    {
        Category::ContactFields
    } else if key.contains("technical_skills") {
        Category::TechnicalSkills
    } else if key.contains("professional_experience")
        || ["company", "location", "title", "duration", "highlights"]
            .iter()
            .any(|slot| is_numbered_slot(&key, slot))
    {
        Category::ProfessionalExperience
    } else if key.contains("project") {
        Category::Projects
    } else if key.contains("education") {
        Category::Education
    } else {
        Category::BasicFields
    }
}

fn is_numbered_slot(key: &str, slot: &str) -> bool {
    key.strip_prefix(slot)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Placeholder keys found in the document, in order of first appearance.
///
/// Tokens are matched against each paragraph's logical text, so a token split
/// across runs is still found.
pub fn placeholders_in(document: &Document) -> Vec<String> {
    scan(document).into_iter().map(|(key, _)| key).collect()
}

/// Each trimmed key with every distinct token spelling seen for it
/// (`{{name}}`, `{{ name }}`).
fn scan(document: &Document) -> Vec<(String, Vec<String>)> {
    let mut found: Vec<(String, Vec<String>)> = Vec::new();
    for paragraph in document.paragraphs() {
        let text = paragraph.text();
        for capture in TOKEN.captures_iter(&text) {
            let key = capture[1].trim();
            if key.is_empty() {
                continue;
            }
            let spelling = &capture[0];
            match found.iter_mut().find(|(known, _)| known == key) {
                Some((_, spellings)) => {
                    if !spellings.iter().any(|s| s == spelling) {
                        spellings.push(spelling.to_string());
                    }
                }
                None => found.push((key.to_string(), vec![spelling.to_string()])),
            }
        }
    }
    found
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub total_replacements: usize,
    pub by_placeholder: BTreeMap<String, usize>,
    pub categories: BTreeMap<Category, usize>,
    /// Keys present in the template but missing from the map; left untouched.
    pub unresolved: Vec<String>,
}

impl FillReport {
    /// Count per category (zeros included) plus `total_replacements`.
    pub fn category_totals(&self) -> BTreeMap<&'static str, usize> {
        let mut totals: BTreeMap<&'static str, usize> = Category::ALL
            .iter()
            .map(|category| {
                (
                    category.as_str(),
                    self.categories.get(category).copied().unwrap_or(0),
                )
            })
            .collect();
        totals.insert("total_replacements", self.total_replacements);
        totals
    }
}

/// Replace every discovered `{{key}}` that has a value in `values`, then
/// expand multi-line bullet values into list paragraphs.
pub fn fill(document: &mut Document, values: &PlaceholderMap) -> FillReport {
    let mut report = FillReport::default();
    let options = ReplaceOptions {
        case_sensitive: true,
        preserve_formatting: true,
    };

    for (key, spellings) in scan(document) {
        let Some(value) = values.get(&key) else {
            tracing::debug!("No value for placeholder '{}'", key);
            report.unresolved.push(key);
            continue;
        };

        let count: usize = spellings
            .iter()
            .map(|token| replace_all(document, token, value, options))
            .sum();
        if count == 0 {
            continue;
        }

        tracing::debug!("Replaced '{}' {} time(s)", key, count);
        report.total_replacements += count;
        *report.by_placeholder.entry(key.clone()).or_default() += count;
        *report.categories.entry(categorize(&key)).or_default() += count;
    }

    if report.total_replacements > 0 {
        let formatted = bullets::expand_bullets(document);
        if formatted > 0 {
            tracing::debug!("Formatted {} bullet paragraph(s)", formatted);
        }
    }

    report
}

/// Resolve `record` against `custom` and fill the document with the result.
pub fn fill_from_record(
    document: &mut Document,
    record: &Value,
    custom: &CustomMappings,
) -> Result<FillReport> {
    let values = placeholder::resolve(record, custom)?;
    let report = fill(document, &values);
    tracing::info!(
        "Filled template: {} replacement(s), {} unresolved",
        report.total_replacements,
        report.unresolved.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, Run, RunFormat};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn document(lines: &[&str]) -> Document {
        let mut doc = Document::blank().unwrap();
        for line in lines {
            doc.push_paragraph(Paragraph::with_text(*line));
        }
        doc
    }

    #[test]
    fn test_hello_name_scenario() {
        let mut doc = document(&["Hello {{name}}, welcome to {{name}}."]);
        let values: PlaceholderMap = [("name", "Kay")].into_iter().collect();

        let report = fill(&mut doc, &values);

        assert_eq!(doc.text(), "Hello Kay, welcome to Kay.");
        assert_eq!(report.total_replacements, 2);
        assert_eq!(report.by_placeholder.get("name"), Some(&2));
    }

    #[test]
    fn test_placeholders_found_across_runs_in_order() {
        let mut doc = document(&["{{b}} then {{a}}", "{{b}} again"]);
        doc.push_paragraph(
            Paragraph::new()
                .with_run(Run::new("{{c"))
                .with_run(Run::formatted("}}", RunFormat::bold())),
        );

        assert_eq!(placeholders_in(&doc), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_unresolved_keys_are_left_in_place() {
        let mut doc = document(&["{{known}} and {{unknown}}"]);
        let values: PlaceholderMap = [("known", "yes")].into_iter().collect();

        let report = fill(&mut doc, &values);

        assert_eq!(doc.text(), "yes and {{unknown}}");
        assert_eq!(report.unresolved, vec!["unknown".to_string()]);
    }

    #[test]
    fn test_every_spelling_of_a_key_is_replaced() {
        let mut doc = document(&["{{name}} and {{ name }}", "{{name }}"]);
        let values: PlaceholderMap = [("name", "Kay")].into_iter().collect();

        let report = fill(&mut doc, &values);

        assert_eq!(doc.text(), "Kay and Kay\nKay");
        assert_eq!(report.total_replacements, 3);
        assert_eq!(report.by_placeholder.get("name"), Some(&3));
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_bullet_values_become_list_paragraphs() {
        let mut doc = document(&["Highlights", "{{highlights1}}", "End"]);
        let record = serde_json::json!({
            "professional_experience": [{ "highlights": ["Shipped it", "Scaled it"] }]
        });

        fill_from_record(&mut doc, &record, &CustomMappings::new()).unwrap();

        let paragraphs = doc.paragraphs();
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(doc.text(), "Highlights\n• Shipped it\n• Scaled it\nEnd");
        assert_eq!(paragraphs[1].style.as_deref(), Some("ListParagraph"));
        assert_eq!(paragraphs[2].style.as_deref(), Some("ListParagraph"));
        assert_eq!(paragraphs[3].style, None);
    }

    #[test]
    fn test_padded_tokens_are_replaced() {
        let mut doc = document(&["Dear {{ name }},"]);
        let values: PlaceholderMap = [("name", "Kay")].into_iter().collect();

        let report = fill(&mut doc, &values);

        assert_eq!(doc.text(), "Dear Kay,");
        assert_eq!(report.total_replacements, 1);
    }

    #[rstest]
    #[case("phone", Category::ContactFields)]
    #[case("contact.email", Category::ContactFields)]
    #[case("TECHNICAL_SKILLS", Category::TechnicalSkills)]
    #[case("professional_experience.0.company", Category::ProfessionalExperience)]
    #[case("company2", Category::ProfessionalExperience)]
    #[case("project1_highlights", Category::Projects)]
    #[case("EDUCATION", Category::Education)]
    #[case("NAME", Category::BasicFields)]
    fn test_categorize(#[case] key: &str, #[case] expected: Category) {
        assert_eq!(categorize(key), expected);
    }

    #[test]
    fn test_fill_from_record_reports_categories() {
        let mut doc = document(&["{{NAME}} <{{EMAIL}}>", "{{company1}}"]);
        let record = serde_json::json!({
            "name": "Ann",
            "contact": { "email": "ann@example.com" },
            "professional_experience": [{ "company": "Acme" }]
        });

        let report = fill_from_record(&mut doc, &record, &CustomMappings::new()).unwrap();

        assert_eq!(doc.text(), "Ann <ann@example.com>\nAcme");
        assert_eq!(report.categories.get(&Category::BasicFields), Some(&1));
        assert_eq!(report.categories.get(&Category::ContactFields), Some(&1));
        assert_eq!(report.categories.get(&Category::ProfessionalExperience), Some(&1));

        let totals = report.category_totals();
        assert_eq!(totals.get("education"), Some(&0));
        assert_eq!(totals.get("total_replacements"), Some(&3));
    }
}
