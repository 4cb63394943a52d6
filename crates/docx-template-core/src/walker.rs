//! Document-wide search and replace.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TemplateError};
use crate::locate::locate;
use crate::model::{Document, Paragraph};
use crate::rewrite::rewrite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOptions {
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default = "default_true")]
    pub preserve_formatting: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            preserve_formatting: true,
        }
    }
}

/// Replace every occurrence of `search` in one paragraph.
pub fn replace_in_paragraph(
    paragraph: &mut Paragraph,
    search: &str,
    replace: &str,
    options: ReplaceOptions,
) -> usize {
    let occurrences = locate(paragraph, search, options.case_sensitive);
    // Right to left so earlier offsets stay valid.
    occurrences
        .iter()
        .rev()
        .map(|occurrence| rewrite(paragraph, occurrence, replace, options.preserve_formatting))
        .sum()
}

/// Replace every occurrence of `search` in document order and return the count.
pub fn replace_all(
    document: &mut Document,
    search: &str,
    replace: &str,
    options: ReplaceOptions,
) -> usize {
    let count: usize = document
        .paragraphs_mut()
        .into_iter()
        .map(|paragraph| replace_in_paragraph(paragraph, search, replace, options))
        .sum();
    tracing::debug!("Replaced {} occurrence(s) of '{}'", count, search);
    count
}

/// Like [`replace_all`], but a document without any occurrence is an error.
pub fn replace_required(
    document: &mut Document,
    search: &str,
    replace: &str,
    options: ReplaceOptions,
) -> Result<usize> {
    match replace_all(document, search, replace, options) {
        0 => Err(TemplateError::TextNotFound(search.to_string())),
        count => Ok(count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Run, RunFormat, Table};
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
    fn test_case_insensitive_old_scenario() {
        let mut doc = document(&["OLD text old"]);
        let options = ReplaceOptions {
            case_sensitive: false,
            ..Default::default()
        };

        assert_eq!(replace_all(&mut doc, "Old", "New", options), 2);
        assert_eq!(doc.text(), "New text New");
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_second_pass_is_a_no_op(#[case] preserve_formatting: bool) {
        let mut doc = document(&["alpha beta alpha", "gamma alpha"]);
        let options = ReplaceOptions {
            preserve_formatting,
            ..Default::default()
        };

        assert_eq!(replace_all(&mut doc, "alpha", "omega", options), 3);
        let after_first = doc.text();
        assert_eq!(replace_all(&mut doc, "alpha", "omega", options), 0);
        assert_eq!(doc.text(), after_first);
        assert_eq!(after_first, "omega beta omega\ngamma omega");
    }

    #[test]
    fn test_missing_text_leaves_paragraph_untouched() {
        let mut paragraph = Paragraph::new()
            .with_run(Run::new("keep "))
            .with_run(Run::formatted("me", RunFormat::bold()));
        let before = paragraph.clone();

        let count =
            replace_in_paragraph(&mut paragraph, "absent", "x", ReplaceOptions::default());

        assert_eq!(count, 0);
        assert_eq!(paragraph, before);
    }

    #[test]
    fn test_multiple_matches_in_one_run_with_longer_replacement() {
        let mut paragraph = Paragraph::with_text("a-a-a");
        let count = replace_in_paragraph(&mut paragraph, "a", "xyz", ReplaceOptions::default());

        assert_eq!(count, 3);
        assert_eq!(paragraph.text(), "xyz-xyz-xyz");
    }

    #[test]
    fn test_reaches_table_cells() {
        let mut doc = document(&["intro {{x}}"]);
        doc.push_table(Table::from_rows(&[&["{{x}}", "other"]]));

        let count = replace_all(&mut doc, "{{x}}", "42", ReplaceOptions::default());

        assert_eq!(count, 2);
        assert_eq!(doc.text(), "intro 42\n42\nother");
    }

    #[test]
    fn test_replace_required_reports_not_found() {
        let mut doc = document(&["nothing to see"]);
        let err = replace_required(&mut doc, "X", "Y", ReplaceOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Text 'X' not found in document");
    }
}
