//! Batched edit operations with per-operation outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Document;
use crate::walker::{replace_all, ReplaceOptions};

/// One edit against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Replace {
        search: String,
        replace: String,
        options: ReplaceOptions,
    },
    AddParagraph {
        text: String,
        style: Option<String>,
    },
    InsertAtBookmark {
        bookmark: String,
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Replace,
    AddParagraph,
    InsertAtBookmark,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Replace => "replace",
            OperationKind::AddParagraph => "add_paragraph",
            OperationKind::InsertAtBookmark => "insert",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "replace" => Some(OperationKind::Replace),
            "add_paragraph" => Some(OperationKind::AddParagraph),
            "insert" => Some(OperationKind::InsertAtBookmark),
            _ => None,
        }
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Replace { .. } => OperationKind::Replace,
            Operation::AddParagraph { .. } => OperationKind::AddParagraph,
            Operation::InsertAtBookmark { .. } => OperationKind::InsertAtBookmark,
        }
    }
}

/// Wire form of an operation: a flat object tagged by `operation_type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation_type: String,
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub replace_text: Option<String>,
    #[serde(default)]
    pub new_text: Option<String>,
    #[serde(default = "default_true")]
    pub preserve_formatting: bool,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub bookmark_name: Option<String>,
    #[serde(default)]
    pub style_name: Option<String>,
}

fn default_true() -> bool {
    true
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TryFrom<OperationRequest> for Operation {
    type Error = SoftFailure;

    fn try_from(request: OperationRequest) -> Result<Self, Self::Error> {
        match OperationKind::parse(&request.operation_type) {
            Some(OperationKind::Replace) => {
                match (non_empty(request.search_text), request.replace_text) {
                    (Some(search), Some(replace)) => Ok(Operation::Replace {
                        search,
                        replace,
                        options: ReplaceOptions {
                            case_sensitive: request.case_sensitive,
                            preserve_formatting: request.preserve_formatting,
                        },
                    }),
                    _ => Err(SoftFailure::InvalidOperation(
                        "Replace operation requires search_text and replace_text".to_string(),
                    )),
                }
            }
            Some(OperationKind::AddParagraph) => match non_empty(request.new_text) {
                Some(text) => Ok(Operation::AddParagraph {
                    text,
                    style: non_empty(request.style_name),
                }),
                None => Err(SoftFailure::InvalidOperation(
                    "Add paragraph operation requires new_text".to_string(),
                )),
            },
            Some(OperationKind::InsertAtBookmark) => {
                match (non_empty(request.bookmark_name), non_empty(request.new_text)) {
                    (Some(bookmark), Some(text)) => Ok(Operation::InsertAtBookmark { bookmark, text }),
                    _ => Err(SoftFailure::InvalidOperation(
                        "Insert operation requires bookmark_name and new_text".to_string(),
                    )),
                }
            }
            None => Err(SoftFailure::InvalidOperation(format!(
                "Unknown operation type: {}",
                request.operation_type
            ))),
        }
    }
}

/// Why an individual operation did not apply. Never fails the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SoftFailure {
    #[error("Text '{0}' not found in document")]
    TextNotFound(String),

    #[error("Bookmark '{0}' not found")]
    BookmarkNotFound(String),

    #[error("{0}")]
    InvalidOperation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied {
        kind: OperationKind,
        /// Set for replace operations.
        replacements: Option<usize>,
    },
    Failed {
        kind: Option<OperationKind>,
        failure: SoftFailure,
    },
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, OperationOutcome::Applied { .. })
    }

    pub fn failure(&self) -> Option<&SoftFailure> {
        match self {
            OperationOutcome::Failed { failure, .. } => Some(failure),
            OperationOutcome::Applied { .. } => None,
        }
    }
}

/// Per-operation outcomes in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub success_count: usize,
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchReport {
    fn record(&mut self, outcome: OperationOutcome) {
        if outcome.is_applied() {
            self.success_count += 1;
        }
        self.outcomes.push(outcome);
    }

    /// Soft failure messages in request order.
    pub fn errors(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(OperationOutcome::failure)
            .map(ToString::to_string)
            .collect()
    }
}

fn apply_one(document: &mut Document, operation: Operation) -> OperationOutcome {
    let kind = operation.kind();
    match operation {
        Operation::Replace {
            search,
            replace,
            options,
        } => match replace_all(document, &search, &replace, options) {
            0 => OperationOutcome::Failed {
                kind: Some(kind),
                failure: SoftFailure::TextNotFound(search),
            },
            count => OperationOutcome::Applied {
                kind,
                replacements: Some(count),
            },
        },
        Operation::AddParagraph { text, style } => {
            document.add_paragraph(&text, style.as_deref());
            OperationOutcome::Applied {
                kind,
                replacements: None,
            }
        }
        Operation::InsertAtBookmark { bookmark, text } => {
            if document.insert_at_bookmark(&bookmark, &text) {
                OperationOutcome::Applied {
                    kind,
                    replacements: None,
                }
            } else {
                OperationOutcome::Failed {
                    kind: Some(kind),
                    failure: SoftFailure::BookmarkNotFound(bookmark),
                }
            }
        }
    }
}

/// Apply operations in order. A failed operation is recorded and skipped.
pub fn apply(document: &mut Document, operations: impl IntoIterator<Item = Operation>) -> BatchReport {
    let mut report = BatchReport::default();
    for (index, operation) in operations.into_iter().enumerate() {
        let outcome = apply_one(document, operation);
        log_outcome(index, &outcome);
        report.record(outcome);
    }
    report
}

/// Apply wire requests; malformed ones become `InvalidOperation` outcomes in place.
pub fn apply_requests(document: &mut Document, requests: Vec<OperationRequest>) -> BatchReport {
    let mut report = BatchReport::default();
    for (index, request) in requests.into_iter().enumerate() {
        let kind = OperationKind::parse(&request.operation_type);
        let outcome = match Operation::try_from(request) {
            Ok(operation) => apply_one(document, operation),
            Err(failure) => OperationOutcome::Failed { kind, failure },
        };
        log_outcome(index, &outcome);
        report.record(outcome);
    }
    report
}

fn log_outcome(index: usize, outcome: &OperationOutcome) {
    match outcome {
        OperationOutcome::Applied { kind, replacements } => {
            tracing::debug!(
                "Operation {} ({}) applied, replacements: {:?}",
                index,
                kind.as_str(),
                replacements
            );
        }
        OperationOutcome::Failed { failure, .. } => {
            tracing::warn!("Operation {} failed: {}", index, failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Inline, Paragraph};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn document_with_bookmark() -> Document {
        let mut doc = Document::blank().unwrap();
        let mut paragraph = Paragraph::with_text("Signed: ");
        paragraph.content.push(Inline::BookmarkStart {
            id: "0".to_string(),
            name: "signature".to_string(),
        });
        paragraph.content.push(Inline::BookmarkEnd { id: "0".to_string() });
        doc.push_paragraph(paragraph);
        doc
    }

    #[test]
    fn test_failing_batch_leaves_document_unchanged() {
        let mut doc = document_with_bookmark();
        let before = doc.body.clone();

        let report = apply(
            &mut doc,
            vec![
                Operation::Replace {
                    search: "X".to_string(),
                    replace: "Y".to_string(),
                    options: ReplaceOptions::default(),
                },
                Operation::InsertAtBookmark {
                    bookmark: "missing".to_string(),
                    text: "Z".to_string(),
                },
            ],
        );

        assert_eq!(report.success_count, 0);
        assert_eq!(
            report.errors(),
            vec!["Text 'X' not found in document", "Bookmark 'missing' not found"]
        );
        assert_eq!(doc.body, before);
    }

    #[test]
    fn test_failure_does_not_stop_later_operations() {
        let mut doc = document_with_bookmark();

        let report = apply(
            &mut doc,
            vec![
                Operation::InsertAtBookmark {
                    bookmark: "nope".to_string(),
                    text: "x".to_string(),
                },
                Operation::InsertAtBookmark {
                    bookmark: "signature".to_string(),
                    text: "Kay".to_string(),
                },
                Operation::AddParagraph {
                    text: "P.S.".to_string(),
                    style: Some("Heading 1".to_string()),
                },
            ],
        );

        assert_eq!(report.success_count, 2);
        assert!(!report.outcomes[0].is_applied());
        assert_eq!(doc.text(), "Signed: Kay\nP.S.");
        assert_eq!(doc.paragraphs()[1].style.as_deref(), Some("Heading1"));
    }

    #[rstest]
    #[case(r#"{"operation_type": "replace", "search_text": "a"}"#, "Replace operation requires search_text and replace_text")]
    #[case(r#"{"operation_type": "add_paragraph"}"#, "Add paragraph operation requires new_text")]
    #[case(r#"{"operation_type": "insert", "new_text": "x"}"#, "Insert operation requires bookmark_name and new_text")]
    #[case(r#"{"operation_type": "delete"}"#, "Unknown operation type: delete")]
    fn test_invalid_requests(#[case] raw: &str, #[case] message: &str) {
        let request: OperationRequest = serde_json::from_str(raw).unwrap();
        let err = Operation::try_from(request).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_apply_requests_keeps_slots() {
        let mut doc = Document::blank().unwrap();
        doc.push_paragraph(Paragraph::with_text("Old value"));
        let requests: Vec<OperationRequest> = serde_json::from_str(
            r#"[
                {"operation_type": "bogus"},
                {"operation_type": "replace", "search_text": "old", "replace_text": "New", "case_sensitive": false}
            ]"#,
        )
        .unwrap();

        let report = apply_requests(&mut doc, requests);

        assert_eq!(report.success_count, 1);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(
            report.outcomes[1],
            OperationOutcome::Applied {
                kind: OperationKind::Replace,
                replacements: Some(1)
            }
        );
        assert_eq!(doc.text(), "New value");
    }
}
