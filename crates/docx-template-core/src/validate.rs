//! Structural checks on resume records.

use serde::Serialize;
use serde_json::Value;

const REQUIRED_FIELDS: &[&str] = &["name", "contact", "professional_summary"];
const CONTACT_FIELDS: &[&str] = &["phone", "email"];
const LIST_FIELDS: &[&str] = &[
    "technical_skills",
    "professional_experience",
    "projects",
    "education",
];

/// Structural checks on a resume record. Never blocks generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate_record(record: &Value) -> ValidationReport {
    let Some(fields) = record.as_object() else {
        return ValidationReport {
            valid: false,
            errors: vec!["Resume data must be a JSON object".to_string()],
            warnings: Vec::new(),
        };
    };

    let mut errors: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !fields.contains_key(**field))
        .map(|field| format!("Missing required field: {}", field))
        .collect();

    let mut warnings = Vec::new();
    if let Some(contact) = fields.get("contact") {
        for field in CONTACT_FIELDS {
            if contact.get(field).is_none() {
                warnings.push(format!("Missing contact field: {}", field));
            }
        }
    }

    for field in LIST_FIELDS {
        if fields.get(*field).is_some_and(|value| !value.is_array()) {
            errors.push(format!("Field {} should be an array", field));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_complete_record_is_valid() {
        let report = validate_record(&json!({
            "name": "Ann",
            "contact": { "phone": "1", "email": "a@b" },
            "professional_summary": "x",
            "technical_skills": ["Rust"]
        }));
        assert_eq!(report, ValidationReport { valid: true, ..Default::default() });
    }

    #[test]
    fn test_problems_are_reported() {
        let report = validate_record(&json!({
            "contact": { "email": "a@b" },
            "projects": "not a list"
        }));

        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Missing required field: name",
                "Missing required field: professional_summary",
                "Field projects should be an array",
            ]
        );
        assert_eq!(report.warnings, vec!["Missing contact field: phone"]);
    }
}
