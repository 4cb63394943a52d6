//! Placeholder resolution against a JSON record.
//!
//! A [`PlaceholderMap`] is built from three layers merged in fixed priority
//! order, each later layer overriding the earlier ones on key collision:
//!
//! 1. static aliases (`name`, `company1`, `PROFESSIONAL_EXPERIENCE`, ...)
//! 2. dotted paths to every leaf (`professional_experience.0.company`)
//! 3. caller-supplied custom mappings
//!
//! Keys are stored without their `{{ }}` delimiters.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, TemplateError};

/// Custom placeholder overrides: key → `literal:<text>`, `path:<dotted>` or `<dotted>`.
pub type CustomMappings = BTreeMap<String, String>;

const LITERAL_PREFIX: &str = "literal:";
const PATH_PREFIX: &str = "path:";
const BULLET: &str = "• ";
const LIST_SEPARATOR: &str = ", ";
const DATE_FORMAT: &str = "%B %Y";

/// Resolved placeholder values keyed by placeholder name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlaceholderMap {
    values: BTreeMap<String, String>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into `self`; `other` wins on collision.
    pub fn merge(&mut self, other: PlaceholderMap) {
        self.values.extend(other.values);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlaceholderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Resolve all placeholders for `record`, dating `CURRENT_DATE` today.
pub fn resolve(record: &Value, custom: &CustomMappings) -> Result<PlaceholderMap> {
    resolve_on(record, custom, Local::now().date_naive())
}

/// [`resolve`] with an explicit date for `CURRENT_DATE`.
pub fn resolve_on(record: &Value, custom: &CustomMappings, today: NaiveDate) -> Result<PlaceholderMap> {
    let object = record.as_object().ok_or_else(|| {
        TemplateError::MalformedRecord("resume data must be a JSON object".to_string())
    })?;

    let mut map = static_aliases(object, today);
    map.merge(dotted_paths(record));
    map.merge(custom_layer(record, custom, &map));
    Ok(map)
}

/// Parse a JSON record payload.
pub fn parse_record(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| TemplateError::MalformedRecord(format!("invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(TemplateError::MalformedRecord(
            "resume data must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Parse a custom mapping payload: a JSON object of strings.
pub fn parse_custom_mappings(raw: &str) -> Result<CustomMappings> {
    serde_json::from_str(raw)
        .map_err(|e| TemplateError::MalformedRecord(format!("invalid custom mappings: {}", e)))
}

/// Follow a dotted path; numeric segments index arrays.
pub fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |value, segment| match value {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(fields) => fields.get(segment),
        _ => None,
    })
}

/// Render a value for insertion. Lists of highlights or responsibilities become
/// bullet lines, other lists are comma-joined. `null` renders as nothing.
pub fn render(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) | Value::Object(_) => Some(scalar_text(value)),
        Value::Array(items) => {
            let items: Vec<String> = items
                .iter()
                .filter(|item| !item.is_null())
                .map(scalar_text)
                .collect();
            if is_bullet_key(key) {
                Some(bullets(&items))
            } else {
                Some(items.join(LIST_SEPARATOR))
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_bullet_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("highlights") || key.contains("responsibilities")
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", BULLET, item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn field(object: &Map<String, Value>, name: &str) -> Option<String> {
    object.get(name).and_then(|value| render(value, name))
}

fn field_or_empty(object: &Map<String, Value>, name: &str) -> String {
    field(object, name).unwrap_or_default()
}

fn entries<'a>(record: &'a Map<String, Value>, name: &str) -> Vec<&'a Map<String, Value>> {
    match record.get(name) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

fn static_aliases(record: &Map<String, Value>, today: NaiveDate) -> PlaceholderMap {
    let mut map = PlaceholderMap::new();

    for (key, upper) in [
        ("name", "NAME"),
        ("professional_summary", "PROFESSIONAL_SUMMARY"),
        ("technical_skills", "TECHNICAL_SKILLS"),
    ] {
        if let Some(value) = field(record, key) {
            map.insert(key, value.clone());
            map.insert(upper, value);
        }
    }

    if let Some(contact) = record.get("contact").and_then(Value::as_object) {
        for (key, upper) in [("phone", "PHONE"), ("email", "EMAIL"), ("linkedin", "LINKEDIN")] {
            if let Some(value) = field(contact, key) {
                map.insert(key, value.clone());
                map.insert(upper, value);
            }
        }
    }

    let experience = entries(record, "professional_experience");
    for (n, entry) in (1..).zip(&experience) {
        for key in ["company", "location", "title", "duration", "highlights"] {
            if let Some(value) = field(entry, key) {
                map.insert(format!("{}{}", key, n), value);
            }
        }
    }

    let projects = entries(record, "projects");
    for (n, project) in (1..).zip(&projects) {
        if let Some(name) = field(project, "name") {
            map.insert(format!("project{}", n), name);
        }
        if let Some(highlights) = field(project, "highlights") {
            map.insert(format!("project{}_highlights", n), highlights);
        }
    }

    if matches!(record.get("professional_experience"), Some(Value::Array(_))) {
        map.insert("PROFESSIONAL_EXPERIENCE", experience_section(&experience));
    }
    if matches!(record.get("projects"), Some(Value::Array(_))) {
        map.insert("PROJECTS", projects_section(&projects));
    }
    if matches!(record.get("education"), Some(Value::Array(_))) {
        let section = education_section(&entries(record, "education"));
        map.insert("education", section.clone());
        map.insert("EDUCATION", section);
    }

    map.insert("CURRENT_DATE", today.format(DATE_FORMAT).to_string());
    map
}

fn highlight_lines(entry: &Map<String, Value>) -> Vec<String> {
    match entry.get("highlights") {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| format!("{}{}", BULLET, scalar_text(item)))
            .collect(),
        _ => Vec::new(),
    }
}

fn experience_section(experience: &[&Map<String, Value>]) -> String {
    let mut lines = Vec::new();
    for entry in experience {
        lines.push(format!(
            "{} - {}",
            field_or_empty(entry, "company"),
            field_or_empty(entry, "title")
        ));
        lines.push(format!(
            "{} | {}",
            field_or_empty(entry, "location"),
            field_or_empty(entry, "duration")
        ));
        lines.extend(highlight_lines(entry));
        lines.push(String::new());
    }
    lines.join("\n").trim().to_string()
}

fn projects_section(projects: &[&Map<String, Value>]) -> String {
    let mut lines = Vec::new();
    for project in projects {
        lines.push(field_or_empty(project, "name"));
        lines.extend(highlight_lines(project));
        lines.push(String::new());
    }
    lines.join("\n").trim().to_string()
}

fn education_section(education: &[&Map<String, Value>]) -> String {
    let mut text = String::new();
    for entry in education {
        text.push_str(&format!(
            "{} - {}\n{}\n\n",
            field_or_empty(entry, "degree"),
            field_or_empty(entry, "institution"),
            field_or_empty(entry, "duration")
        ));
    }
    text.trim().to_string()
}

fn dotted_paths(record: &Value) -> PlaceholderMap {
    let mut map = PlaceholderMap::new();
    collect_paths(record, "", &mut map);
    map
}

fn collect_paths(value: &Value, path: &str, map: &mut PlaceholderMap) {
    let child_path = |segment: &str| {
        if path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", path, segment)
        }
    };

    match value {
        Value::Object(fields) => {
            for (key, child) in fields {
                collect_paths(child, &child_path(key), map);
            }
        }
        Value::Array(items) => {
            if !path.is_empty() && items.iter().all(|item| !item.is_object() && !item.is_array()) {
                let last = path.rsplit('.').next().unwrap_or(path);
                if let Some(text) = render(value, last) {
                    map.insert(path, text);
                }
            }
            for (index, child) in items.iter().enumerate() {
                collect_paths(child, &child_path(&index.to_string()), map);
            }
        }
        Value::Null => {}
        scalar => {
            if !path.is_empty() {
                map.insert(path, scalar_text(scalar));
            }
        }
    }
}

/// Strip optional `{{ }}` delimiters and surrounding whitespace from a key.
pub fn normalize_key(key: &str) -> &str {
    let key = key.trim();
    key.strip_prefix("{{")
        .and_then(|k| k.strip_suffix("}}"))
        .unwrap_or(key)
        .trim()
}

fn custom_layer(record: &Value, custom: &CustomMappings, earlier: &PlaceholderMap) -> PlaceholderMap {
    let mut map = PlaceholderMap::new();
    for (raw_key, target) in custom {
        let key = normalize_key(raw_key);
        if key.is_empty() {
            continue;
        }

        if let Some(literal) = target.strip_prefix(LITERAL_PREFIX) {
            map.insert(key, literal);
            continue;
        }

        let path = target.strip_prefix(PATH_PREFIX).unwrap_or(target).trim();
        match lookup_path(record, path).and_then(|value| render(value, key)) {
            Some(value) => {
                map.insert(key, value);
            }
            None => {
                tracing::warn!(
                    "Custom mapping '{}' -> '{}' did not resolve{}",
                    key,
                    path,
                    if earlier.contains_key(key) {
                        ", keeping the default value"
                    } else {
                        ""
                    }
                );
            }
        }
    }
    map
}

/// A documented placeholder offered by resume templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderInfo {
    pub placeholder: &'static str,
    pub description: &'static str,
}

const CATALOG: &[(&str, &str)] = &[
    ("{{NAME}}", "Full name from resume data"),
    ("{{PHONE}}", "Phone number from contact info"),
    ("{{EMAIL}}", "Email address from contact info"),
    ("{{LINKEDIN}}", "LinkedIn URL from contact info"),
    ("{{PROFESSIONAL_SUMMARY}}", "Professional summary text"),
    ("{{TECHNICAL_SKILLS}}", "Comma-separated list of technical skills"),
    ("{{PROFESSIONAL_EXPERIENCE}}", "Formatted work experience entries"),
    ("{{PROJECTS}}", "Formatted project entries"),
    ("{{EDUCATION}}", "Formatted education entries"),
    ("{{CURRENT_DATE}}", "Current date in 'Month Year' format"),
];

/// Placeholders used by the built-in resume template, with descriptions.
pub fn catalog() -> Vec<PlaceholderInfo> {
    CATALOG
        .iter()
        .map(|&(placeholder, description)| PlaceholderInfo {
            placeholder,
            description,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[fixture]
    fn record() -> Value {
        json!({
            "name": "Ann Smith",
            "contact": { "phone": "555-0100", "email": "ann@example.com" },
            "professional_summary": "Builder of things.",
            "technical_skills": ["Rust", "SQL"],
            "professional_experience": [
                {
                    "company": "Acme",
                    "title": "Engineer",
                    "location": "Remote",
                    "duration": "2020-2024",
                    "highlights": ["Shipped X", "Fixed Y"]
                },
                { "company": "Initech", "title": "Intern", "highlights": [] }
            ],
            "projects": [{ "name": "Widget", "highlights": ["Fast"] }],
            "education": [{ "degree": "BSc", "institution": "State U", "duration": "2016-2020" }],
            "nickname": null
        })
    }

    #[test]
    fn test_custom_literal_overrides_name() {
        let record = json!({ "name": "Ann" });
        let custom = CustomMappings::from([("name".to_string(), "literal:Bob".to_string())]);

        let map = resolve_on(&record, &custom, today()).unwrap();

        assert_eq!(map.get("name"), Some("Bob"));
        assert_eq!(map.get("NAME"), Some("Ann"));
    }

    #[test]
    fn test_short_and_dotted_aliases_agree() {
        let record = json!({ "professional_experience": [{ "company": "Acme" }] });

        let map = resolve_on(&record, &CustomMappings::new(), today()).unwrap();

        assert_eq!(map.get("company1"), Some("Acme"));
        assert_eq!(map.get("professional_experience.0.company"), Some("Acme"));
    }

    #[rstest]
    fn test_static_layer(record: Value) {
        let map = resolve_on(&record, &CustomMappings::new(), today()).unwrap();

        assert_eq!(map.get("TECHNICAL_SKILLS"), Some("Rust, SQL"));
        assert_eq!(map.get("EMAIL"), Some("ann@example.com"));
        assert_eq!(map.get("linkedin"), None);
        assert_eq!(map.get("highlights1"), Some("• Shipped X\n• Fixed Y"));
        assert_eq!(map.get("company2"), Some("Initech"));
        assert_eq!(map.get("location2"), None);
        assert_eq!(map.get("company3"), None);
        assert_eq!(map.get("project1"), Some("Widget"));
        assert_eq!(map.get("project1_highlights"), Some("• Fast"));
        assert_eq!(map.get("CURRENT_DATE"), Some("March 2024"));
    }

    #[rstest]
    fn test_composite_sections(record: Value) {
        let map = resolve_on(&record, &CustomMappings::new(), today()).unwrap();

        assert_eq!(
            map.get("PROFESSIONAL_EXPERIENCE"),
            Some("Acme - Engineer\nRemote | 2020-2024\n• Shipped X\n• Fixed Y\n\nInitech - Intern\n |")
        );
        assert_eq!(map.get("PROJECTS"), Some("Widget\n• Fast"));
        assert_eq!(map.get("EDUCATION"), Some("BSc - State U\n2016-2020"));
    }

    #[rstest]
    fn test_dotted_layer_skips_nulls_and_formats_lists(record: Value) {
        let map = resolve_on(&record, &CustomMappings::new(), today()).unwrap();

        assert_eq!(map.get("nickname"), None);
        assert_eq!(map.get("contact.phone"), Some("555-0100"));
        assert_eq!(map.get("technical_skills.1"), Some("SQL"));
        assert_eq!(
            map.get("professional_experience.0.highlights"),
            Some("• Shipped X\n• Fixed Y")
        );
    }

    #[rstest]
    #[case("{{lead}}", "path:professional_experience.0.title", "lead", Some("Engineer"))]
    #[case("lead", "professional_experience.1.company", "lead", Some("Initech"))]
    #[case("name", "does.not.exist", "name", Some("Ann Smith"))]
    #[case("ghost", "nowhere", "ghost", None)]
    fn test_custom_paths(
        record: Value,
        #[case] key: &str,
        #[case] target: &str,
        #[case] lookup: &str,
        #[case] expected: Option<&str>,
    ) {
        let custom = CustomMappings::from([(key.to_string(), target.to_string())]);
        let map = resolve_on(&record, &custom, today()).unwrap();
        assert_eq!(map.get(lookup), expected);
    }

    #[test]
    fn test_non_object_record_is_malformed() {
        let err = resolve(&json!(["not", "an", "object"]), &CustomMappings::new()).unwrap_err();
        assert!(matches!(err, TemplateError::MalformedRecord(_)));
        assert!(parse_record("{ not json").is_err());
        assert!(parse_record("42").is_err());
        assert!(parse_custom_mappings(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_lookup_path() {
        let record = json!({ "a": [{ "b": 1 }] });
        assert_eq!(lookup_path(&record, "a.0.b"), Some(&json!(1)));
        assert_eq!(lookup_path(&record, "a.1.b"), None);
        assert_eq!(lookup_path(&record, "a.x"), None);
    }
}
