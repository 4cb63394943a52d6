//! HTTP handlers.
//!
//! Implements:
//! - GET  /                            - Service description
//! - GET  /api/health                  - Health check
//! - POST /api/edit-docx-simple        - Single search/replace
//! - POST /api/edit-docx               - Batch of edit operations
//! - POST /api/edit-resume             - Fill a template from a JSON record
//! - POST /api/document-info           - Counts, styles and a text preview
//! - POST /api/create-sample           - Download a sample document
//! - POST /api/create-resume-template  - Download the resume template
//! - GET  /api/resume-placeholders     - Documented placeholders

use std::collections::{BTreeMap, HashMap};

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use docx_template_core::operations::{self, OperationRequest};
use docx_template_core::placeholder::{self, CustomMappings};
use docx_template_core::validate::validate_record;
use docx_template_core::{sample, template, walker, Document, ReplaceOptions, DOCX_MIME_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

pub const X_REPLACEMENTS_MADE: &str = "x-replacements-made";
pub const X_OPERATIONS_PERFORMED: &str = "x-operations-performed";
pub const X_ERRORS: &str = "x-errors";
pub const X_DOCUMENT_INFO: &str = "x-document-info";
pub const X_VALIDATION_RESULTS: &str = "x-validation-results";
pub const X_UNRESOLVED_PLACEHOLDERS: &str = "x-unresolved-placeholders";
pub const X_TEMPLATE_INFO: &str = "x-template-info";

/// Headers exposed to browser clients.
pub const EXPOSED_HEADERS: &[&str] = &[
    X_REPLACEMENTS_MADE,
    X_OPERATIONS_PERFORMED,
    X_ERRORS,
    X_DOCUMENT_INFO,
    X_VALIDATION_RESULTS,
    X_UNRESOLVED_PLACEHOLDERS,
    X_TEMPLATE_INFO,
];

const SERVICE_NAME: &str = "DOCX Modification Service";
const PREVIEW_CHARS: usize = 500;

// ─── Multipart helpers ──────────────────────────────────────────────────────

struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// A fully read multipart form: file parts and text parts by field name.
#[derive(Default)]
struct Form {
    files: HashMap<String, Upload>,
    fields: HashMap<String, String>,
}

impl Form {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    debug!("Received file '{}' ({} bytes) as '{}'", file_name, bytes.len(), name);
                    form.files.insert(name, Upload { file_name, bytes });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Take a `.docx` upload.
    fn docx(&mut self, name: &str) -> Result<Upload> {
        let upload = self
            .files
            .remove(name)
            .ok_or_else(|| ServiceError::BadRequest(format!("Missing file field '{}'", name)))?;
        if !upload.file_name.to_lowercase().ends_with(".docx") {
            return Err(ServiceError::BadRequest(
                "File must be a DOCX document".to_string(),
            ));
        }
        Ok(upload)
    }

    fn text(&mut self, name: &str) -> Result<String> {
        self.fields
            .remove(name)
            .ok_or_else(|| ServiceError::BadRequest(format!("Missing form field '{}'", name)))
    }

    fn optional_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).filter(|value| !value.trim().is_empty())
    }

    fn flag(&mut self, name: &str, default: bool) -> Result<bool> {
        match self.fields.remove(name) {
            None => Ok(default),
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ServiceError::BadRequest(format!("Field '{}' must be a boolean, got '{}'", name, raw))
            }),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ─── Response helpers ───────────────────────────────────────────────────────

/// JSON with every non-ASCII character escaped, safe for a header value.
fn ascii_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).map_err(|e| ServiceError::Internal(e.to_string()))?;
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(out)
}

/// File name usable inside a quoted `Content-Disposition` value.
fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn docx_response(
    bytes: Vec<u8>,
    file_name: &str,
    extra: Vec<(&'static str, String)>,
) -> Result<Response> {
    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME_TYPE));
    let disposition = format!("attachment; filename=\"{}\"", safe_file_name(file_name));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|e| ServiceError::Internal(e.to_string()))?,
    );
    for (name, value) in extra {
        let value =
            HeaderValue::from_str(&value).map_err(|e| ServiceError::Internal(e.to_string()))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(response)
}

/// Run document work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Internal(format!("worker task failed: {}", e)))?
}

// ─── Handlers ───────────────────────────────────────────────────────────────

/// GET / - Service description.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Upload DOCX files and edit them while preserving formatting",
        "endpoints": {
            "POST /api/edit-docx": "Edit a DOCX file with specified operations",
            "POST /api/edit-docx-simple": "Simple text replacement in DOCX file",
            "POST /api/edit-resume": "Generate resume from DOCX template and JSON data",
            "POST /api/create-resume-template": "Create a resume template with placeholders",
            "GET /api/resume-placeholders": "List placeholders supported by resume templates",
            "GET /api/health": "Health check endpoint",
            "POST /api/create-sample": "Create a sample DOCX file for testing",
            "POST /api/document-info": "Get document information"
        }
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// GET /api/health - Health check.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/edit-docx-simple - Replace one string everywhere; 404 when absent.
pub async fn edit_simple_handler(multipart: Multipart) -> Result<Response> {
    let mut form = Form::read(multipart).await?;
    let upload = form.docx("file")?;
    let search = form.text("search_text")?;
    let replace = form.text("replace_text")?;
    let options = ReplaceOptions {
        preserve_formatting: form.flag("preserve_formatting", true)?,
        case_sensitive: form.flag("case_sensitive", true)?,
    };

    let bytes = upload.bytes;
    let (count, output) = blocking(move || {
        let mut document = Document::load(&bytes)?;
        let count = walker::replace_required(&mut document, &search, &replace, options)?;
        Ok((count, document.save()?))
    })
    .await?;

    info!("edit-docx-simple: {} replacement(s) in '{}'", count, upload.file_name);
    docx_response(
        output,
        &format!("modified_{}", upload.file_name),
        vec![(X_REPLACEMENTS_MADE, count.to_string())],
    )
}

/// POST /api/edit-docx - Apply a list of operations; failures are reported per slot.
pub async fn edit_operations_handler(multipart: Multipart) -> Result<Response> {
    let mut form = Form::read(multipart).await?;
    let upload = form.docx("file")?;
    let raw = form.text("operations")?;
    let requests: Vec<OperationRequest> = serde_json::from_str(&raw).map_err(|e| {
        ServiceError::BadRequest(format!("Invalid JSON in operations parameter: {}", e))
    })?;

    let bytes = upload.bytes;
    let requested = requests.len();
    let (report, info, output) = blocking(move || {
        let mut document = Document::load(&bytes)?;
        let report = operations::apply_requests(&mut document, requests);
        let info = document.info();
        Ok((report, info, document.save()?))
    })
    .await?;

    let errors = report.errors();
    info!(
        "edit-docx: {}/{} operation(s) applied to '{}'",
        report.success_count, requested, upload.file_name
    );
    if requested > 0 && report.success_count == 0 {
        return Err(ServiceError::NothingApplied(errors));
    }

    docx_response(
        output,
        &format!("modified_{}", upload.file_name),
        vec![
            (X_OPERATIONS_PERFORMED, report.success_count.to_string()),
            (X_ERRORS, ascii_json(&errors)?),
            (X_DOCUMENT_INFO, ascii_json(&info)?),
        ],
    )
}

/// POST /api/edit-resume - Fill `{{placeholders}}` from a JSON record.
pub async fn edit_resume_handler(multipart: Multipart) -> Result<Response> {
    let mut form = Form::read(multipart).await?;
    let upload = form.docx("document")?;
    let record = placeholder::parse_record(&form.text("fields")?)?;
    let custom = match form.optional_text("custom_mappings") {
        Some(raw) => placeholder::parse_custom_mappings(&raw)?,
        None => CustomMappings::new(),
    };

    let validation = validate_record(&record);
    if !validation.valid {
        debug!("Resume data has validation errors: {:?}", validation.errors);
    }

    let bytes = upload.bytes;
    let (report, output) = blocking(move || {
        let mut document = Document::load(&bytes)?;
        let report = template::fill_from_record(&mut document, &record, &custom)?;
        Ok((report, document.save()?))
    })
    .await?;

    info!(
        "edit-resume: {} replacement(s) in '{}'",
        report.total_replacements, upload.file_name
    );
    docx_response(
        output,
        &format!("resume_{}", upload.file_name),
        vec![
            (X_REPLACEMENTS_MADE, ascii_json(&report.category_totals())?),
            (X_VALIDATION_RESULTS, ascii_json(&validation)?),
            (X_UNRESOLVED_PLACEHOLDERS, ascii_json(&report.unresolved)?),
            (X_ERRORS, ascii_json(&validation.errors)?),
        ],
    )
}

/// POST /api/document-info - Describe a document without modifying it.
pub async fn document_info_handler(multipart: Multipart) -> Result<Json<Value>> {
    let mut form = Form::read(multipart).await?;
    let upload = form.docx("file")?;

    let bytes = upload.bytes;
    let (info, text) = blocking(move || {
        let document = Document::load(&bytes)?;
        Ok((document.info(), document.text()))
    })
    .await?;

    Ok(Json(json!({
        "filename": upload.file_name,
        "document_info": info,
        "text_preview": preview(&text),
    })))
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// POST /api/create-sample - Download a sample document.
pub async fn create_sample_handler() -> Result<Response> {
    let output = blocking(|| Ok(sample::sample_document()?.save()?)).await?;
    docx_response(output, "sample_document.docx", Vec::new())
}

/// POST /api/create-resume-template - Download the resume template.
pub async fn create_resume_template_handler() -> Result<Response> {
    let output = blocking(|| Ok(sample::resume_template()?.save()?)).await?;
    let placeholders: Vec<&str> = placeholder::catalog()
        .iter()
        .map(|info| info.placeholder)
        .collect();
    docx_response(
        output,
        "resume_template.docx",
        vec![(
            X_TEMPLATE_INFO,
            ascii_json(&json!({ "placeholders": placeholders }))?,
        )],
    )
}

/// GET /api/resume-placeholders - Placeholders and their descriptions.
pub async fn resume_placeholders_handler() -> Json<Value> {
    let catalog = placeholder::catalog();
    let placeholders: Vec<&str> = catalog.iter().map(|info| info.placeholder).collect();
    let descriptions: BTreeMap<&str, &str> = catalog
        .iter()
        .map(|info| (info.placeholder, info.description))
        .collect();

    Json(json!({
        "placeholders": placeholders,
        "descriptions": descriptions,
        "usage": "Use these placeholders in your DOCX template, and they will be replaced with data from your JSON",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ascii_json_escapes_non_ascii() {
        let encoded = ascii_json(&vec!["café • 😀"]).unwrap();
        assert_eq!(encoded, r#"["caf\u00e9 \u2022 \ud83d\ude00"]"#);
        let decoded: Vec<String> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, vec!["café • 😀"]);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(600);
        let out = preview(&text);
        assert_eq!(out.chars().count(), PREVIEW_CHARS + 3);
        assert!(out.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("résumé \"v2\".docx"), "r_sum_ _v2_.docx");
    }
}
