//! Error types for the HTTP surface.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docx_template_core::TemplateError;
use serde::Serialize;

/// Request-level failures. Soft operation failures never end up here.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid DOCX file provided")]
    InvalidContainer(String),

    #[error("{0}")]
    TextNotFound(String),

    #[error("Invalid resume data format: {0}")]
    MalformedRecord(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("No operation could be applied: {}", .0.join("; "))]
    NothingApplied(Vec<String>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TemplateError> for ServiceError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::InvalidContainer(detail) => ServiceError::InvalidContainer(detail),
            err @ TemplateError::TextNotFound(_) => ServiceError::TextNotFound(err.to_string()),
            TemplateError::MalformedRecord(detail) => ServiceError::MalformedRecord(detail),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ServiceError {
    fn from(err: MultipartError) -> Self {
        ServiceError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            code: &'static str,
        }

        let (status, code) = match &self {
            ServiceError::InvalidContainer(_) => (StatusCode::BAD_REQUEST, "INVALID_CONTAINER"),
            ServiceError::TextNotFound(_) => (StatusCode::NOT_FOUND, "TEXT_NOT_FOUND"),
            ServiceError::MalformedRecord(_) => (StatusCode::BAD_REQUEST, "MALFORMED_RECORD"),
            ServiceError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ServiceError::NothingApplied(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_OPERATIONS_APPLIED")
            }
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let error = match &self {
            ServiceError::Internal(detail) => {
                tracing::error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            ServiceError::InvalidContainer(detail) => {
                tracing::debug!("Rejected container: {}", detail);
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, axum::Json(ErrorBody { error, code })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_template_errors_map_to_statuses() {
        let cases = [
            (TemplateError::InvalidContainer("x".into()), StatusCode::BAD_REQUEST),
            (TemplateError::TextNotFound("x".into()), StatusCode::NOT_FOUND),
            (TemplateError::MalformedRecord("x".into()), StatusCode::BAD_REQUEST),
            (TemplateError::Xml("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServiceError::from(err).into_response().status(), status);
        }
    }
}
