//! Error types for document templating.

use thiserror::Error;

/// Fatal errors raised by the templating engine and its container codec.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The uploaded bytes are not a readable DOCX package.
    #[error("Invalid DOCX container: {0}")]
    InvalidContainer(String),

    /// The search text has no occurrence anywhere in the document.
    #[error("Text '{0}' not found in document")]
    TextNotFound(String),

    /// The data record (or custom mapping) is not well-formed JSON of the expected shape.
    #[error("Malformed data record: {0}")]
    MalformedRecord(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for TemplateError {
    fn from(err: quick_xml::Error) -> Self {
        TemplateError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for TemplateError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        TemplateError::Xml(err.to_string())
    }
}

impl From<zip::result::ZipError> for TemplateError {
    fn from(err: zip::result::ZipError) -> Self {
        TemplateError::InvalidContainer(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;
