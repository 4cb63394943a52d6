//! Run-aware text substitution and placeholder filling for DOCX documents.
//!
//! This crate holds the document engine behind docx-template-server:
//! - `model`: paragraphs, runs and tables with opaque run formatting
//! - `package`: loading and saving `.docx` packages without losing unknown parts
//! - `locate` / `rewrite` / `walker`: find and replace across run boundaries
//! - `placeholder` / `template`: resolve a JSON record and fill `{{key}}` tokens
//! - `bullets`: split filled bullet lists into list paragraphs
//! - `operations`: batched edits with per-operation outcomes

pub mod bullets;
mod error;
pub mod locate;
mod model;
pub mod operations;
mod package;
pub mod placeholder;
pub mod rewrite;
pub mod sample;
mod styles;
pub mod template;
pub mod validate;
pub mod walker;
pub mod xml;

pub use error::{Result, TemplateError};
pub use locate::{Occurrence, RunSlice};
pub use model::{
    Block, Document, DocumentInfo, Inline, Paragraph, RowPart, Run, RunExtent, RunFormat, Table,
    TableCell, TablePart, TableRow,
};
pub use operations::{
    BatchReport, Operation, OperationKind, OperationOutcome, OperationRequest, SoftFailure,
};
pub use package::{Package, DOCX_MIME_TYPE};
pub use placeholder::{CustomMappings, PlaceholderInfo, PlaceholderMap};
pub use styles::StyleRegistry;
pub use template::{Category, FillReport};
pub use validate::ValidationReport;
pub use walker::ReplaceOptions;
