//! HTTP service for docx-template.
//!
//! The router only parses multipart uploads and shapes responses; all document
//! work goes through `docx-template-core` on a blocking worker thread.

pub mod config;
pub mod error;
pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use config::Config;
use handlers::{
    create_resume_template_handler, create_sample_handler, document_info_handler,
    edit_operations_handler, edit_resume_handler, edit_simple_handler, health_handler,
    resume_placeholders_handler, root_handler, EXPOSED_HEADERS,
};

/// Build the application router.
pub fn app(config: &Config) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/edit-docx-simple", post(edit_simple_handler))
        .route("/edit-docx", post(edit_operations_handler))
        .route("/edit-resume", post(edit_resume_handler))
        .route("/document-info", post(document_info_handler))
        .route("/create-sample", post(create_sample_handler))
        .route("/create-resume-template", post(create_resume_template_handler))
        .route("/resume-placeholders", get(resume_placeholders_handler));

    Router::new()
        .route("/", get(root_handler))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let exposed: Vec<HeaderName> = EXPOSED_HEADERS
        .iter()
        .copied()
        .map(HeaderName::from_static)
        .collect();

    let origins: Vec<HeaderValue> = config
        .origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(exposed)
}
