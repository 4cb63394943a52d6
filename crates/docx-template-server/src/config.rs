//! Command-line and environment configuration.

use clap::Parser;

/// Configuration for the docx-template-server HTTP service.
#[derive(Parser, Debug, Clone)]
#[command(name = "docx-template-server")]
#[command(about = "Edit DOCX files and fill resume templates over HTTP")]
pub struct Config {
    /// TCP host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "DOCX_TEMPLATE_HOST")]
    pub host: String,

    /// TCP port to bind to
    #[arg(long, default_value = "8000", env = "DOCX_TEMPLATE_PORT")]
    pub port: u16,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value_t = 20 * 1024 * 1024, env = "DOCX_TEMPLATE_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    /// Comma-separated CORS origins; empty allows any origin
    #[arg(long, default_value = "", env = "DOCX_TEMPLATE_ALLOWED_ORIGINS")]
    pub allowed_origins: String,
}

impl Config {
    /// Parsed, non-empty CORS origins.
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 20 * 1024 * 1024,
            allowed_origins: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_origins_are_split_and_trimmed() {
        let config = Config {
            allowed_origins: "http://localhost:5173, http://localhost:5174,,".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.origins(),
            vec!["http://localhost:5173", "http://localhost:5174"]
        );
        assert!(Config::default().origins().is_empty());
    }

    #[test]
    fn test_cli_flags_override_defaults() {
        let config = Config::parse_from(["docx-template-server", "--port", "9000"]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
    }
}
