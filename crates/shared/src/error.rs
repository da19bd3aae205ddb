//! Error types for tcex

use thiserror::Error;

/// Error thrown when a template name does not exist for a template type
#[derive(Debug, Error)]
#[error(
    "Template '{template_name}' not found for type '{template_type}'. Available templates: {}",
    if .available.is_empty() { "none".to_string() } else { .available.join(", ") }
)]
pub struct TemplateNotFoundError {
    pub template_name: String,
    pub template_type: String,
    pub available: Vec<String>,
}

/// Error thrown when a template type is not one of the known types
#[derive(Debug, Error)]
#[error("Unknown template type: '{given}'. Valid types: {}", .valid.join(", "))]
pub struct InvalidTemplateTypeError {
    pub given: String,
    pub valid: Vec<String>,
}

/// General tcex error type
#[derive(Debug, Error)]
pub enum TcexError {
    #[error(transparent)]
    TemplateNotFound(#[from] TemplateNotFoundError),

    #[error(transparent)]
    InvalidTemplateType(#[from] InvalidTemplateTypeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Package error: {0}")]
    Package(String),

    #[error("Dependency error: {0}")]
    Deps(String),

    #[error("{0}")]
    Staging(String),

    #[error("KV store error: {0}")]
    KvStore(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TcexError>;
