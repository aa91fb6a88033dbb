//! Error types for the I/O boundary (configuration and batch files)
//!
//! The triage core itself is total and never returns these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    /// Configuration could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Batch file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Batch JSON is malformed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Batch YAML is malformed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Input parsed but has the wrong shape
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type TriageResult<T> = Result<T, TriageError>;
