//! Configuration errors.

use lh_redact::RedactionError;
use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading, validating or updating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {format} configuration: {message}")]
    Parse { format: &'static str, message: String },

    #[error("Unsupported configuration format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid configuration key: '{0}'")]
    InvalidKey(String),

    #[error("Invalid type for {field}: expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error(transparent)]
    Redaction(#[from] RedactionError),
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::Io(_) => 60,
            ConfigError::Parse { .. } => 61,
            ConfigError::UnsupportedFormat(_) => 62,
            ConfigError::InvalidKey(_) => 63,
            ConfigError::InvalidType { .. } => 64,
            ConfigError::InvalidValue { .. } => 65,
            ConfigError::Redaction(_) => 66,
        }
    }

    pub(crate) fn invalid_type(field: &str, expected: &'static str) -> Self {
        ConfigError::InvalidType {
            field: field.to_string(),
            expected,
        }
    }
}
