//! Error types for the redactor.

use thiserror::Error;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur while configuring the redactor.
///
/// Redacting a value never fails; only changing the redactor's settings can.
#[derive(Error, Debug, Clone)]
pub enum RedactionError {
    /// A setting was given a value of the wrong shape.
    #[error("invalid type for {field}: expected {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    /// Failed to compile a value pattern.
    #[error("invalid redaction pattern '{pattern}': {source}")]
    PatternError {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl RedactionError {
    pub(crate) fn invalid_type(field: &'static str, expected: &'static str) -> Self {
        RedactionError::InvalidType { field, expected }
    }
}
