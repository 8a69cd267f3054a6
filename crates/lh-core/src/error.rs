//! Logging errors.

use lh_config::ConfigError;
use lh_context::ContextError;
use thiserror::Error;

/// Result type for formatting and handling records.
pub type Result<T> = std::result::Result<T, LogError>;

/// Errors raised while turning a record into output.
#[derive(Error, Debug)]
pub enum LogError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid date format: '{0}'")]
    DateFormat(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

impl LogError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            LogError::Context(e) => e.code(),
            LogError::Io(_) => 80,
            LogError::Serialize(_) => 81,
            LogError::Config(e) => e.code(),
            LogError::DateFormat(_) => 82,
            LogError::Init(_) => 83,
        }
    }
}
