//! Context errors.

use thiserror::Error;

use crate::provider::ProviderError;

/// Result type for registry and merge operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors raised by the provider registry and context merge.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Invalid provider name: '{0}'")]
    InvalidName(String),

    #[error("Provider already registered: '{0}'")]
    DuplicateProvider(String),

    #[error("Provider not found: '{0}'")]
    NotFound(String),

    #[error("Provider '{provider}' returned key '{key}' which is already in the context")]
    DuplicateKey { provider: String, key: String },

    #[error("Provider '{provider}' failed: {source}")]
    ProviderExecutionFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

impl ContextError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ContextError::InvalidName(_) => 70,
            ContextError::DuplicateProvider(_) => 71,
            ContextError::NotFound(_) => 72,
            ContextError::DuplicateKey { .. } => 73,
            ContextError::ProviderExecutionFailed { .. } => 74,
        }
    }

    /// Name of the provider involved, if any.
    pub fn provider(&self) -> &str {
        match self {
            ContextError::InvalidName(name)
            | ContextError::DuplicateProvider(name)
            | ContextError::NotFound(name) => name,
            ContextError::DuplicateKey { provider, .. }
            | ContextError::ProviderExecutionFailed { provider, .. } => provider,
        }
    }
}
