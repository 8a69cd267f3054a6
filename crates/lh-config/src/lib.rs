//! loghelpers configuration.
//!
//! This crate provides:
//! - [`LogLevel`] and [`LogFormat`], parsed leniently from strings
//! - [`Settings`], the plain values loaded from JSON, TOML or YAML files
//! - [`Configuration`], the shared runtime object that formatters, handlers
//!   and the context merge read from, including the active redactor

pub mod configuration;
pub mod error;
pub mod level;
pub mod settings;

pub use configuration::Configuration;
pub use error::{ConfigError, Result};
pub use level::{LogFormat, LogLevel};
pub use settings::{FileFormat, Features, Settings, ENV_LOG_FILE, ENV_LOG_FORMAT, ENV_LOG_LEVEL};
