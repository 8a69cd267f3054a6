//! Structured logging on top of the loghelpers context and redaction crates.
//!
//! Provides:
//! - [`LogRecord`] and the [`Formatter`](format::Formatter) implementations:
//!   redacted JSON with resolved context, and colored console text
//! - [`Handler`](handler::Handler)s writing formatted records to streams and files
//! - [`Logger`], a named wrapper with named severity methods that report
//!   failures instead of swallowing them
//! - [`TemporaryLevel`] and [`log_calls`] helpers
//! - [`ContextLayer`], a `tracing` layer using the same formatters
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use lh_config::Configuration;
//! use lh_context::{LoggingContext, ProviderRegistry};
//! use lh_core::setup_logging;
//!
//! let config = Arc::new(Configuration::from_env()?);
//! let registry = Arc::new(ProviderRegistry::with_default());
//! let logger = setup_logging(&config, &registry)?;
//!
//! LoggingContext::scope([("request_id", "r-42")], || logger.info("handling request"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod calls;
pub mod error;
pub mod format;
pub mod handler;
pub mod layer;
pub mod level;
pub mod logger;
pub mod record;
pub mod setup;

pub use calls::log_calls;
pub use error::{LogError, Result};
pub use format::{AnsiColor, ColorFormatter, Formatter, JsonFormatter};
pub use handler::{console_handler, default_log_path, file_handler, Handler, StreamHandler};
pub use layer::ContextLayer;
pub use level::{with_level, TemporaryLevel};
pub use logger::Logger;
pub use record::{format_error_chain, LogRecord};
pub use setup::{formatter_for, init_tracing, setup_logging, ROOT_LOGGER};
