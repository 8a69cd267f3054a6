//! One-call logging setup.

use std::io::IsTerminal;
use std::sync::Arc;

use lh_config::{Configuration, LogFormat};
use lh_context::ProviderRegistry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::format::{ColorFormatter, Formatter, JsonFormatter, DEFAULT_CONSOLE_TEMPLATE};
use crate::handler::{console_handler, file_handler};
use crate::layer::ContextLayer;
use crate::{Logger, Result};

/// Name of the logger returned by [`setup_logging`].
pub const ROOT_LOGGER: &str = "root";

/// The formatter matching the configured format.
pub fn formatter_for(config: &Arc<Configuration>, registry: &Arc<ProviderRegistry>) -> Box<dyn Formatter> {
    match config.log_format() {
        LogFormat::Json => Box::new(JsonFormatter::new(Arc::clone(config), Arc::clone(registry))),
        LogFormat::Human => Box::new(
            ColorFormatter::new(DEFAULT_CONSOLE_TEMPLATE)
                .with_date_format(config.date_format())
                .with_ansi(std::io::stderr().is_terminal())
                .with_config(Arc::clone(config)),
        ),
    }
}

/// Install a global tracing subscriber that writes through a [`ContextLayer`].
///
/// The filter comes from `RUST_LOG` when set, otherwise from the configured
/// level. Fails if a global subscriber is already installed.
pub fn init_tracing(config: &Arc<Configuration>, registry: &Arc<ProviderRegistry>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level().to_string()));
    let layer = ContextLayer::stderr(formatter_for(config, registry));

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}

/// Build the root [`Logger`] from configuration.
///
/// It gets a console handler, plus a file handler when `log_file` is set.
/// Its sample rate follows the configuration.
pub fn setup_logging(config: &Arc<Configuration>, registry: &Arc<ProviderRegistry>) -> Result<Logger> {
    let logger = Logger::new(ROOT_LOGGER)
        .with_level(config.log_level())
        .with_config(Arc::clone(config))
        .with_handler(console_handler(config));

    if config.log_file().is_some() {
        logger.add_handler(Arc::new(file_handler(config, registry)?));
    }
    tracing::debug!(
        handlers = logger.handlers().len(),
        level = %config.log_level(),
        "logging configured"
    );
    Ok(logger)
}
