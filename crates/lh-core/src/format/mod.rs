//! Record formatters.

mod color;
mod json;

pub use color::{AnsiColor, ColorFormatter, DEFAULT_CONSOLE_TEMPLATE, RESET};
pub use json::JsonFormatter;

use crate::{LogRecord, Result};

/// Turns a record into one line of output.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> Result<String>;
}

impl<F: Formatter + ?Sized> Formatter for Box<F> {
    fn format(&self, record: &LogRecord) -> Result<String> {
        (**self).format(record)
    }
}
