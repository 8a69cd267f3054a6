//! The logger wrapper.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lh_config::{Configuration, LogLevel};
use serde_json::{Map, Value};

use crate::handler::Handler;
use crate::{LogRecord, Result};

/// A named logger dispatching records to its handlers.
///
/// Every logging call returns a [`Result`]: a failing context provider or
/// an unwritable destination is reported to the caller, not swallowed.
pub struct Logger {
    name: String,
    level: AtomicU8,
    handlers: Mutex<Vec<Arc<dyn Handler>>>,
    config: Option<Arc<Configuration>>,
}

impl Logger {
    /// A logger with no handlers and an `Info` threshold.
    pub fn new(name: impl Into<String>) -> Self {
        Logger {
            name: name.into(),
            level: AtomicU8::new(LogLevel::Info.as_u8()),
            handlers: Mutex::new(Vec::new()),
            config: None,
        }
    }

    /// Read the sample rate from `config` on every call.
    pub fn with_config(mut self, config: Arc<Configuration>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_level(self, level: LogLevel) -> Self {
        self.set_level(level);
        self
    }

    pub fn with_handler(self, handler: impl Handler + 'static) -> Self {
        self.add_handler(Arc::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.lock_handlers().push(handler);
    }

    /// Snapshot of the current handlers.
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.lock_handlers().clone()
    }

    pub fn clear_handlers(&self) {
        self.lock_handlers().clear();
    }

    /// Whether a record at `level` passes the logger's own threshold.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        self.log_with(level, message, Map::new())
    }

    /// Log with extra structured fields.
    pub fn log_with(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Result<()> {
        if !self.should_emit(level) {
            return Ok(());
        }
        let record = LogRecord::new(self.name.clone(), level, message).with_fields(fields);
        self.dispatch(&record)
    }

    /// Log an error and its source chain at `Error`.
    pub fn exception(
        &self,
        message: impl Into<String>,
        err: &(dyn std::error::Error + 'static),
    ) -> Result<()> {
        if !self.should_emit(LogLevel::Error) {
            return Ok(());
        }
        let record = LogRecord::new(self.name.clone(), LogLevel::Error, message).with_exception(err);
        self.dispatch(&record)
    }

    /// Send a prepared record to every handler that accepts its level.
    ///
    /// Stops at the first handler error.
    pub fn dispatch(&self, record: &LogRecord) -> Result<()> {
        for handler in self.handlers() {
            if handler.enabled(record.level) {
                handler.handle(record)?;
            }
        }
        Ok(())
    }

    fn should_emit(&self, level: LogLevel) -> bool {
        if !self.enabled(level) {
            return false;
        }
        let rate = self.config.as_ref().map_or(1.0, |c| c.sample_rate());
        rate >= 1.0 || rand::random::<f64>() < rate
    }

    fn lock_handlers(&self) -> MutexGuard<'_, Vec<Arc<dyn Handler>>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("handlers", &self.lock_handlers().len())
            .finish()
    }
}
