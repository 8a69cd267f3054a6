//! Output handlers.

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use lh_config::{Configuration, LogLevel};
use lh_context::ProviderRegistry;

use crate::format::{ColorFormatter, Formatter, JsonFormatter, DEFAULT_CONSOLE_TEMPLATE};
use crate::{LogRecord, Result};

/// File name used when no log file is configured.
pub const DEFAULT_LOG_FILE_NAME: &str = "app.log";

/// A destination for log records with its own level threshold.
pub trait Handler: Send + Sync {
    fn level(&self) -> LogLevel;

    fn set_level(&self, level: LogLevel);

    /// Format and write one record. Records below the threshold are skipped.
    fn handle(&self, record: &LogRecord) -> Result<()>;

    fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes formatted records, one per line, to any writer.
pub struct StreamHandler<W> {
    formatter: Box<dyn Formatter>,
    writer: Mutex<W>,
    level: AtomicU8,
}

impl<W: Write + Send> StreamHandler<W> {
    pub fn new(writer: W, formatter: impl Formatter + 'static) -> Self {
        StreamHandler {
            formatter: Box::new(formatter),
            writer: Mutex::new(writer),
            level: AtomicU8::new(LogLevel::Trace.as_u8()),
        }
    }

    pub fn with_level(self, level: LogLevel) -> Self {
        self.set_level(level);
        self
    }

    /// Consume the handler and return its writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Handler for StreamHandler<W> {
    fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: LogLevel) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    fn handle(&self, record: &LogRecord) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        // Format before taking the writer lock.
        let line = self.formatter.format(record)?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .flush()?;
        Ok(())
    }
}

impl<W> std::fmt::Debug for StreamHandler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandler")
            .field("level", &LogLevel::from_u8(self.level.load(Ordering::Relaxed)))
            .finish_non_exhaustive()
    }
}

/// Colored console output on stderr, redacted with `config`'s redactor.
///
/// Colors are only emitted when stderr is a terminal.
pub fn console_handler(config: &Arc<Configuration>) -> StreamHandler<io::Stderr> {
    let formatter = ColorFormatter::new(DEFAULT_CONSOLE_TEMPLATE)
        .with_date_format(config.date_format())
        .with_ansi(io::stderr().is_terminal())
        .with_config(Arc::clone(config));
    StreamHandler::new(io::stderr(), formatter).with_level(config.log_level())
}

/// JSON lines appended to the configured log file.
///
/// Without a configured `log_file`, writes to [`default_log_path`].
/// Parent directories are created as needed.
pub fn file_handler(
    config: &Arc<Configuration>,
    registry: &Arc<ProviderRegistry>,
) -> Result<StreamHandler<File>> {
    let path = config.log_file().unwrap_or_else(default_log_path);
    let file = open_append(&path)?;
    let formatter = JsonFormatter::new(Arc::clone(config), Arc::clone(registry));
    Ok(StreamHandler::new(file, formatter).with_level(config.log_level()))
}

/// `<data dir>/loghelpers/app.log`, falling back to the temp directory.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("loghelpers")
        .join(DEFAULT_LOG_FILE_NAME)
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
