//! The log record passed to formatters.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use lh_config::LogLevel;
use serde_json::{Map, Value};

use crate::{LogError, Result};

/// One log event.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    /// Name of the emitting logger (or tracing target).
    pub logger: String,
    pub level: LogLevel,
    pub message: String,
    /// Extra structured fields.
    pub fields: Map<String, Value>,
    /// Rendered error chain, when the record reports a failure.
    pub exception: Option<String>,
}

impl LogRecord {
    /// A record timestamped now.
    pub fn new(logger: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Local::now(),
            logger: logger.into(),
            level,
            message: message.into(),
            fields: Map::new(),
            exception: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_exception(mut self, err: &(dyn std::error::Error + 'static)) -> Self {
        self.exception = Some(format_error_chain(err));
        self
    }

    /// Render the timestamp with a chrono format string.
    ///
    /// Invalid format strings are reported instead of panicking.
    pub fn format_timestamp(&self, date_format: &str) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", self.timestamp.format(date_format))
            .map_err(|_| LogError::DateFormat(date_format.to_string()))?;
        Ok(out)
    }
}

/// An error and its sources, one per line.
pub fn format_error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "request failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_error_chain() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(format_error_chain(&err), "request failed\nCaused by: disk full");
    }

    #[test]
    fn test_timestamp_format() {
        let record = LogRecord::new("app", LogLevel::Info, "hi");
        let ts = record.format_timestamp("%Y").unwrap();
        assert_eq!(ts.len(), 4);
    }

    #[test]
    fn test_invalid_timestamp_format() {
        let record = LogRecord::new("app", LogLevel::Info, "hi");
        assert!(matches!(
            record.format_timestamp("%Q"),
            Err(LogError::DateFormat(_))
        ));
    }

    #[test]
    fn test_builders() {
        let record = LogRecord::new("app", LogLevel::Warn, "slow")
            .with_field("elapsed_ms", 1200)
            .with_field("route", "/login");
        assert_eq!(record.fields["elapsed_ms"], 1200);
        assert_eq!(record.fields["route"], "/login");
        assert!(record.exception.is_none());
    }
}
