use std::borrow::Cow;
use std::sync::Arc;

use lh_config::{Configuration, LogLevel};
use serde_json::{Map, Value};

use super::Formatter;
use crate::{LogRecord, Result};

/// ANSI reset sequence.
pub const RESET: &str = "\x1b[0m";

/// Template used by the console handler.
pub const DEFAULT_CONSOLE_TEMPLATE: &str = "[{level}] {message}";

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Grey,
}

impl AnsiColor {
    pub fn foreground(self) -> &'static str {
        match self {
            AnsiColor::Black => "\x1b[30m",
            AnsiColor::Red => "\x1b[31m",
            AnsiColor::Green => "\x1b[32m",
            AnsiColor::Yellow => "\x1b[33m",
            AnsiColor::Blue => "\x1b[34m",
            AnsiColor::Magenta => "\x1b[35m",
            AnsiColor::Cyan => "\x1b[36m",
            AnsiColor::White => "\x1b[37m",
            AnsiColor::Grey => "\x1b[90m",
        }
    }

    pub fn background(self) -> &'static str {
        match self {
            AnsiColor::Black => "\x1b[40m",
            AnsiColor::Red => "\x1b[41m",
            AnsiColor::Green => "\x1b[42m",
            AnsiColor::Yellow => "\x1b[43m",
            AnsiColor::Blue => "\x1b[44m",
            AnsiColor::Magenta => "\x1b[45m",
            AnsiColor::Cyan => "\x1b[46m",
            AnsiColor::White => "\x1b[47m",
            AnsiColor::Grey => "\x1b[100m",
        }
    }

    /// Foreground color for a severity.
    pub fn for_level(level: LogLevel) -> Option<AnsiColor> {
        match level {
            LogLevel::Trace => Some(AnsiColor::Cyan),
            LogLevel::Debug => Some(AnsiColor::Blue),
            LogLevel::Info => Some(AnsiColor::White),
            LogLevel::Warn => Some(AnsiColor::Yellow),
            LogLevel::Error => Some(AnsiColor::Red),
            LogLevel::Off => None,
        }
    }
}

/// Human-readable formatter with per-level colors.
///
/// Templates may use `{timestamp}`, `{logger}`, `{level}` and `{message}`;
/// any other brace text is copied through. Fields are appended as
/// `key=value` pairs and an exception goes on the following lines.
///
/// With a [`Configuration`] attached, the message, fields and exception go
/// through its redactor first.
#[derive(Debug, Clone)]
pub struct ColorFormatter {
    template: String,
    date_format: String,
    ansi: bool,
    config: Option<Arc<Configuration>>,
}

impl ColorFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        ColorFormatter {
            template: template.into(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            ansi: true,
            config: None,
        }
    }

    /// Redact output with the configuration's current redactor.
    pub fn with_config(mut self, config: Arc<Configuration>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    /// Turn color codes on or off (off for pipes and files).
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn render(&self, record: &LogRecord) -> Result<String> {
        let redactor = self.config.as_ref().map(|config| config.redactor());
        let message: Cow<'_, str> = match &redactor {
            Some(redactor) => Cow::Owned(redactor.redact_text(&record.message)),
            None => Cow::Borrowed(record.message.as_str()),
        };
        let fields: Cow<'_, Map<String, Value>> = match &redactor {
            Some(redactor) => Cow::Owned(redactor.redact_map(&record.fields)),
            None => Cow::Borrowed(&record.fields),
        };
        let exception: Option<Cow<'_, str>> =
            record.exception.as_deref().map(|text| match &redactor {
                Some(redactor) => Cow::Owned(redactor.redact_text(text)),
                None => Cow::Borrowed(text),
            });

        let mut out = String::with_capacity(self.template.len() + message.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start..];
            let Some(end) = after.find('}') else {
                break;
            };
            match &after[1..end] {
                "timestamp" => out.push_str(&record.format_timestamp(&self.date_format)?),
                "logger" => out.push_str(&record.logger),
                "level" => out.push_str(record.level.as_upper()),
                "message" => out.push_str(&message),
                _ => out.push_str(&after[..=end]),
            }
            rest = &after[end + 1..];
        }
        // Either no more placeholders or an unclosed brace.
        if let Some(start) = rest.find('{') {
            out.push_str(&rest[start..]);
        } else {
            out.push_str(rest);
        }

        for (key, value) in fields.iter() {
            match value {
                Value::String(s) => {
                    out.push_str(&format!(" {key}={s}"));
                }
                other => out.push_str(&format!(" {key}={other}")),
            }
        }
        if let Some(exception) = exception {
            out.push('\n');
            out.push_str(&exception);
        }
        Ok(out)
    }
}

impl Default for ColorFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CONSOLE_TEMPLATE)
    }
}

impl Formatter for ColorFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let text = self.render(record)?;
        match AnsiColor::for_level(record.level) {
            Some(color) if self.ansi => Ok(format!("{}{}{}", color.foreground(), text, RESET)),
            _ => Ok(text),
        }
    }
}
