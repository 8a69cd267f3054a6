//! Plain configuration values and file/environment loading.

use std::path::{Path, PathBuf};

use lh_redact::{DEFAULT_REDACTION_TOKEN, DEFAULT_SENSITIVE_KEYS};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LogLevel, Result};

/// Environment variable for the log level (takes precedence over `RUST_LOG`).
pub const ENV_LOG_LEVEL: &str = "LH_LOG";
/// Environment variable for the log format.
pub const ENV_LOG_FORMAT: &str = "LH_LOG_FORMAT";
/// Environment variable for the log file path.
pub const ENV_LOG_FILE: &str = "LH_LOG_FILE";

/// Optional behaviours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Let a provider replace a key already present in the context
    /// instead of failing the merge.
    pub allow_provider_overwrite: bool,
}

/// Every configurable value, as loaded from a file or built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// chrono format string for record timestamps.
    pub date_format: String,
    /// Fraction of records kept, in `[0, 1]`.
    pub sample_rate: f64,
    pub features: Features,
    pub sensitive_keys: Vec<String>,
    pub redact_patterns: Vec<String>,
    pub redaction_token: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Human,
            log_file: None,
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            sample_rate: 1.0,
            features: Features::default(),
            sensitive_keys: DEFAULT_SENSITIVE_KEYS.iter().map(|k| k.to_string()).collect(),
            redact_patterns: Vec::new(),
            redaction_token: DEFAULT_REDACTION_TOKEN.to_string(),
        }
    }
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Yaml,
}

impl FileFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(FileFormat::Json),
            "toml" => Ok(FileFormat::Toml),
            "yaml" | "yml" => Ok(FileFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(ext)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Toml => "toml",
            FileFormat::Yaml => "yaml",
        }
    }
}

impl Settings {
    /// Parse settings from text in the given format.
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        let parse_err = |message: String| ConfigError::Parse {
            format: format.name(),
            message,
        };
        match format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
            FileFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            FileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Load settings from a file, choosing the format by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(ConfigError::InvalidValue {
                field: "sample_rate".to_string(),
                message: format!("must be between 0.0 and 1.0, got {}", self.sample_rate),
            });
        }
        if self.date_format.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "date_format".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment overrides.
    ///
    /// `LH_LOG` takes precedence over `RUST_LOG`; unparseable values are ignored.
    /// Only the bare default directive of `RUST_LOG` counts, so
    /// `info,hyper=error` means `info`.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var(ENV_LOG_LEVEL) {
            if let Ok(level) = val.parse::<LogLevel>() {
                self.log_level = level;
            }
        } else if let Ok(val) = std::env::var("RUST_LOG") {
            if let Some(level) = rust_log_default(&val) {
                self.log_level = level;
            }
        }

        if let Ok(val) = std::env::var(ENV_LOG_FORMAT) {
            if let Ok(format) = val.parse::<LogFormat>() {
                self.log_format = format;
            }
        }

        if let Ok(val) = std::env::var(ENV_LOG_FILE) {
            if !val.is_empty() {
                self.log_file = Some(PathBuf::from(val));
            }
        }
    }
}

/// Level of the last bare directive in a `RUST_LOG` filter.
///
/// Directives with a target (`hyper=error`, `my_app`) are skipped.
fn rust_log_default(filter: &str) -> Option<LogLevel> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.contains('='))
        .filter_map(|directive| directive.parse::<LogLevel>().ok())
        .last()
}
