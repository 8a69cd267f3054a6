//! The shared, runtime-mutable configuration object.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use lh_redact::{RedactionError, Redactor};
use serde_json::Value;

use crate::{ConfigError, LogFormat, LogLevel, Result, Settings};

struct State {
    settings: Settings,
    redactor: Arc<Redactor>,
}

/// Configuration shared by formatters, handlers and the context merge.
///
/// Every field lives behind one lock. Readers get copies ([`snapshot`],
/// [`redactor`]) so the lock is never held while formatting or redacting.
/// Redactor updates are copy-on-write; an outstanding snapshot keeps the
/// rules it was taken with.
///
/// [`snapshot`]: Configuration::snapshot
/// [`redactor`]: Configuration::redactor
pub struct Configuration {
    state: Mutex<State>,
}

impl Configuration {
    /// Build a configuration, compiling the redaction patterns.
    pub fn new(settings: Settings) -> Result<Self> {
        let redactor = build_redactor(&settings)?;
        Ok(Configuration {
            state: Mutex::new(State {
                settings,
                redactor: Arc::new(redactor),
            }),
        })
    }

    /// Load from a JSON, TOML or YAML file (chosen by extension) and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Settings::from_file(path)?;
        settings.validate()?;
        Self::new(settings)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();
        settings.apply_env();
        Self::new(settings)
    }

    /// Replace the current settings with the contents of a file.
    ///
    /// On any error the current settings are kept.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let settings = Settings::from_file(path)?;
        settings.validate()?;
        let redactor = build_redactor(&settings)?;
        let mut state = self.lock();
        state.settings = settings;
        state.redactor = Arc::new(redactor);
        Ok(())
    }

    /// Apply `LH_LOG`, `LH_LOG_FORMAT` and `LH_LOG_FILE` overrides.
    pub fn apply_env(&self) {
        self.lock().settings.apply_env();
    }

    /// Validate the current settings.
    pub fn validate(&self) -> Result<()> {
        self.lock().settings.validate()
    }

    /// A copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.lock().settings.clone()
    }

    /// The current redactor.
    pub fn redactor(&self) -> Arc<Redactor> {
        Arc::clone(&self.lock().redactor)
    }

    pub fn log_level(&self) -> LogLevel {
        self.lock().settings.log_level
    }

    pub fn log_format(&self) -> LogFormat {
        self.lock().settings.log_format
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.lock().settings.log_file.clone()
    }

    pub fn date_format(&self) -> String {
        self.lock().settings.date_format.clone()
    }

    pub fn sample_rate(&self) -> f64 {
        self.lock().settings.sample_rate
    }

    /// Whether providers may overwrite keys already in the context.
    ///
    /// Read under the lock on every call, so a toggle takes effect on the
    /// next merge.
    pub fn allow_provider_overwrite(&self) -> bool {
        self.lock().settings.features.allow_provider_overwrite
    }

    pub fn set_allow_provider_overwrite(&self, enabled: bool) {
        self.lock().settings.features.allow_provider_overwrite = enabled;
    }

    pub fn update_log_level(&self, level: LogLevel) {
        self.lock().settings.log_level = level;
    }

    pub fn update_log_format(&self, format: LogFormat) {
        self.lock().settings.log_format = format;
    }

    pub fn update_log_file(&self, path: Option<PathBuf>) {
        self.lock().settings.log_file = path;
    }

    /// Set the sample rate. Range is checked by [`validate`](Self::validate).
    pub fn update_sample_rate(&self, rate: f64) {
        self.lock().settings.sample_rate = rate;
    }

    /// Replace the sensitive key set.
    pub fn update_sensitive_keys(&self, keys: HashSet<String>) {
        let mut state = self.lock();
        let state = &mut *state;
        Arc::make_mut(&mut state.redactor).set_sensitive_keys(keys);
        state.settings.sensitive_keys = sorted_keys(&state.redactor);
    }

    /// Add one sensitive key.
    pub fn add_sensitive_key(&self, key: &str) {
        let mut state = self.lock();
        let state = &mut *state;
        Arc::make_mut(&mut state.redactor).add_sensitive_key(key);
        state.settings.sensitive_keys = sorted_keys(&state.redactor);
    }

    /// Replace the value patterns; an invalid pattern leaves them unchanged.
    pub fn update_redact_patterns(&self, patterns: Vec<String>) -> Result<()> {
        let mut state = self.lock();
        let state = &mut *state;
        Arc::make_mut(&mut state.redactor).set_redact_patterns(&patterns)?;
        state.settings.redact_patterns = patterns;
        Ok(())
    }

    pub fn update_redaction_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut state = self.lock();
        Arc::make_mut(&mut state.redactor).set_redaction_token(token.clone());
        state.settings.redaction_token = token;
    }

    /// Set a single field by name from an untyped value.
    ///
    /// Unknown names fail with [`ConfigError::InvalidKey`]; values of the
    /// wrong shape fail with [`ConfigError::InvalidType`]. Nothing changes on error.
    pub fn set_value(&self, key: &str, value: &Value) -> Result<()> {
        match key {
            "sensitive_keys" | "redact_patterns" | "redaction_token" => {
                let mut state = self.lock();
                let state = &mut *state;
                let redactor = Arc::make_mut(&mut state.redactor);
                match key {
                    "sensitive_keys" => redactor.set_sensitive_keys_value(value),
                    "redact_patterns" => redactor.set_redact_patterns_value(value),
                    _ => redactor.set_redaction_token_value(value),
                }
                .map_err(redaction_to_config)?;
                sync_redaction_settings(&mut state.settings, &state.redactor);
                Ok(())
            }
            "allow_provider_overwrite" => {
                let enabled = value
                    .as_bool()
                    .ok_or_else(|| ConfigError::invalid_type(key, "a boolean"))?;
                self.set_allow_provider_overwrite(enabled);
                Ok(())
            }
            _ => {
                // Route the rest through serde so parsing rules match file loading.
                let mut state = self.lock();
                let mut doc = serde_json::to_value(&state.settings).map_err(|e| ConfigError::Parse {
                    format: "json",
                    message: e.to_string(),
                })?;
                let fields = doc
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;
                if !fields.contains_key(key) && key != "log_file" {
                    return Err(ConfigError::InvalidKey(key.to_string()));
                }
                fields.insert(key.to_string(), value.clone());
                let updated: Settings = serde_json::from_value(doc)
                    .map_err(|_| ConfigError::invalid_type(key, expected_shape(key)))?;
                state.settings = updated;
                Ok(())
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is replaced wholesale on every update, so a poisoned lock
        // still holds a consistent value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let settings = Settings::default();
        let redactor = Redactor::with_keys(settings.sensitive_keys.iter());
        Configuration {
            state: Mutex::new(State {
                settings,
                redactor: Arc::new(redactor),
            }),
        }
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("settings", &self.snapshot())
            .finish()
    }
}

fn build_redactor(settings: &Settings) -> Result<Redactor> {
    Ok(Redactor::new(
        settings.sensitive_keys.iter(),
        settings.redact_patterns.as_slice(),
        settings.redaction_token.clone(),
    )?)
}

fn redaction_to_config(err: RedactionError) -> ConfigError {
    match err {
        RedactionError::InvalidType { field, expected } => ConfigError::invalid_type(field, expected),
        other => ConfigError::Redaction(other),
    }
}

fn sync_redaction_settings(settings: &mut Settings, redactor: &Redactor) {
    settings.sensitive_keys = sorted_keys(redactor);
    settings.redact_patterns = redactor
        .redact_patterns()
        .iter()
        .map(|re| re.as_str().to_string())
        .collect();
    settings.redaction_token = redactor.redaction_token().to_string();
}

fn sorted_keys(redactor: &Redactor) -> Vec<String> {
    let mut keys: Vec<String> = redactor.sensitive_keys().iter().cloned().collect();
    keys.sort();
    keys
}

fn expected_shape(key: &str) -> &'static str {
    match key {
        "debug" => "a boolean",
        "sample_rate" => "a number",
        "log_level" => "a level name",
        "log_format" => "a format name",
        "features" => "an object",
        _ => "a string",
    }
}
