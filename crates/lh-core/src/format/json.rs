use std::sync::Arc;

use lh_config::Configuration;
use lh_context::{LoggingContext, ProviderRegistry};
use serde_json::{Map, Value};

use super::Formatter;
use crate::{LogRecord, Result};

/// Formats records as one redacted JSON object per line.
///
/// The payload holds `timestamp`, `logger`, `level` and `message`, then the
/// resolved context, then the record's fields, then `exception` when present.
/// Later entries replace earlier ones with the same key. The whole payload
/// passes through the configuration's redactor before serialization.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: Arc<Configuration>,
    registry: Arc<ProviderRegistry>,
}

impl JsonFormatter {
    pub fn new(config: Arc<Configuration>, registry: Arc<ProviderRegistry>) -> Self {
        Self { config, registry }
    }

    /// Build the unredacted payload.
    fn payload(&self, record: &LogRecord) -> Result<Map<String, Value>> {
        let timestamp = record.format_timestamp(&self.config.date_format())?;
        let context = LoggingContext::resolve(&self.config, &self.registry)?;

        let mut payload = Map::new();
        payload.insert("timestamp".to_string(), Value::String(timestamp));
        payload.insert("logger".to_string(), Value::String(record.logger.clone()));
        payload.insert(
            "level".to_string(),
            Value::String(record.level.as_upper().to_string()),
        );
        payload.insert("message".to_string(), Value::String(record.message.clone()));
        payload.extend(context.into_iter().map(|(k, v)| (k, Value::String(v))));
        payload.extend(record.fields.clone());
        if let Some(exception) = &record.exception {
            payload.insert("exception".to_string(), Value::String(exception.clone()));
        }
        Ok(payload)
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let payload = self.payload(record)?;
        let redacted = self.config.redactor().redact_map(&payload);
        Ok(serde_json::to_string(&Value::Object(redacted))?)
    }
}
