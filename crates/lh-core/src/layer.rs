//! Tracing layer that renders events through a [`Formatter`].
//!
//! Events become [`LogRecord`]s: the `message` field is the message, every
//! other field (plus fields of enclosing spans, innermost first) goes into
//! the record's fields. Formatting happens on the emitting thread, so the
//! thread's logging context is visible to the formatter.

use std::io::{self, Write};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::format::Formatter;
use crate::LogRecord;

/// Fields recorded on a span.
#[derive(Debug, Clone, Default)]
struct SpanFields(Map<String, Value>);

/// A visitor that extracts field values from events and spans.
struct JsonFieldVisitor {
    fields: Map<String, Value>,
    message: Option<String>,
}

impl JsonFieldVisitor {
    fn new() -> Self {
        JsonFieldVisitor {
            fields: Map::new(),
            message: None,
        }
    }
}

impl tracing::field::Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else {
            self.fields.insert(field.name().to_string(), Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields.insert(field.name().to_string(), Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), Value::Bool(value));
    }
}

/// Tracing layer writing formatted records to a writer (stderr by default).
pub struct ContextLayer<W = io::Stderr> {
    formatter: Box<dyn Formatter>,
    writer: Mutex<W>,
}

impl ContextLayer<io::Stderr> {
    /// Create a layer writing to stderr.
    pub fn stderr(formatter: impl Formatter + 'static) -> Self {
        ContextLayer::new(io::stderr(), formatter)
    }
}

impl<W: Write> ContextLayer<W> {
    /// Create a layer with a custom writer.
    pub fn new(writer: W, formatter: impl Formatter + 'static) -> Self {
        ContextLayer {
            formatter: Box::new(formatter),
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for ContextLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::new();
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(visitor.fields));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::new();
        values.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            match extensions.get_mut::<SpanFields>() {
                Some(fields) => fields.0.extend(visitor.fields),
                None => extensions.insert(SpanFields(visitor.fields)),
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::new();
        event.record(&mut visitor);

        // Event fields win over span fields; inner spans win over outer ones.
        let mut fields = visitor.fields;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_fields) = span.extensions().get::<SpanFields>() {
                    for (key, value) in &span_fields.0 {
                        if !fields.contains_key(key) {
                            fields.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        let metadata = event.metadata();
        let record = LogRecord::new(
            metadata.target(),
            (*metadata.level()).into(),
            visitor.message.unwrap_or_default(),
        )
        .with_fields(fields);

        match self.formatter.format(&record) {
            Ok(line) => {
                if let Ok(mut writer) = self.writer.lock() {
                    let _ = writeln!(writer, "{}", line);
                }
            }
            Err(err) => {
                // on_event cannot return errors; report without the record.
                eprintln!(
                    "loghelpers: failed to format record from {}: {}",
                    metadata.target(),
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ColorFormatter;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    fn make_buffer_layer(
        formatter: impl Formatter + 'static,
    ) -> (Arc<Mutex<Vec<u8>>>, impl Layer<tracing_subscriber::Registry>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        struct BufWriter(Arc<Mutex<Vec<u8>>>);
        impl Write for BufWriter {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().write(buf)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let layer = ContextLayer::new(BufWriter(buffer.clone()), formatter);
        (buffer, layer)
    }

    fn plain() -> ColorFormatter {
        ColorFormatter::new("{logger} {level} {message}").with_ansi(false)
    }

    #[test]
    fn test_layer_output() {
        let (buffer, layer) = make_buffer_layer(plain());
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "test.event", "disk low");
        });

        let output = buffer.lock().unwrap();
        assert_eq!(String::from_utf8_lossy(&output), "test.event WARNING disk low\n");
    }

    #[test]
    fn test_layer_records_extra_fields() {
        let (buffer, layer) = make_buffer_layer(plain());
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "t", count = 42, active = true, ratio = 0.5, "hi");
        });

        let output = buffer.lock().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&output),
            "t INFO hi active=true count=42 ratio=0.5\n"
        );
    }

    #[test]
    fn test_span_fields_innermost_wins() {
        let (buffer, layer) = make_buffer_layer(plain());
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("outer", request = "r-1", stage = "outer");
            let _outer = outer.enter();
            let inner = tracing::info_span!("inner", stage = "inner");
            let _inner = inner.enter();
            tracing::info!(target: "t", "step");
        });

        let output = buffer.lock().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&output),
            "t INFO step request=r-1 stage=inner\n"
        );
    }

    #[test]
    fn test_recorded_span_fields() {
        let (buffer, layer) = make_buffer_layer(plain());
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("work", user = tracing::field::Empty);
            span.record("user", "alice");
            let _entered = span.enter();
            tracing::error!(target: "t", "failed");
        });

        let output = buffer.lock().unwrap();
        assert_eq!(String::from_utf8_lossy(&output), "t ERROR failed user=alice\n");
    }

    struct Failing;

    impl Formatter for Failing {
        fn format(&self, _record: &LogRecord) -> crate::Result<String> {
            Err(crate::LogError::DateFormat("%Q".to_string()))
        }
    }

    #[test]
    fn test_format_failure_writes_nothing() {
        let (buffer, layer) = make_buffer_layer(Failing);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "t", "lost");
        });

        assert!(buffer.lock().unwrap().is_empty());
    }
}
