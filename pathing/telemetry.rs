use std::{fmt, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_logging::{LogLevel, LogRecord, LogSink};

/// Builder for pathing telemetry sinks.
pub struct PathingTelemetryBuilder {
    component: String,
    sink: Option<Arc<dyn LogSink>>,
}

impl PathingTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            sink: None,
        }
    }

    /// Sets the log sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the telemetry handle.
    #[must_use]
    pub fn build(self) -> PathingTelemetry {
        PathingTelemetry {
            inner: Arc::new(TelemetryInner {
                component: self.component,
                sink: self.sink,
            }),
        }
    }
}

/// Log-only telemetry handle for the planning components.
#[derive(Clone)]
pub struct PathingTelemetry {
    inner: Arc<TelemetryInner>,
}

struct TelemetryInner {
    component: String,
    sink: Option<Arc<dyn LogSink>>,
}

impl fmt::Debug for PathingTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathingTelemetry")
            .field("component", &self.inner.component)
            .finish()
    }
}

impl PathingTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> PathingTelemetryBuilder {
        PathingTelemetryBuilder::new(component)
    }

    /// Logs structured fields.
    pub fn log(&self, level: LogLevel, message: &str, fields: Value) -> Result<()> {
        if let Some(sink) = &self.inner.sink {
            sink.write(
                &LogRecord::new(&self.inner.component, level, message).with_fields(fields),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_logging::MemorySink;

    #[test]
    fn telemetry_writes_to_sink() {
        let sink = Arc::new(MemorySink::new());
        let telemetry = PathingTelemetry::builder("pathing.optimizer")
            .sink(sink.clone())
            .build();
        telemetry
            .log(LogLevel::Info, "plan.complete", json!({ "courses": 2 }))
            .unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.snapshot()[0].component, "pathing.optimizer");
    }

    #[test]
    fn missing_sink_is_a_quiet_no_op() {
        let telemetry = PathingTelemetry::builder("pathing.optimizer").build();
        assert!(telemetry
            .log(LogLevel::Debug, "plan.start", json!({}))
            .is_ok());
    }
}
