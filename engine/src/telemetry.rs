use std::{fmt, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{LogLevel, LogRecord, LogSink};
use tokio::runtime::{Handle, Runtime};

/// Builder for engine telemetry sinks.
pub struct EngineTelemetryBuilder {
    component: String,
    sink: Option<Arc<dyn LogSink>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl EngineTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            sink: None,
            event_publisher: None,
        }
    }

    /// Sets the log sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<EngineTelemetry> {
        let event = if let Some(publisher) = self.event_publisher {
            Some(EventHandle::new(publisher)?)
        } else {
            None
        };
        Ok(EngineTelemetry {
            inner: Arc::new(TelemetryInner {
                component: self.component,
                sink: self.sink,
                event,
            }),
        })
    }
}

/// Telemetry handle for the request-level operations. Every record carries
/// the request correlation id so one request's records can be stitched back
/// together.
#[derive(Clone)]
pub struct EngineTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for EngineTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineTelemetry")
            .field("component", &self.inner.component)
            .finish()
    }
}

struct TelemetryInner {
    component: String,
    sink: Option<Arc<dyn LogSink>>,
    event: Option<EventHandle>,
}

struct EventHandle {
    runtime: Runtime,
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        Ok(Self {
            runtime: Runtime::new()?,
            publisher,
        })
    }

    fn publish(&self, record: EventRecord) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(record).await {
                    eprintln!("telemetry event publish failed: {err:?}");
                }
            });
            Ok(())
        } else {
            self.runtime.block_on(self.publisher.publish(record))
        }
    }
}

impl EngineTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> EngineTelemetryBuilder {
        EngineTelemetryBuilder::new(component)
    }

    /// Logs structured fields under a request correlation id.
    pub fn log(
        &self,
        level: LogLevel,
        message: &str,
        correlation: &str,
        fields: Value,
    ) -> Result<()> {
        if let Some(sink) = &self.inner.sink {
            sink.write(
                &LogRecord::new(&self.inner.component, level, message)
                    .with_correlation(correlation)
                    .with_fields(fields),
            )?;
        }
        Ok(())
    }

    /// Emits an event on the bus.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(EventRecord::new(
                self.inner.component.clone(),
                event_type,
                payload,
            ))?;
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
    fn records_carry_the_request_correlation() {
        let sink = Arc::new(MemorySink::new());
        let telemetry = EngineTelemetry::builder("engine")
            .sink(sink.clone())
            .build()
            .unwrap();
        telemetry
            .log(
                LogLevel::Info,
                "recommend.complete",
                "req-42",
                json!({ "results": 5 }),
            )
            .unwrap();
        let records = sink.snapshot();
        assert_eq!(records[0].correlation.as_deref(), Some("req-42"));
    }
}
