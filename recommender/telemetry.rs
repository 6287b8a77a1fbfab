use std::{fmt, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{LogLevel, LogRecord, LogSink};
use tokio::runtime::{Handle, Runtime};

/// Builder for recommender telemetry sinks.
pub struct RecommenderTelemetryBuilder {
    component: String,
    sink: Option<Arc<dyn LogSink>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl RecommenderTelemetryBuilder {
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
    pub fn build(self) -> Result<RecommenderTelemetry> {
        RecommenderTelemetry::new(self.component, self.sink, self.event_publisher)
    }
}

/// Telemetry handle shared across recommender components.
#[derive(Clone)]
pub struct RecommenderTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for RecommenderTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommenderTelemetry")
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

impl RecommenderTelemetry {
    fn new(
        component: impl Into<String>,
        sink: Option<Arc<dyn LogSink>>,
        event_publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Result<Self> {
        let event = if let Some(publisher) = event_publisher {
            Some(EventHandle::new(publisher)?)
        } else {
            None
        };
        Ok(Self {
            inner: Arc::new(TelemetryInner {
                component: component.into(),
                sink,
                event,
            }),
        })
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> RecommenderTelemetryBuilder {
        RecommenderTelemetryBuilder::new(component)
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
    use shared_event_bus::MemoryEventBus;
    use shared_logging::MemorySink;

    #[test]
    fn telemetry_writes_log_and_event() {
        let sink = Arc::new(MemorySink::new());
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = RecommenderTelemetry::builder("recommender.model")
            .sink(sink.clone())
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Info, "model.update", json!({ "version": 7 }))
            .unwrap();
        telemetry
            .event("model.update.applied", json!({ "version": 7 }))
            .unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.snapshot()[0].message, "model.update");
        assert_eq!(bus.snapshot().len(), 1);
    }
}
