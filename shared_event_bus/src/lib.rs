#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Event bus abstractions connecting the engine to its upstream collaborators.
//!
//! Delivery is at-least-once: a record may arrive more than once and the
//! `delivery_attempt` counter grows on redelivery. Consumers deduplicate by
//! `event_id` and re-sort by timestamp where ordering matters.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::broadcast};
use uuid::Uuid;

/// Generic event record encoded as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Stable identifier used by consumers to deduplicate redeliveries.
    pub event_id: Uuid,
    /// Component producing the event.
    pub source: String,
    /// Event type (e.g., `feedback.quiz`).
    pub event_type: String,
    /// Production timestamp.
    pub at: DateTime<Utc>,
    /// 1-based delivery attempt; grows when the producer redelivers.
    pub delivery_attempt: u32,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Creates a first-attempt record stamped now.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            source: source.into(),
            event_type: event_type.into(),
            at: Utc::now(),
            delivery_attempt: 1,
            payload,
        }
    }

    /// Returns a copy representing one more delivery of the same event.
    #[must_use]
    pub fn redelivered(mut self) -> Self {
        self.delivery_attempt = self.delivery_attempt.saturating_add(1);
        self
    }
}

/// Event publisher interface.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event to the bus.
    async fn publish(&self, event: EventRecord) -> Result<()>;
}

/// Event subscriber interface.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Starts consuming events. Implementations should stream until the channel closes.
    async fn subscribe(&self) -> Result<broadcast::Receiver<EventRecord>>;
}

/// In-memory broadcast bus (for local development and tests).
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<EventRecord>,
    backlog: Arc<Mutex<VecDeque<EventRecord>>>,
    backlog_capacity: usize,
}

impl MemoryEventBus {
    /// Creates a new bus retaining at most `capacity` recent events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            backlog_capacity: capacity,
        }
    }

    /// Snapshot of recent events retained in memory.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.backlog.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, event: EventRecord) -> Result<()> {
        {
            let mut backlog = self.backlog.lock();
            if backlog.len() == self.backlog_capacity {
                backlog.pop_front();
            }
            backlog.push_back(event.clone());
        }
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for MemoryEventBus {
    async fn subscribe(&self) -> Result<broadcast::Receiver<EventRecord>> {
        Ok(self.sender.subscribe())
    }
}

/// File-backed publisher useful for durable event logs.
#[derive(Debug, Clone)]
pub struct FileEventPublisher {
    path: PathBuf,
}

impl FileEventPublisher {
    /// Creates a publisher that appends JSON lines to the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl EventPublisher for FileEventPublisher {
    async fn publish(&self, event: EventRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let data = serde_json::to_vec(&event)?;
        file.write_all(&data).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::runtime::Runtime;

    fn quiz_event() -> EventRecord {
        EventRecord::new(
            "progress-tracker",
            "feedback.quiz",
            json!({ "learner_id": "l-1", "score": 0.4 }),
        )
    }

    #[test]
    fn publishes_and_receives() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bus = MemoryEventBus::new(16);
            let mut rx = bus.subscribe().await.unwrap();
            bus.publish(quiz_event()).await.unwrap();
            let event = rx.recv().await.unwrap();
            assert_eq!(event.event_type, "feedback.quiz");
            assert_eq!(event.delivery_attempt, 1);
        });
    }

    #[test]
    fn backlog_stays_bounded() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bus = MemoryEventBus::new(2);
            for _ in 0..4 {
                bus.publish(quiz_event()).await.unwrap();
            }
            assert_eq!(bus.snapshot().len(), 2);
        });
    }

    #[test]
    fn redelivery_keeps_id_and_bumps_attempt() {
        let event = quiz_event();
        let id = event.event_id;
        let again = event.redelivered();
        assert_eq!(again.event_id, id);
        assert_eq!(again.delivery_attempt, 2);
    }

    #[test]
    fn file_publisher_writes_events() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("events.log");
            let publisher = FileEventPublisher::new(&path).unwrap();
            publisher.publish(quiz_event()).await.unwrap();
            let content = std::fs::read_to_string(path).unwrap();
            assert!(content.contains("feedback.quiz"));
        });
    }
}
