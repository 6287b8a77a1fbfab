#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON logging shared across the Compass engine crates.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Warning indicator.
    Warn,
    /// Error indicator.
    Error,
}

/// Structured log record emitted by engine components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub at: DateTime<Utc>,
    /// Component emitting the record (e.g., `recommender.model`).
    pub component: String,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Correlation identifier tying records to one request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<String>,
    /// Structured fields (metrics, identifiers).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record with the provided component, level, and message.
    #[must_use]
    pub fn new(component: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            component: component.into(),
            level,
            message: message.into(),
            correlation: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Attaches a correlation identifier.
    #[must_use]
    pub fn with_correlation(mut self, correlation: impl Into<String>) -> Self {
        self.correlation = Some(correlation.into());
        self
    }

    /// Attaches structured fields from a JSON object value. Non-object values are ignored.
    #[must_use]
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        if let Some(map) = fields.as_object() {
            self.fields = map.clone();
        }
        self
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Writes one record to the sink.
    fn write(&self, record: &LogRecord) -> Result<()>;
}

/// Thread-safe JSONL logger with append-only semantics.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Creates or opens a logger at the desired path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Returns the underlying file path (useful for tests).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonLogger {
    fn write(&self, record: &LogRecord) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory sink retaining records for test assertions.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Number of records written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True when nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn json_logger_writes_lines() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("engine.log")).unwrap();
        logger
            .write(
                &LogRecord::new("engine", LogLevel::Info, "recommend.complete")
                    .with_fields(json!({ "results": 3 })),
            )
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"recommend.complete\""));
        assert!(content.contains("\"results\":3"));
    }

    #[test]
    fn memory_sink_retains_records() {
        let sink = MemorySink::new();
        sink.write(
            &LogRecord::new("model", LogLevel::Debug, "update.applied")
                .with_correlation("req-1"),
        )
        .unwrap();
        let records = sink.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].correlation.as_deref(), Some("req-1"));
    }
}
