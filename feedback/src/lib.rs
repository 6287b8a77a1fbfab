#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Feedback ingestion for the Compass engine: exactly-once application of
//! at-least-once delivered events, a durable feedback journal, and ordered
//! asynchronous weakness/model update lanes.

/// The feedback ingestor and its update lanes.
pub mod ingestor;
/// Durable JSONL journal of applied feedback events.
pub mod journal;
/// Decoding of bus records from the upstream event source.
pub mod source;

pub use ingestor::{FeedbackIngestor, FeedbackIngestorBuilder, IngestAck};
pub use journal::FeedbackJournal;
pub use source::{decode_feedback, spawn_bus_pump};
