#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Request-level facade for the Compass engine: `recommend`, `plan_path`, and
//! `ingest_feedback` composed over the recommender, pathing, and feedback
//! crates.

/// TTL cache of extracted pair features.
pub mod cache;
/// The engine facade and its builder.
pub mod engine;
/// Telemetry helpers with request correlation.
pub mod telemetry;

pub use cache::FeatureCache;
pub use engine::{EngineBuilder, RecommendationEngine};
pub use telemetry::{EngineTelemetry, EngineTelemetryBuilder};
