#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Compass recommendation stack: feature extraction, the online scoring model
//! with versioned snapshots, and quiz-history weakness analysis.

/// Feature extraction from learner and course records.
#[path = "../features/main.rs"]
pub mod features;

/// Online scoring model with immutable versioned snapshots.
#[path = "../model/main.rs"]
pub mod model;

/// Telemetry helpers for logging/event emission.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Recency-weighted weakness analysis.
#[path = "../weakness/main.rs"]
pub mod weakness;

pub use features::{FeatureExtractor, SkillSpace, PAIR_FEATURE_DIM};
pub use model::{prior::PopularityPrior, snapshot::ModelSnapshot, RecommendationModel};
pub use telemetry::{RecommenderTelemetry, RecommenderTelemetryBuilder};
pub use weakness::{board::WeaknessBoard, WeaknessAnalyzer};
