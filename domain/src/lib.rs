#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Core data model, error taxonomy, configuration, and collaborator seams for
//! the Compass recommendation and path-planning engine.

/// Course catalog types and the prerequisite graph.
pub mod catalog;
/// Configuration constants for every engine component.
pub mod config;
/// Engine-wide error taxonomy.
pub mod error;
/// Feedback events delivered by the progress-tracking collaborator.
pub mod feedback;
/// Learner profile types.
pub mod learner;
/// Quiz/lesson progress records and derived weakness profiles.
pub mod progress;
/// Recommendation and learning-path result types.
pub mod recommendation;
/// Collaborator store traits plus in-memory reference implementations.
pub mod stores;

pub use catalog::{CourseCatalog, CourseNode, DeliveryMode, DifficultyTier};
pub use config::{EngineConfig, ModelConfig, PathConfig, WeaknessConfig};
pub use error::EngineError;
pub use feedback::{FeedbackEvent, FeedbackOutcome};
pub use learner::{LearnerProfile, LearningStyle};
pub use progress::{ProgressRecord, QuizAttempt, WeaknessProfile};
pub use recommendation::{LearningPath, RationaleTag, RecommendationEntry, RecommendationResult};
pub use stores::{
    CourseCatalogStore, LearnerStore, MemoryCatalogStore, MemoryLearnerStore, MemoryProgressStore,
    ProgressStore,
};
