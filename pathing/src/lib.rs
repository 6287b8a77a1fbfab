#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Compass path planning: prerequisite-graph validation and the
//! deficiency-aware learning-path optimizer.

/// Prerequisite graph validation and topological ordering.
#[path = "../graph/main.rs"]
pub mod graph;

/// Goal-covering path optimization.
#[path = "../optimizer/main.rs"]
pub mod optimizer;

/// Telemetry helpers for logging.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use graph::{GraphValidator, ValidatedOrder};
pub use optimizer::PathOptimizer;
pub use telemetry::{PathingTelemetry, PathingTelemetryBuilder};
