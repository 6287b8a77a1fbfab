use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Observed outcome carried by a feedback event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedbackOutcome {
    /// A lesson (or the whole course, when `lesson` is `None`) was completed.
    Completion {
        /// Completed lesson, or `None` for whole-course completion.
        lesson: Option<String>,
        /// Time spent on the completed unit, in minutes.
        time_spent_minutes: f32,
    },
    /// A quiz was taken.
    Quiz {
        /// Skill tag the quiz exercised.
        skill_tag: String,
        /// Correctness score in `[0, 1]`.
        score: f32,
    },
    /// The learner rated the course explicitly.
    Rating {
        /// Star rating, 1 through 5.
        stars: u8,
    },
}

impl FeedbackOutcome {
    /// Short label used in logs and event types.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completion { .. } => "completion",
            Self::Quiz { .. } => "quiz",
            Self::Rating { .. } => "rating",
        }
    }

    /// Maps the outcome onto a `[0, 1]` training target for the scorer.
    #[must_use]
    pub fn training_label(&self) -> f32 {
        match self {
            Self::Completion { .. } => 1.0,
            Self::Quiz { score, .. } => score.clamp(0.0, 1.0),
            Self::Rating { stars } => (f32::from(stars.saturating_sub(1))) / 4.0,
        }
    }
}

/// Interaction/outcome event produced by the progress-tracking collaborator.
/// Owned by the feedback ingestor until consumed exactly once; `event_id` is
/// the deduplication key for at-least-once delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// Stable identifier used to deduplicate redeliveries.
    pub event_id: Uuid,
    /// Learner the event belongs to.
    pub learner_id: String,
    /// Course the event belongs to.
    pub course_id: String,
    /// Observed outcome.
    pub outcome: FeedbackOutcome,
    /// When the outcome happened.
    pub at: DateTime<Utc>,
}

impl FeedbackEvent {
    /// Creates an event stamped now with a fresh identifier.
    #[must_use]
    pub fn new(
        learner_id: impl Into<String>,
        course_id: impl Into<String>,
        outcome: FeedbackOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            learner_id: learner_id.into(),
            course_id: course_id.into(),
            outcome,
            at: Utc::now(),
        }
    }

    /// Validates identifiers and outcome ranges.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.learner_id.trim().is_empty() {
            return Err(EngineError::malformed("feedback event missing learner id"));
        }
        if self.course_id.trim().is_empty() {
            return Err(EngineError::malformed("feedback event missing course id"));
        }
        match &self.outcome {
            FeedbackOutcome::Quiz { skill_tag, score } => {
                if skill_tag.trim().is_empty() {
                    return Err(EngineError::malformed("quiz outcome missing skill tag"));
                }
                if !score.is_finite() || *score < 0.0 || *score > 1.0 {
                    return Err(EngineError::malformed(format!(
                        "quiz score out of range: {score}"
                    )));
                }
            }
            FeedbackOutcome::Rating { stars } => {
                if !(1..=5).contains(stars) {
                    return Err(EngineError::malformed(format!(
                        "rating stars out of range: {stars}"
                    )));
                }
            }
            FeedbackOutcome::Completion { time_spent_minutes, .. } => {
                if !time_spent_minutes.is_finite() || *time_spent_minutes < 0.0 {
                    return Err(EngineError::malformed(
                        "completion time spent must be non-negative",
                    ));
                }
            }
        }
        Ok(())
    }
}
