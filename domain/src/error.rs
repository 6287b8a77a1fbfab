use thiserror::Error;

/// Errors surfaced by the engine's request-level operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input data missing required fields or carrying out-of-range values.
    /// Rejected locally; the engine never substitutes silent defaults.
    #[error("malformed record: {detail}")]
    MalformedRecord {
        /// What was wrong with the record.
        detail: String,
    },
    /// The supplied prerequisite graph contains a cycle.
    #[error("prerequisite cycle through courses: {}", .remaining.join(", "))]
    CycleDetected {
        /// Courses that could not be topologically ordered.
        remaining: Vec<String>,
    },
    /// A goal skill tag cannot be reached with any course in the catalog.
    #[error("no course in the catalog can satisfy goal skill '{skill_tag}'")]
    UnreachableGoal {
        /// The goal tag with no covering course.
        skill_tag: String,
    },
    /// The caller holds a model snapshot older than the retention window.
    #[error("model snapshot v{held} trails current v{current} beyond retention window {retention}")]
    StaleSnapshot {
        /// Version the caller holds.
        held: u64,
        /// Version currently published.
        current: u64,
        /// Configured retention window in versions.
        retention: u64,
    },
    /// An update lane is at capacity; the caller should retry with backoff.
    #[error("update lane '{lane}' is at capacity")]
    Overloaded {
        /// The lane that rejected the write.
        lane: String,
    },
    /// The operation observed its cancellation token and aborted cooperatively.
    #[error("operation cancelled before completion")]
    Cancelled,
    /// No profile exists for the requested learner.
    #[error("unknown learner '{learner_id}'")]
    UnknownLearner {
        /// The missing learner identifier.
        learner_id: String,
    },
    /// No course exists for the requested identifier.
    #[error("unknown course '{course_id}'")]
    UnknownCourse {
        /// The missing course identifier.
        course_id: String,
    },
    /// A collaborator store failed.
    #[error("store failure: {0}")]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// Convenience constructor for [`EngineError::MalformedRecord`].
    #[must_use]
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedRecord {
            detail: detail.into(),
        }
    }

    /// Whether the caller may retry the operation without changing the request.
    ///
    /// `Cancelled` is deliberately excluded: the abort was requested by the
    /// caller and is not an error for metrics purposes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Overloaded { .. } | Self::StaleSnapshot { .. } | Self::Store(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_matches_taxonomy() {
        assert!(EngineError::Overloaded {
            lane: "weakness:l-1".into()
        }
        .is_retryable());
        assert!(EngineError::StaleSnapshot {
            held: 1,
            current: 40,
            retention: 32
        }
        .is_retryable());
        assert!(!EngineError::Cancelled.is_retryable());
        assert!(!EngineError::malformed("empty skill vector").is_retryable());
    }

    #[test]
    fn cycle_message_lists_courses() {
        let err = EngineError::CycleDetected {
            remaining: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().contains("a, b"));
    }
}
