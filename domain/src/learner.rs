use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Preferred content delivery style reported by the learner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LearningStyle {
    /// Learns best from video and diagrams.
    Visual,
    /// Learns best from narrated material.
    Auditory,
    /// Learns best from written material.
    ReadingWriting,
    /// Learns best from hands-on exercises.
    Kinesthetic,
}

impl LearningStyle {
    /// Short label used in logs and payloads.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Auditory => "auditory",
            Self::ReadingWriting => "reading_writing",
            Self::Kinesthetic => "kinesthetic",
        }
    }
}

/// Skill state and stated goals for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    /// Opaque identifier supplied by the identity collaborator.
    pub learner_id: String,
    /// Proficiency per skill tag, each in `[0, 1]`. A tag absent from the map
    /// is legitimately untrained (0); an empty map is malformed.
    pub skills: IndexMap<String, f32>,
    /// Skill tags the learner wants to reach.
    pub goals: IndexSet<String>,
    /// Preferred delivery style.
    pub learning_style: LearningStyle,
    /// Number of feedback interactions applied so far.
    pub interactions: u64,
}

impl LearnerProfile {
    /// Creates a profile with no goals and zero interactions.
    #[must_use]
    pub fn new(learner_id: impl Into<String>, learning_style: LearningStyle) -> Self {
        Self {
            learner_id: learner_id.into(),
            skills: IndexMap::new(),
            goals: IndexSet::new(),
            learning_style,
            interactions: 0,
        }
    }

    /// Sets a skill proficiency (chainable, for tests and seeding).
    #[must_use]
    pub fn with_skill(mut self, tag: impl Into<String>, proficiency: f32) -> Self {
        self.skills.insert(tag.into(), proficiency);
        self
    }

    /// Adds a goal tag (chainable).
    #[must_use]
    pub fn with_goal(mut self, tag: impl Into<String>) -> Self {
        self.goals.insert(tag.into());
        self
    }

    /// Proficiency for a tag; absent tags read as untrained.
    #[must_use]
    pub fn proficiency(&self, tag: &str) -> f32 {
        self.skills.get(tag).copied().unwrap_or(0.0)
    }

    /// Mean proficiency across known skills.
    #[must_use]
    pub fn mean_proficiency(&self) -> f32 {
        if self.skills.is_empty() {
            return 0.0;
        }
        self.skills.values().sum::<f32>() / self.skills.len() as f32
    }

    /// Validates required fields and the proficiency range invariant.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.learner_id.trim().is_empty() {
            return Err(EngineError::malformed("learner profile missing identifier"));
        }
        if self.skills.is_empty() {
            return Err(EngineError::malformed(format!(
                "learner '{}' has an empty skill vector",
                self.learner_id
            )));
        }
        for (tag, value) in &self.skills {
            if !value.is_finite() || *value < 0.0 || *value > 1.0 {
                return Err(EngineError::malformed(format!(
                    "proficiency for '{tag}' is out of range: {value}"
                )));
            }
        }
        Ok(())
    }
}
