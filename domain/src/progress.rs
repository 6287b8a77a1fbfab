use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One quiz attempt inside a progress record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    /// When the attempt happened.
    pub at: DateTime<Utc>,
    /// Correctness score in `[0, 1]`.
    pub score: f32,
    /// Skill tag the quiz exercised.
    pub skill_tag: String,
}

impl QuizAttempt {
    /// Creates an attempt.
    #[must_use]
    pub fn new(skill_tag: impl Into<String>, score: f32, at: DateTime<Utc>) -> Self {
        Self {
            at,
            score,
            skill_tag: skill_tag.into(),
        }
    }
}

/// Append-only history for one (learner, course) pair. Historical entries are
/// never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Learner identifier.
    pub learner_id: String,
    /// Course identifier.
    pub course_id: String,
    /// Quiz attempts in arrival order.
    pub attempts: Vec<QuizAttempt>,
    /// Lessons completed within the course.
    pub completed_lessons: IndexSet<String>,
    /// Total time spent, in minutes.
    pub time_spent_minutes: f32,
    /// Set when the whole course was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Creates an empty record for a (learner, course) pair.
    #[must_use]
    pub fn new(learner_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            course_id: course_id.into(),
            attempts: Vec::new(),
            completed_lessons: IndexSet::new(),
            time_spent_minutes: 0.0,
            completed_at: None,
        }
    }

    /// Appends a quiz attempt.
    pub fn append_attempt(&mut self, attempt: QuizAttempt) {
        self.attempts.push(attempt);
    }

    /// Records lesson (or whole-course, when `lesson` is `None`) completion.
    pub fn record_completion(
        &mut self,
        lesson: Option<String>,
        time_spent_minutes: f32,
        at: DateTime<Utc>,
    ) {
        if let Some(lesson) = lesson {
            self.completed_lessons.insert(lesson);
        } else {
            self.completed_at = Some(at);
        }
        self.time_spent_minutes += time_spent_minutes.max(0.0);
    }

    /// True once the whole course was completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Derived per-learner deficiency scores. Fully recomputed from history,
/// never incrementally patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaknessProfile {
    /// Learner the profile belongs to.
    pub learner_id: String,
    /// Deficiency per skill tag, each in `[0, 1]`.
    pub deficiencies: IndexMap<String, f32>,
    /// Tags whose deficiency exceeded the cutoff with enough attempts.
    pub weak_tags: IndexSet<String>,
    /// Timestamp of the newest attempt the profile was computed from. Derived
    /// from the input history (not the wall clock) so recomputation over an
    /// unchanged history is bit-identical.
    pub as_of: Option<DateTime<Utc>>,
}

impl WeaknessProfile {
    /// An empty profile for a learner with no quiz history.
    #[must_use]
    pub fn empty(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            deficiencies: IndexMap::new(),
            weak_tags: IndexSet::new(),
            as_of: None,
        }
    }

    /// Deficiency for a tag; unobserved tags read as zero.
    #[must_use]
    pub fn deficiency(&self, tag: &str) -> f32 {
        self.deficiencies.get(tag).copied().unwrap_or(0.0)
    }

    /// True when the tag was flagged weak.
    #[must_use]
    pub fn is_weak(&self, tag: &str) -> bool {
        self.weak_tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_append_only() {
        let mut record = ProgressRecord::new("l-1", "c-1");
        record.append_attempt(QuizAttempt::new("loops", 0.4, Utc::now()));
        record.append_attempt(QuizAttempt::new("loops", 0.9, Utc::now()));
        assert_eq!(record.attempts.len(), 2);
        assert!((record.attempts[0].score - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn whole_course_completion_sets_timestamp() {
        let mut record = ProgressRecord::new("l-1", "c-1");
        record.record_completion(Some("intro".into()), 12.0, Utc::now());
        assert!(!record.is_completed());
        record.record_completion(None, 30.0, Utc::now());
        assert!(record.is_completed());
        assert!((record.time_spent_minutes - 42.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unobserved_tags_read_as_zero_deficiency() {
        let profile = WeaknessProfile::empty("l-1");
        assert!((profile.deficiency("loops") - 0.0).abs() < f32::EPSILON);
        assert!(!profile.is_weak("loops"));
    }
}
