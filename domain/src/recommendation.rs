use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a course was recommended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RationaleTag {
    /// Scored by the personalized model.
    Personalized,
    /// Scored by the population prior; the learner has too little history.
    ColdStart,
    /// The course remediates a flagged weak skill.
    Remediation,
}

impl RationaleTag {
    /// Short label used in logs and payloads.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Personalized => "personalized",
            Self::ColdStart => "cold_start",
            Self::Remediation => "remediation",
        }
    }
}

/// One ranked recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationEntry {
    /// Recommended course.
    pub course_id: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Why the course was recommended.
    pub rationale: RationaleTag,
}

/// Ordered recommendation list: distinct course identifiers, descending
/// confidence, ties broken by ascending course identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Ranked entries.
    pub entries: Vec<RecommendationEntry>,
}

impl RecommendationResult {
    /// Builds a result from unordered entries, enforcing the ordering and
    /// distinctness invariants and truncating to `k` entries.
    #[must_use]
    pub fn ranked(mut entries: Vec<RecommendationEntry>, k: usize) -> Self {
        for entry in &mut entries {
            entry.confidence = if entry.confidence.is_finite() {
                entry.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        entries.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.course_id.cmp(&b.course_id))
        });
        let mut seen = indexmap::IndexSet::new();
        entries.retain(|entry| seen.insert(entry.course_id.clone()));
        entries.truncate(k);
        Self { entries }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recommended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Course identifiers in rank order.
    #[must_use]
    pub fn course_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.course_id.as_str())
            .collect()
    }
}

/// Ordered course sequence satisfying prerequisites and covering the goal
/// skill tags at or above the configured proficiency threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPath {
    /// Identifier for logging and replanning.
    pub plan_id: Uuid,
    /// Courses in prerequisite-respecting order.
    pub courses: Vec<String>,
    /// Total duration of the sequence, in minutes.
    pub total_duration_minutes: f32,
    /// Projected post-path proficiency per goal tag, clamped to 1.0.
    pub projected: IndexMap<String, f32>,
}

impl LearningPath {
    /// Creates a path.
    #[must_use]
    pub fn new(
        courses: Vec<String>,
        total_duration_minutes: f32,
        projected: IndexMap<String, f32>,
    ) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            courses,
            total_duration_minutes,
            projected,
        }
    }

    /// Number of courses on the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    /// True when the goals were already satisfied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(course_id: &str, confidence: f32) -> RecommendationEntry {
        RecommendationEntry {
            course_id: course_id.into(),
            confidence,
            rationale: RationaleTag::Personalized,
        }
    }

    #[test]
    fn ranked_sorts_descending_with_id_tie_break() {
        let result = RecommendationResult::ranked(
            vec![entry("c", 0.5), entry("a", 0.9), entry("b", 0.9)],
            10,
        );
        assert_eq!(result.course_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn ranked_deduplicates_and_truncates() {
        let result = RecommendationResult::ranked(
            vec![entry("a", 0.3), entry("a", 0.8), entry("b", 0.6), entry("c", 0.1)],
            2,
        );
        assert_eq!(result.course_ids(), vec!["a", "b"]);
    }

    #[test]
    fn ranked_clamps_confidence() {
        let result = RecommendationResult::ranked(vec![entry("a", 1.7), entry("b", f32::NAN)], 5);
        assert!((result.entries[0].confidence - 1.0).abs() < f32::EPSILON);
        assert!((result.entries[1].confidence - 0.0).abs() < f32::EPSILON);
    }
}
