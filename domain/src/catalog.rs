use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Coarse difficulty tier of a course.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DifficultyTier {
    /// Introductory material.
    Intro,
    /// Core curriculum.
    Core,
    /// Advanced material.
    Advanced,
}

impl DifficultyTier {
    /// Difficulty expressed on the same `[0, 1]` scale as proficiency.
    #[must_use]
    pub const fn as_level(self) -> f32 {
        match self {
            Self::Intro => 0.25,
            Self::Core => 0.55,
            Self::Advanced => 0.85,
        }
    }
}

/// How the course content is delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Video lectures.
    Video,
    /// Written material.
    Reading,
    /// Hands-on exercises.
    Interactive,
    /// A blend of formats.
    #[default]
    Mixed,
}

/// One course in the catalog, a node of the prerequisite graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseNode {
    /// Unique course identifier.
    pub course_id: String,
    /// Skill gains taught by the course (tag -> gain magnitude).
    pub taught: IndexMap<String, f32>,
    /// Courses that must be completed first.
    pub prerequisites: IndexSet<String>,
    /// Estimated duration in minutes; must be positive.
    pub duration_minutes: f32,
    /// Difficulty tier.
    pub difficulty: DifficultyTier,
    /// Content delivery mode.
    #[serde(default)]
    pub delivery: DeliveryMode,
}

impl CourseNode {
    /// Creates a course with no taught skills or prerequisites.
    #[must_use]
    pub fn new(
        course_id: impl Into<String>,
        duration_minutes: f32,
        difficulty: DifficultyTier,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            taught: IndexMap::new(),
            prerequisites: IndexSet::new(),
            duration_minutes,
            difficulty,
            delivery: DeliveryMode::default(),
        }
    }

    /// Adds a taught skill gain (chainable).
    #[must_use]
    pub fn teaching(mut self, tag: impl Into<String>, gain: f32) -> Self {
        self.taught.insert(tag.into(), gain);
        self
    }

    /// Adds a prerequisite course (chainable).
    #[must_use]
    pub fn requiring(mut self, course_id: impl Into<String>) -> Self {
        self.prerequisites.insert(course_id.into());
        self
    }

    /// Sets the delivery mode (chainable).
    #[must_use]
    pub fn delivered_as(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    /// Gain this course provides toward a tag; absent tags gain nothing.
    #[must_use]
    pub fn gain(&self, tag: &str) -> f32 {
        self.taught.get(tag).copied().unwrap_or(0.0)
    }

    /// Validates required fields.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.course_id.trim().is_empty() {
            return Err(EngineError::malformed("course missing identifier"));
        }
        if self.taught.is_empty() {
            return Err(EngineError::malformed(format!(
                "course '{}' teaches no skills",
                self.course_id
            )));
        }
        if !self.duration_minutes.is_finite() || self.duration_minutes <= 0.0 {
            return Err(EngineError::malformed(format!(
                "course '{}' has non-positive duration",
                self.course_id
            )));
        }
        for (tag, gain) in &self.taught {
            if !gain.is_finite() || *gain <= 0.0 || *gain > 1.0 {
                return Err(EngineError::malformed(format!(
                    "course '{}' gain for '{tag}' is out of range: {gain}",
                    self.course_id
                )));
            }
        }
        Ok(())
    }
}

/// Versioned course collection forming the prerequisite graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseCatalog {
    /// Monotonically increasing catalog version; bumps on every change so
    /// downstream validation and caches can detect staleness.
    pub version: u64,
    /// Courses keyed by identifier.
    pub courses: IndexMap<String, CourseNode>,
}

impl CourseCatalog {
    /// Creates an empty catalog at the given version.
    #[must_use]
    pub fn new(version: u64) -> Self {
        Self {
            version,
            courses: IndexMap::new(),
        }
    }

    /// Inserts or replaces a course (chainable, for seeding).
    #[must_use]
    pub fn with_course(mut self, course: CourseNode) -> Self {
        self.courses.insert(course.course_id.clone(), course);
        self
    }

    /// Looks up a course by identifier.
    #[must_use]
    pub fn get(&self, course_id: &str) -> Option<&CourseNode> {
        self.courses.get(course_id)
    }

    /// Number of courses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    /// True when the catalog holds no courses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Courses teaching the given tag, in catalog order.
    #[must_use]
    pub fn courses_teaching(&self, tag: &str) -> Vec<&CourseNode> {
        self.courses
            .values()
            .filter(|course| course.taught.contains_key(tag))
            .collect()
    }

    /// All distinct skill tags taught anywhere in the catalog, in first-seen order.
    #[must_use]
    pub fn skill_tags(&self) -> IndexSet<String> {
        let mut tags = IndexSet::new();
        for course in self.courses.values() {
            for tag in course.taught.keys() {
                tags.insert(tag.clone());
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indexes_taught_tags() {
        let catalog = CourseCatalog::new(1)
            .with_course(CourseNode::new("a", 10.0, DifficultyTier::Intro).teaching("loops", 0.5))
            .with_course(
                CourseNode::new("b", 15.0, DifficultyTier::Core)
                    .teaching("loops", 0.2)
                    .teaching("recursion", 0.6)
                    .requiring("a"),
            );
        assert_eq!(catalog.courses_teaching("loops").len(), 2);
        assert_eq!(catalog.skill_tags().len(), 2);
        assert!((catalog.get("b").unwrap().gain("recursion") - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn course_without_skills_is_malformed() {
        let course = CourseNode::new("empty", 30.0, DifficultyTier::Core);
        assert!(matches!(
            course.validate(),
            Err(EngineError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn non_positive_duration_is_malformed() {
        let course = CourseNode::new("c", 0.0, DifficultyTier::Intro).teaching("loops", 0.3);
        assert!(matches!(
            course.validate(),
            Err(EngineError::MalformedRecord { .. })
        ));
    }
}
