//! Feature extraction turning learner and course records into fixed-dimension
//! numeric vectors. Extraction is pure and deterministic; malformed inputs are
//! rejected rather than defaulted.

/// Pure feature helper functions.
pub mod func;

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use ndarray::Array1;

use compass_domain::{CourseCatalog, CourseNode, EngineError, LearnerProfile};

/// Dimension of the pair-feature vector fed to the scoring model.
pub const PAIR_FEATURE_DIM: usize = 6;

/// Ordered skill-tag vocabulary derived from one catalog version.
#[derive(Debug, Clone)]
pub struct SkillSpace {
    catalog_version: u64,
    tags: IndexSet<String>,
}

impl SkillSpace {
    /// Builds the vocabulary from every taught tag in the catalog.
    #[must_use]
    pub fn from_catalog(catalog: &CourseCatalog) -> Self {
        Self {
            catalog_version: catalog.version,
            tags: catalog.skill_tags(),
        }
    }

    /// Catalog version the space was derived from.
    #[must_use]
    pub const fn catalog_version(&self) -> u64 {
        self.catalog_version
    }

    /// Vocabulary size.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.tags.len()
    }

    /// Projects a tag-keyed map onto the vocabulary, in vocabulary order.
    /// Tags outside the vocabulary are dropped; absent tags read as zero.
    #[must_use]
    pub fn project(&self, values: &IndexMap<String, f32>) -> Array1<f32> {
        Array1::from_iter(
            self.tags
                .iter()
                .map(|tag| values.get(tag).copied().unwrap_or(0.0)),
        )
    }
}

/// Pure extractor producing normalized skill vectors and pair features.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    space: Arc<SkillSpace>,
}

impl FeatureExtractor {
    /// Creates an extractor over the given vocabulary.
    #[must_use]
    pub fn new(space: Arc<SkillSpace>) -> Self {
        Self { space }
    }

    /// The vocabulary in use.
    #[must_use]
    pub fn space(&self) -> &SkillSpace {
        &self.space
    }

    /// Extracts unit-sum normalized learner and course vectors.
    ///
    /// Fails with `MalformedRecord` when required fields are absent or out of
    /// range; a learner's profile is never silently defaulted to zero.
    pub fn extract(
        &self,
        learner: &LearnerProfile,
        course: &CourseNode,
    ) -> Result<(Array1<f32>, Array1<f32>), EngineError> {
        learner.validate()?;
        course.validate()?;
        let learner_vec = func::unit_sum(self.space.project(&learner.skills));
        let course_vec = func::unit_sum(self.space.project(&course.taught));
        Ok((learner_vec, course_vec))
    }

    /// Derives the fixed-dimension pair features the scoring model consumes.
    /// Every component is bounded to `[0, 1]`.
    #[must_use]
    pub fn pair_features(
        &self,
        learner: &LearnerProfile,
        course: &CourseNode,
        learner_vec: &Array1<f32>,
        course_vec: &Array1<f32>,
    ) -> Array1<f32> {
        Array1::from(vec![
            func::cosine(learner_vec, course_vec),
            func::need_coverage(learner, course),
            func::goal_affinity(learner, course),
            func::difficulty_fit(learner.mean_proficiency(), course.difficulty),
            func::duration_factor(course.duration_minutes),
            func::style_match(learner.learning_style, course.delivery),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::{CourseNode, DifficultyTier, LearningStyle};

    fn space() -> Arc<SkillSpace> {
        let catalog = CourseCatalog::new(1)
            .with_course(
                CourseNode::new("a", 10.0, DifficultyTier::Intro).teaching("python_basics", 0.5),
            )
            .with_course(
                CourseNode::new("b", 15.0, DifficultyTier::Core)
                    .teaching("data_structures", 0.7)
                    .requiring("a"),
            );
        Arc::new(SkillSpace::from_catalog(&catalog))
    }

    #[test]
    fn extraction_is_deterministic_and_normalized() {
        let extractor = FeatureExtractor::new(space());
        let learner = LearnerProfile::new("l-1", LearningStyle::Visual)
            .with_skill("python_basics", 0.2)
            .with_skill("data_structures", 0.6);
        let course = CourseNode::new("b", 15.0, DifficultyTier::Core)
            .teaching("data_structures", 0.7)
            .requiring("a");
        let (lv1, cv1) = extractor.extract(&learner, &course).unwrap();
        let (lv2, cv2) = extractor.extract(&learner, &course).unwrap();
        assert_eq!(lv1, lv2);
        assert_eq!(cv1, cv2);
        assert!((lv1.sum() - 1.0).abs() < 1e-6);
        assert!((cv1.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_skill_vector_is_rejected_not_defaulted() {
        let extractor = FeatureExtractor::new(space());
        let learner = LearnerProfile::new("l-1", LearningStyle::Visual);
        let course =
            CourseNode::new("a", 10.0, DifficultyTier::Intro).teaching("python_basics", 0.5);
        assert!(matches!(
            extractor.extract(&learner, &course),
            Err(EngineError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn pair_features_are_bounded() {
        let extractor = FeatureExtractor::new(space());
        let learner = LearnerProfile::new("l-1", LearningStyle::Kinesthetic)
            .with_skill("python_basics", 0.9)
            .with_goal("data_structures");
        let course = CourseNode::new("b", 600.0, DifficultyTier::Advanced)
            .teaching("data_structures", 0.7);
        let (lv, cv) = extractor.extract(&learner, &course).unwrap();
        let pair = extractor.pair_features(&learner, &course, &lv, &cv);
        assert_eq!(pair.len(), PAIR_FEATURE_DIM);
        for value in &pair {
            assert!(*value >= 0.0 && *value <= 1.0);
        }
    }
}
