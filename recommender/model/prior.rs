use indexmap::IndexMap;
use parking_lot::RwLock;

use compass_domain::{CourseNode, LearnerProfile, ModelConfig};

use crate::features::func::difficulty_fit;

#[derive(Debug, Clone, Copy, Default)]
struct CourseStats {
    completions: u64,
    rating_sum: u64,
    ratings: u64,
}

/// Population-level aggregates used to score cold-start learners.
#[derive(Debug, Default)]
pub struct PopularityPrior {
    stats: RwLock<IndexMap<String, CourseStats>>,
}

impl PopularityPrior {
    /// Creates an empty prior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in one course completion.
    pub fn record_completion(&self, course_id: &str) {
        let mut stats = self.stats.write();
        stats.entry(course_id.to_string()).or_default().completions += 1;
    }

    /// Folds in one explicit rating (1..=5 stars).
    pub fn record_rating(&self, course_id: &str, stars: u8) {
        let mut stats = self.stats.write();
        let entry = stats.entry(course_id.to_string()).or_default();
        entry.rating_sum += u64::from(stars.min(5));
        entry.ratings += 1;
    }

    /// Cold-start score for a course: popularity, smoothed mean rating, and
    /// difficulty fit against the learner's current level, clamped to `[0, 1]`.
    #[must_use]
    pub fn score(&self, course: &CourseNode, learner: &LearnerProfile, config: &ModelConfig) -> f32 {
        let stats = self.stats.read();
        let max_completions = stats
            .values()
            .map(|entry| entry.completions)
            .max()
            .unwrap_or(0)
            .max(1);
        let entry = stats.get(&course.course_id).copied().unwrap_or_default();
        let popularity = entry.completions as f32 / max_completions as f32;
        // Laplace-smoothed toward a neutral 3-star rating.
        let rating = (entry.rating_sum as f32 + 3.0) / ((entry.ratings as f32 + 1.0) * 5.0);
        let fit = difficulty_fit(learner.mean_proficiency(), course.difficulty);
        let fit_weight =
            (1.0 - config.prior_popularity_weight - config.prior_rating_weight).max(0.0);
        (config.prior_popularity_weight * popularity
            + config.prior_rating_weight * rating
            + fit_weight * fit)
            .clamp(0.0, 1.0)
    }
}
