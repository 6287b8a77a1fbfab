use ndarray::Array1;

use compass_domain::{CourseNode, DeliveryMode, DifficultyTier, LearnerProfile, LearningStyle};

/// Normalizes a vector to unit sum. A zero vector is returned unchanged:
/// a learner whose skills all fall outside the vocabulary is legitimately
/// untrained there, which is different from a malformed profile.
#[must_use]
pub fn unit_sum(vector: Array1<f32>) -> Array1<f32> {
    let sum = vector.sum();
    if sum > 0.0 {
        vector / sum
    } else {
        vector
    }
}

/// Cosine similarity between two vectors; zero when either has no magnitude.
#[must_use]
pub fn cosine(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let norm_a = a.dot(a).sqrt();
    let norm_b = b.dot(b).sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    (a.dot(b) / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Gain-weighted share of the course's taught skills the learner still lacks.
#[must_use]
pub fn need_coverage(learner: &LearnerProfile, course: &CourseNode) -> f32 {
    let total: f32 = course.taught.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let needed: f32 = course
        .taught
        .iter()
        .map(|(tag, gain)| gain * (1.0 - learner.proficiency(tag)))
        .sum();
    (needed / total).clamp(0.0, 1.0)
}

/// Gain-weighted share of the course's taught skills that are stated goals.
#[must_use]
pub fn goal_affinity(learner: &LearnerProfile, course: &CourseNode) -> f32 {
    let total: f32 = course.taught.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let on_goal: f32 = course
        .taught
        .iter()
        .filter(|(tag, _)| learner.goals.contains(*tag))
        .map(|(_, gain)| gain)
        .sum();
    (on_goal / total).clamp(0.0, 1.0)
}

/// How well the course difficulty matches the learner's mean proficiency.
#[must_use]
pub fn difficulty_fit(mean_proficiency: f32, difficulty: DifficultyTier) -> f32 {
    (1.0 - (difficulty.as_level() - mean_proficiency).abs()).clamp(0.0, 1.0)
}

/// Shorter courses score higher; saturates at eight hours.
#[must_use]
pub fn duration_factor(duration_minutes: f32) -> f32 {
    (1.0 - duration_minutes / 480.0).clamp(0.0, 1.0)
}

/// Affinity between a learner's reported style and the course delivery mode.
#[must_use]
pub fn style_match(style: LearningStyle, delivery: DeliveryMode) -> f32 {
    match (style, delivery) {
        (_, DeliveryMode::Mixed) => 0.7,
        (LearningStyle::Visual, DeliveryMode::Video)
        | (LearningStyle::ReadingWriting, DeliveryMode::Reading)
        | (LearningStyle::Kinesthetic, DeliveryMode::Interactive) => 1.0,
        (LearningStyle::Auditory, DeliveryMode::Video) => 0.8,
        (LearningStyle::Visual, DeliveryMode::Interactive)
        | (LearningStyle::Kinesthetic, DeliveryMode::Video) => 0.6,
        (LearningStyle::Auditory, DeliveryMode::Interactive) => 0.5,
        _ => 0.4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::{CourseNode, DifficultyTier};

    #[test]
    fn unit_sum_normalizes_and_keeps_zero_vectors() {
        let normalized = unit_sum(Array1::from(vec![1.0, 3.0]));
        assert!((normalized.sum() - 1.0).abs() < 1e-6);
        let zero = unit_sum(Array1::from(vec![0.0, 0.0]));
        assert!((zero.sum() - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn need_coverage_reflects_skill_gaps() {
        let course = CourseNode::new("c", 10.0, DifficultyTier::Intro).teaching("loops", 0.5);
        let novice = LearnerProfile::new("l-1", LearningStyle::Visual).with_skill("loops", 0.0);
        let expert = LearnerProfile::new("l-2", LearningStyle::Visual).with_skill("loops", 1.0);
        assert!(need_coverage(&novice, &course) > need_coverage(&expert, &course));
        assert!((need_coverage(&expert, &course) - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn goal_affinity_favors_goal_courses() {
        let course = CourseNode::new("c", 10.0, DifficultyTier::Intro)
            .teaching("loops", 0.5)
            .teaching("recursion", 0.5);
        let learner = LearnerProfile::new("l-1", LearningStyle::Visual)
            .with_skill("loops", 0.1)
            .with_goal("loops");
        assert!((goal_affinity(&learner, &course) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn difficulty_fit_peaks_at_matching_level() {
        let fit_close = difficulty_fit(0.55, DifficultyTier::Core);
        let fit_far = difficulty_fit(0.05, DifficultyTier::Advanced);
        assert!(fit_close > fit_far);
    }

    #[test]
    fn style_match_is_bounded_and_prefers_exact_pairs() {
        let exact = style_match(LearningStyle::Visual, DeliveryMode::Video);
        let poor = style_match(LearningStyle::ReadingWriting, DeliveryMode::Video);
        assert!(exact > poor);
        assert!((0.0..=1.0).contains(&poor));
    }
}
