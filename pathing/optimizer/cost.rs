use compass_domain::{CourseNode, WeaknessProfile};

/// How strongly a course remediates flagged weak skills: the sum of its
/// gains on weak tags, each weighted by the tag's deficiency.
#[must_use]
pub fn remediation_overlap(course: &CourseNode, weakness: &WeaknessProfile) -> f32 {
    course
        .taught
        .iter()
        .filter(|(tag, _)| weakness.is_weak(tag))
        .map(|(tag, gain)| gain.min(1.0) * weakness.deficiency(tag))
        .sum()
}

/// Search cost of taking a course: its duration, discounted in proportion to
/// how much it closes deficiency gaps so remediating courses are preferred.
#[must_use]
pub fn effective_cost(duration_minutes: f32, overlap: f32, remediation_weight: f32) -> f32 {
    let discounted = duration_minutes / (1.0 + remediation_weight.max(0.0) * overlap.max(0.0));
    discounted.max(f32::EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::{DifficultyTier, WeaknessProfile};

    #[test]
    fn remediating_courses_cost_less() {
        let mut weakness = WeaknessProfile::empty("l-1");
        weakness.deficiencies.insert("loops".into(), 0.9);
        weakness.weak_tags.insert("loops".into());

        let remedial =
            CourseNode::new("r", 30.0, DifficultyTier::Intro).teaching("loops", 0.6);
        let unrelated =
            CourseNode::new("u", 30.0, DifficultyTier::Intro).teaching("graphs", 0.6);

        let remedial_cost = effective_cost(30.0, remediation_overlap(&remedial, &weakness), 1.5);
        let unrelated_cost = effective_cost(30.0, remediation_overlap(&unrelated, &weakness), 1.5);
        assert!(remedial_cost < unrelated_cost);
    }

    #[test]
    fn cost_stays_positive() {
        assert!(effective_cost(1.0, 100.0, 100.0) > 0.0);
    }
}
