/// Recency-weighted average correctness: the newest attempt weighs `1`, each
/// older attempt is discounted by another factor of `decay`. Returns `None`
/// for an empty history.
#[must_use]
pub fn decayed_correctness(scores_oldest_first: &[f32], decay: f32) -> Option<f32> {
    if scores_oldest_first.is_empty() {
        return None;
    }
    let decay = decay.clamp(f32::EPSILON, 1.0 - f32::EPSILON);
    let newest = scores_oldest_first.len() - 1;
    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    for (idx, score) in scores_oldest_first.iter().enumerate() {
        let age = (newest - idx) as i32;
        let weight = decay.powi(age);
        weighted += score.clamp(0.0, 1.0) * weight;
        total += weight;
    }
    Some((weighted / total).clamp(0.0, 1.0))
}

/// Deficiency is the complement of recency-weighted correctness.
#[must_use]
pub fn deficiency(scores_oldest_first: &[f32], decay: f32) -> Option<f32> {
    decayed_correctness(scores_oldest_first, decay).map(|avg| (1.0 - avg).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_no_score() {
        assert!(decayed_correctness(&[], 0.8).is_none());
    }

    #[test]
    fn newest_attempts_dominate() {
        // Same scores, opposite order: a recent failure must weigh more.
        let failing_lately = deficiency(&[1.0, 0.0], 0.5).unwrap();
        let improving = deficiency(&[0.0, 1.0], 0.5).unwrap();
        assert!(failing_lately > improving);
    }

    #[test]
    fn known_scenario_value() {
        // Attempts [0.2, 0.3, 0.1] at decay 0.8:
        // (0.2*0.64 + 0.3*0.8 + 0.1*1.0) / (0.64 + 0.8 + 1.0) ~= 0.1918
        let value = deficiency(&[0.2, 0.3, 0.1], 0.8).unwrap();
        assert!((value - 0.808).abs() < 0.01);
    }

    #[test]
    fn deficiency_is_monotone_under_appended_failures() {
        let mut scores = vec![0.6, 0.4];
        let mut last = deficiency(&scores, 0.8).unwrap();
        for _ in 0..5 {
            scores.push(0.0);
            let next = deficiency(&scores, 0.8).unwrap();
            assert!(next >= last);
            last = next;
        }
    }
}
