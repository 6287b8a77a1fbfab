//! Weakness analysis over quiz history. Recomputation is full, deterministic,
//! and idempotent: the same history always yields the same profile.

/// Registry holding the latest profile per learner.
pub mod board;
/// Pure decay-weighting helpers.
pub mod func;

use indexmap::{IndexMap, IndexSet};

use compass_domain::{ProgressRecord, WeaknessConfig, WeaknessProfile};

/// Turns a learner's full progress history into per-skill deficiency scores.
#[derive(Debug, Clone)]
pub struct WeaknessAnalyzer {
    config: WeaknessConfig,
}

impl WeaknessAnalyzer {
    /// Creates an analyzer with the given tuning.
    #[must_use]
    pub const fn new(config: WeaknessConfig) -> Self {
        Self { config }
    }

    /// Analyzer tuning.
    #[must_use]
    pub const fn config(&self) -> &WeaknessConfig {
        &self.config
    }

    /// Recomputes the weakness profile from the full history available now.
    ///
    /// Attempts are re-sorted by timestamp first; the upstream event source
    /// does not guarantee ordering. A tag is flagged weak only when its
    /// deficiency exceeds the cutoff and enough attempts exist.
    #[must_use]
    pub fn analyze(&self, learner_id: &str, history: &[ProgressRecord]) -> WeaknessProfile {
        let mut attempts: Vec<_> = history
            .iter()
            .flat_map(|record| record.attempts.iter())
            .collect();
        attempts.sort_by_key(|attempt| attempt.at);

        let as_of = attempts.last().map(|attempt| attempt.at);
        let mut per_tag: IndexMap<String, Vec<f32>> = IndexMap::new();
        for attempt in attempts {
            per_tag
                .entry(attempt.skill_tag.clone())
                .or_default()
                .push(attempt.score);
        }

        let mut deficiencies = IndexMap::new();
        let mut weak_tags = IndexSet::new();
        for (tag, scores) in per_tag {
            if let Some(value) = func::deficiency(&scores, self.config.decay) {
                if value > self.config.cutoff && scores.len() >= self.config.min_attempts {
                    weak_tags.insert(tag.clone());
                }
                deficiencies.insert(tag, value);
            }
        }

        WeaknessProfile {
            learner_id: learner_id.to_string(),
            deficiencies,
            weak_tags,
            as_of,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use compass_domain::{ProgressRecord, QuizAttempt};

    fn history(scores: &[f32]) -> Vec<ProgressRecord> {
        let start = Utc::now();
        let mut record = ProgressRecord::new("l-1", "c-1");
        for (idx, score) in scores.iter().enumerate() {
            record.append_attempt(QuizAttempt::new(
                "loops",
                *score,
                start + Duration::seconds(idx as i64),
            ));
        }
        vec![record]
    }

    #[test]
    fn flags_weak_skill_in_reference_scenario() {
        let analyzer = WeaknessAnalyzer::new(WeaknessConfig {
            decay: 0.8,
            cutoff: 0.6,
            min_attempts: 2,
        });
        let profile = analyzer.analyze("l-1", &history(&[0.2, 0.3, 0.1]));
        assert!(profile.is_weak("loops"));
        assert!(profile.deficiency("loops") > 0.6);
    }

    #[test]
    fn under_sampled_tags_are_never_flagged() {
        let analyzer = WeaknessAnalyzer::new(WeaknessConfig {
            decay: 0.8,
            cutoff: 0.6,
            min_attempts: 3,
        });
        let profile = analyzer.analyze("l-1", &history(&[0.0, 0.0]));
        assert!(profile.deficiency("loops") > 0.6);
        assert!(!profile.is_weak("loops"));
    }

    #[test]
    fn analysis_is_idempotent() {
        let analyzer = WeaknessAnalyzer::new(WeaknessConfig::default());
        let records = history(&[0.4, 0.9, 0.1, 0.6]);
        let first = analyzer.analyze("l-1", &records);
        let second = analyzer.analyze("l-1", &records);
        assert_eq!(first, second);
    }

    #[test]
    fn attempts_are_reordered_by_timestamp_before_weighting() {
        let analyzer = WeaknessAnalyzer::new(WeaknessConfig::default());
        let start = Utc::now();
        // Delivered newest-first; the old success must not dominate.
        let mut record = ProgressRecord::new("l-1", "c-1");
        record.append_attempt(QuizAttempt::new("loops", 0.0, start + Duration::seconds(10)));
        record.append_attempt(QuizAttempt::new("loops", 1.0, start));
        let profile = analyzer.analyze("l-1", &[record]);
        assert!(profile.deficiency("loops") > 0.5);
    }
}
