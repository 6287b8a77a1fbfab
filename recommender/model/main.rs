//! Online recommendation scoring model. Parameters live in immutable
//! versioned snapshots swapped atomically; readers score against one
//! consistent snapshot start-to-finish while the single update stream
//! builds the next version (copy-on-write).

/// Population-level cold-start prior.
pub mod prior;
/// Immutable parameter snapshots.
pub mod snapshot;

use std::sync::Arc;

use ndarray::Array1;
use parking_lot::RwLock;

use compass_domain::{EngineError, ModelConfig};

use crate::features::PAIR_FEATURE_DIM;
use prior::PopularityPrior;
use snapshot::ModelSnapshot;

/// Scoring model with snapshot-swap reads and serialized online updates.
#[derive(Debug)]
pub struct RecommendationModel {
    current: RwLock<Arc<ModelSnapshot>>,
    config: ModelConfig,
    prior: PopularityPrior,
}

impl RecommendationModel {
    /// Creates a model with a freshly seeded snapshot.
    #[must_use]
    pub fn new(config: ModelConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(ModelSnapshot::seeded(PAIR_FEATURE_DIM))),
            config,
            prior: PopularityPrior::new(),
        }
    }

    /// Hands out the current snapshot. The `Arc` stays internally consistent
    /// no matter how many updates land while the caller scores with it.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Rejects snapshots older than the configured retention window, forcing
    /// the caller to refetch instead of accumulating stale versions.
    pub fn ensure_fresh(&self, held: &ModelSnapshot) -> Result<(), EngineError> {
        let current = self.current.read().version;
        if current.saturating_sub(held.version) > self.config.snapshot_retention {
            return Err(EngineError::StaleSnapshot {
                held: held.version,
                current,
                retention: self.config.snapshot_retention,
            });
        }
        Ok(())
    }

    /// True when the learner has too little history for personalized scoring.
    #[must_use]
    pub const fn is_cold(&self, interactions: u64) -> bool {
        interactions < self.config.cold_start_interactions
    }

    /// The cold-start prior.
    #[must_use]
    pub const fn prior(&self) -> &PopularityPrior {
        &self.prior
    }

    /// Model configuration.
    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Applies one logistic-gradient step toward the observed outcome and
    /// publishes the next snapshot version. The learning rate decays with the
    /// update count, bounding drift from any one event; every parameter is
    /// clamped after the step. Returns the new version.
    ///
    /// Must only be called from the single feedback update stream.
    pub fn apply_feedback(&self, features: &Array1<f32>, observed: f32) -> u64 {
        let current = self.snapshot();
        let observed = observed.clamp(0.0, 1.0);
        let rate = self.config.base_learning_rate
            / (1.0 + self.config.learning_rate_decay * current.updates_applied as f32);
        let error = current.predict(features) - observed;

        let bound = self.config.parameter_bound;
        let mut weights = current.weights.clone();
        for (weight, feature) in weights.iter_mut().zip(features.iter()) {
            let stepped = *weight - rate * error * feature;
            if stepped.is_finite() {
                *weight = stepped.clamp(-bound, bound);
            }
        }
        let stepped_bias = current.bias - rate * error;
        let bias = if stepped_bias.is_finite() {
            stepped_bias.clamp(-bound, bound)
        } else {
            current.bias
        };

        let next = Arc::new(ModelSnapshot {
            version: current.version + 1,
            weights,
            bias,
            updates_applied: current.updates_applied + 1,
            created_at: chrono::Utc::now(),
        });
        let version = next.version;
        *self.current.write() = next;
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(value: f32) -> Array1<f32> {
        Array1::from(vec![value; PAIR_FEATURE_DIM])
    }

    #[test]
    fn updates_publish_new_versions_without_touching_held_snapshots() {
        let model = RecommendationModel::new(ModelConfig::default());
        let held = model.snapshot();
        let held_weights = held.weights.clone();
        let version = model.apply_feedback(&features(0.8), 1.0);
        assert_eq!(version, held.version + 1);
        assert_eq!(held.weights, held_weights);
        assert_eq!(model.snapshot().version, version);
    }

    #[test]
    fn stale_snapshot_is_rejected_after_retention_window() {
        let config = ModelConfig {
            snapshot_retention: 2,
            ..ModelConfig::default()
        };
        let model = RecommendationModel::new(config);
        let held = model.snapshot();
        for _ in 0..4 {
            model.apply_feedback(&features(0.5), 1.0);
        }
        assert!(matches!(
            model.ensure_fresh(&held),
            Err(EngineError::StaleSnapshot { .. })
        ));
        assert!(model.ensure_fresh(&model.snapshot()).is_ok());
    }

    #[test]
    fn updates_move_predictions_toward_observed_outcomes() {
        let model = RecommendationModel::new(ModelConfig::default());
        let x = features(0.9);
        let before = model.snapshot().predict(&x);
        for _ in 0..50 {
            model.apply_feedback(&x, 1.0);
        }
        let after = model.snapshot().predict(&x);
        assert!(after > before);
    }

    #[test]
    fn parameters_stay_bounded_under_adversarial_updates() {
        let config = ModelConfig {
            parameter_bound: 2.0,
            base_learning_rate: 10.0,
            ..ModelConfig::default()
        };
        let model = RecommendationModel::new(config);
        for _ in 0..100 {
            model.apply_feedback(&features(1.0), 1.0);
        }
        let snapshot = model.snapshot();
        for weight in &snapshot.weights {
            assert!(weight.abs() <= 2.0);
        }
        assert!(snapshot.bias.abs() <= 2.0);
        assert!(!snapshot.predict(&features(1.0)).is_nan());
    }

    #[test]
    fn cold_start_threshold_comes_from_config() {
        let model = RecommendationModel::new(ModelConfig {
            cold_start_interactions: 5,
            ..ModelConfig::default()
        });
        assert!(model.is_cold(4));
        assert!(!model.is_cold(5));
    }
}
