use serde::{Deserialize, Serialize};

/// Tuning for the weakness analyzer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaknessConfig {
    /// Per-attempt recency decay in (0, 1); newer attempts weigh more.
    pub decay: f32,
    /// Deficiency above this value flags a skill as weak.
    pub cutoff: f32,
    /// Minimum attempts before a tag may be flagged (avoids under-sampled flags).
    pub min_attempts: usize,
}

impl Default for WeaknessConfig {
    fn default() -> Self {
        Self {
            decay: 0.8,
            cutoff: 0.6,
            min_attempts: 3,
        }
    }
}

/// Tuning for the online recommendation model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Initial learning rate for online updates.
    pub base_learning_rate: f32,
    /// Per-update learning-rate decay; bounds drift from any one event.
    pub learning_rate_decay: f32,
    /// Absolute bound applied to every parameter after an update.
    pub parameter_bound: f32,
    /// How many versions behind a held snapshot may trail before refetch is forced.
    pub snapshot_retention: u64,
    /// Learners with fewer interactions are scored by the population prior.
    pub cold_start_interactions: u64,
    /// Weight of the popularity component in the cold-start prior.
    pub prior_popularity_weight: f32,
    /// Weight of the rating component in the cold-start prior.
    pub prior_rating_weight: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_learning_rate: 0.1,
            learning_rate_decay: 0.01,
            parameter_bound: 8.0,
            snapshot_retention: 32,
            cold_start_interactions: 5,
            prior_popularity_weight: 0.5,
            prior_rating_weight: 0.3,
        }
    }
}

/// Tuning for the path optimizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PathConfig {
    /// Proficiency at which a goal skill counts as satisfied.
    pub goal_proficiency: f32,
    /// Strength of the cost discount for courses remediating weak skills.
    pub remediation_weight: f32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            goal_proficiency: 0.6,
            remediation_weight: 1.5,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Weakness analyzer tuning.
    pub weakness: WeaknessConfig,
    /// Recommendation model tuning.
    pub model: ModelConfig,
    /// Path optimizer tuning.
    pub path: PathConfig,
    /// Capacity of each per-learner weakness recomputation lane.
    pub lane_capacity: usize,
    /// Capacity of the global model-update stream.
    pub update_stream_capacity: usize,
    /// Feature cache time-to-live in seconds.
    pub feature_cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weakness: WeaknessConfig::default(),
            model: ModelConfig::default(),
            path: PathConfig::default(),
            lane_capacity: 64,
            update_stream_capacity: 256,
            feature_cache_ttl_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_stay_in_contract_ranges() {
        let config = EngineConfig::default();
        assert!(config.weakness.decay > 0.0 && config.weakness.decay < 1.0);
        assert!(config.path.goal_proficiency > 0.0 && config.path.goal_proficiency <= 1.0);
        assert!(config.lane_capacity > 0);
    }
}
