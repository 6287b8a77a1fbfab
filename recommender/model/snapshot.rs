use chrono::{DateTime, Utc};
use ndarray::Array1;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Immutable point-in-time copy of the scoring parameters. Snapshots are
/// never mutated; updates publish a successor with a higher version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Monotonically increasing snapshot version.
    pub version: u64,
    /// Logistic weights over the pair features.
    pub weights: Array1<f32>,
    /// Bias term.
    pub bias: f32,
    /// Number of feedback updates folded in so far.
    pub updates_applied: u64,
    /// When the snapshot was published.
    pub created_at: DateTime<Utc>,
}

impl ModelSnapshot {
    /// Creates the initial snapshot with small random weights.
    #[must_use]
    pub fn seeded(feature_dim: usize) -> Self {
        let mut rng = SmallRng::from_entropy();
        Self {
            version: 1,
            weights: (0..feature_dim)
                .map(|_| rng.gen_range(-0.05..0.05))
                .collect(),
            bias: rng.gen_range(-0.05..0.05),
            updates_applied: 0,
            created_at: Utc::now(),
        }
    }

    /// Scores one pair-feature vector as a probability in `[0, 1]`.
    /// Never NaN: a degenerate accumulation falls back to indifference.
    #[must_use]
    pub fn predict(&self, features: &Array1<f32>) -> f32 {
        let z = self.weights.dot(features) + self.bias;
        if !z.is_finite() {
            return 0.5;
        }
        sigmoid(z).clamp(0.0, 1.0)
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}
