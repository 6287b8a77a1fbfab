use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use compass_domain::WeaknessProfile;

/// Registry holding the latest recomputed weakness profile per learner.
/// Published by the feedback lanes, read by the facade and the optimizer.
#[derive(Debug, Clone, Default)]
pub struct WeaknessBoard {
    inner: Arc<RwLock<IndexMap<String, WeaknessProfile>>>,
}

impl WeaknessBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes (replaces) a learner's profile.
    pub fn publish(&self, profile: WeaknessProfile) {
        self.inner
            .write()
            .insert(profile.learner_id.clone(), profile);
    }

    /// Latest profile for a learner, if one was computed.
    #[must_use]
    pub fn get(&self, learner_id: &str) -> Option<WeaknessProfile> {
        self.inner.read().get(learner_id).cloned()
    }

    /// Number of learners with a published profile.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True when no profile was published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_replaces_previous_profile() {
        let board = WeaknessBoard::new();
        board.publish(WeaknessProfile::empty("l-1"));
        let mut updated = WeaknessProfile::empty("l-1");
        updated.deficiencies.insert("loops".into(), 0.9);
        board.publish(updated);
        assert_eq!(board.len(), 1);
        assert!(board.get("l-1").unwrap().deficiency("loops") > 0.8);
        assert!(board.get("ghost").is_none());
    }
}
