use std::time::{Duration, Instant};

use indexmap::IndexMap;
use ndarray::Array1;
use parking_lot::RwLock;

struct CacheEntry {
    features: Array1<f32>,
    cached_at: Instant,
}

/// TTL cache of pair features keyed by (learner, course, catalog version).
///
/// Extraction is pure, so entries carry no write lock: concurrent
/// recomputation on a miss is safe and the last write wins.
pub struct FeatureCache {
    ttl: Duration,
    entries: RwLock<IndexMap<(String, String, u64), CacheEntry>>,
}

impl FeatureCache {
    /// Creates a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Fresh features for the key, if cached.
    #[must_use]
    pub fn get(&self, learner_id: &str, course_id: &str, catalog_version: u64) -> Option<Array1<f32>> {
        let key = (
            learner_id.to_string(),
            course_id.to_string(),
            catalog_version,
        );
        let entries = self.entries.read();
        let entry = entries.get(&key)?;
        (entry.cached_at.elapsed() < self.ttl).then(|| entry.features.clone())
    }

    /// Stores features for the key, evicting expired entries as it goes.
    pub fn insert(
        &self,
        learner_id: &str,
        course_id: &str,
        catalog_version: u64,
        features: Array1<f32>,
    ) {
        let key = (
            learner_id.to_string(),
            course_id.to_string(),
            catalog_version,
        );
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.cached_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                features,
                cached_at: Instant::now(),
            },
        );
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> Array1<f32> {
        Array1::from(vec![0.1, 0.2, 0.3])
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let cache = FeatureCache::new(Duration::from_secs(60));
        cache.insert("l-1", "c-1", 1, features());
        assert!(cache.get("l-1", "c-1", 1).is_some());

        let expired = FeatureCache::new(Duration::ZERO);
        expired.insert("l-1", "c-1", 1, features());
        assert!(expired.get("l-1", "c-1", 1).is_none());
    }

    #[test]
    fn catalog_version_is_part_of_the_key() {
        let cache = FeatureCache::new(Duration::from_secs(60));
        cache.insert("l-1", "c-1", 1, features());
        assert!(cache.get("l-1", "c-1", 2).is_none());
    }

    #[test]
    fn insert_evicts_expired_entries() {
        let cache = FeatureCache::new(Duration::ZERO);
        cache.insert("l-1", "c-1", 1, features());
        cache.insert("l-1", "c-2", 1, features());
        assert_eq!(cache.len(), 1);
    }
}
