//! Prerequisite graph validation with per-version caching.

/// Topological ordering over the catalog.
pub mod validate;

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use compass_domain::{CourseCatalog, EngineError};

/// A validated topological order for one catalog version.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    /// Catalog version the order was computed for.
    pub version: u64,
    /// Course identifiers in topological order (deterministic tie-break).
    pub order: Arc<Vec<String>>,
    /// Position of each course within `order`.
    pub rank: Arc<IndexMap<String, usize>>,
}

impl ValidatedOrder {
    fn compute(catalog: &CourseCatalog) -> Result<Self, EngineError> {
        let order = validate::topological_order(catalog)?;
        let rank = order
            .iter()
            .enumerate()
            .map(|(position, course_id)| (course_id.clone(), position))
            .collect();
        Ok(Self {
            version: catalog.version,
            order: Arc::new(order),
            rank: Arc::new(rank),
        })
    }
}

/// Validates the prerequisite graph once per catalog version and reuses the
/// cached order until the version changes.
#[derive(Debug, Default)]
pub struct GraphValidator {
    cache: RwLock<Option<ValidatedOrder>>,
}

impl GraphValidator {
    /// Creates a validator with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the validated order for the catalog, computing and caching it
    /// when the cached version is missing or stale.
    pub fn order(&self, catalog: &CourseCatalog) -> Result<ValidatedOrder, EngineError> {
        if let Some(cached) = self.cache.read().as_ref() {
            if cached.version == catalog.version {
                return Ok(cached.clone());
            }
        }
        let computed = ValidatedOrder::compute(catalog)?;
        *self.cache.write() = Some(computed.clone());
        Ok(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::{CourseNode, DifficultyTier};

    fn catalog(version: u64) -> CourseCatalog {
        CourseCatalog::new(version)
            .with_course(CourseNode::new("a", 10.0, DifficultyTier::Intro).teaching("x", 0.4))
            .with_course(
                CourseNode::new("b", 10.0, DifficultyTier::Core)
                    .teaching("y", 0.4)
                    .requiring("a"),
            )
    }

    #[test]
    fn order_is_cached_per_version() {
        let validator = GraphValidator::new();
        let first = validator.order(&catalog(1)).unwrap();
        let again = validator.order(&catalog(1)).unwrap();
        assert!(Arc::ptr_eq(&first.order, &again.order));
        let bumped = validator.order(&catalog(2)).unwrap();
        assert_eq!(bumped.version, 2);
        assert!(!Arc::ptr_eq(&first.order, &bumped.order));
    }

    #[test]
    fn rank_matches_order() {
        let validator = GraphValidator::new();
        let validated = validator.order(&catalog(1)).unwrap();
        assert_eq!(validated.rank["a"], 0);
        assert_eq!(validated.rank["b"], 1);
    }
}
