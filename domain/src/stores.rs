use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::catalog::CourseCatalog;
use crate::error::EngineError;
use crate::learner::LearnerProfile;
use crate::progress::{ProgressRecord, QuizAttempt};

/// Read seam for learner profiles plus the single ingestor-owned mutation.
#[async_trait]
pub trait LearnerStore: Send + Sync {
    /// Fetches a learner profile.
    async fn profile(&self, learner_id: &str) -> Result<LearnerProfile, EngineError>;

    /// Increments the learner's interaction count. Invoked only by the
    /// feedback ingestor.
    async fn record_interaction(&self, learner_id: &str) -> Result<(), EngineError>;
}

/// Append-only store of per-(learner, course) progress history.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// History for one (learner, course) pair; an empty record when nothing
    /// was recorded yet.
    async fn history(&self, learner_id: &str, course_id: &str)
        -> Result<ProgressRecord, EngineError>;

    /// Full history for a learner across all courses.
    async fn learner_history(&self, learner_id: &str) -> Result<Vec<ProgressRecord>, EngineError>;

    /// Appends a quiz attempt.
    async fn append_attempt(
        &self,
        learner_id: &str,
        course_id: &str,
        attempt: QuizAttempt,
    ) -> Result<(), EngineError>;

    /// Records a lesson or whole-course completion.
    async fn record_completion(
        &self,
        learner_id: &str,
        course_id: &str,
        lesson: Option<String>,
        time_spent_minutes: f32,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError>;
}

/// Versioned course catalog seam.
#[async_trait]
pub trait CourseCatalogStore: Send + Sync {
    /// Current catalog snapshot. The version inside lets callers reuse cached
    /// validation until the graph changes.
    async fn graph(&self) -> Result<Arc<CourseCatalog>, EngineError>;
}

/// In-memory learner store.
#[derive(Debug, Default)]
pub struct MemoryLearnerStore {
    profiles: RwLock<IndexMap<String, LearnerProfile>>,
}

impl MemoryLearnerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile.
    pub fn upsert(&self, profile: LearnerProfile) {
        self.profiles
            .write()
            .insert(profile.learner_id.clone(), profile);
    }
}

#[async_trait]
impl LearnerStore for MemoryLearnerStore {
    async fn profile(&self, learner_id: &str) -> Result<LearnerProfile, EngineError> {
        self.profiles
            .read()
            .get(learner_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownLearner {
                learner_id: learner_id.to_string(),
            })
    }

    async fn record_interaction(&self, learner_id: &str) -> Result<(), EngineError> {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .get_mut(learner_id)
            .ok_or_else(|| EngineError::UnknownLearner {
                learner_id: learner_id.to_string(),
            })?;
        profile.interactions += 1;
        Ok(())
    }
}

/// In-memory append-only progress store.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: RwLock<IndexMap<(String, String), ProgressRecord>>,
}

impl MemoryProgressStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of attempts recorded across all pairs (test helper).
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.records
            .read()
            .values()
            .map(|record| record.attempts.len())
            .sum()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn history(
        &self,
        learner_id: &str,
        course_id: &str,
    ) -> Result<ProgressRecord, EngineError> {
        let key = (learner_id.to_string(), course_id.to_string());
        Ok(self
            .records
            .read()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ProgressRecord::new(learner_id, course_id)))
    }

    async fn learner_history(&self, learner_id: &str) -> Result<Vec<ProgressRecord>, EngineError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| record.learner_id == learner_id)
            .cloned()
            .collect())
    }

    async fn append_attempt(
        &self,
        learner_id: &str,
        course_id: &str,
        attempt: QuizAttempt,
    ) -> Result<(), EngineError> {
        let key = (learner_id.to_string(), course_id.to_string());
        let mut records = self.records.write();
        records
            .entry(key)
            .or_insert_with(|| ProgressRecord::new(learner_id, course_id))
            .append_attempt(attempt);
        Ok(())
    }

    async fn record_completion(
        &self,
        learner_id: &str,
        course_id: &str,
        lesson: Option<String>,
        time_spent_minutes: f32,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let key = (learner_id.to_string(), course_id.to_string());
        let mut records = self.records.write();
        records
            .entry(key)
            .or_insert_with(|| ProgressRecord::new(learner_id, course_id))
            .record_completion(lesson, time_spent_minutes, at);
        Ok(())
    }
}

/// In-memory catalog store handing out a shared snapshot.
#[derive(Debug)]
pub struct MemoryCatalogStore {
    catalog: RwLock<Arc<CourseCatalog>>,
}

impl MemoryCatalogStore {
    /// Creates a store serving the given catalog.
    #[must_use]
    pub fn new(catalog: CourseCatalog) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Replaces the catalog; callers should bump the catalog version so
    /// cached validation is invalidated.
    pub fn replace(&self, catalog: CourseCatalog) {
        *self.catalog.write() = Arc::new(catalog);
    }
}

#[async_trait]
impl CourseCatalogStore for MemoryCatalogStore {
    async fn graph(&self) -> Result<Arc<CourseCatalog>, EngineError> {
        Ok(Arc::clone(&self.catalog.read()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CourseNode, DifficultyTier};
    use crate::learner::LearningStyle;
    use tokio::runtime::Runtime;

    #[test]
    fn learner_store_round_trips_and_counts_interactions() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemoryLearnerStore::new();
            store.upsert(
                LearnerProfile::new("l-1", LearningStyle::Visual).with_skill("loops", 0.4),
            );
            store.record_interaction("l-1").await.unwrap();
            let profile = store.profile("l-1").await.unwrap();
            assert_eq!(profile.interactions, 1);
            assert!(matches!(
                store.profile("ghost").await,
                Err(EngineError::UnknownLearner { .. })
            ));
        });
    }

    #[test]
    fn progress_store_appends_without_rewriting() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemoryProgressStore::new();
            store
                .append_attempt("l-1", "c-1", QuizAttempt::new("loops", 0.2, Utc::now()))
                .await
                .unwrap();
            store
                .append_attempt("l-1", "c-1", QuizAttempt::new("loops", 0.7, Utc::now()))
                .await
                .unwrap();
            let record = store.history("l-1", "c-1").await.unwrap();
            assert_eq!(record.attempts.len(), 2);
            assert!((record.attempts[0].score - 0.2).abs() < f32::EPSILON);
            assert_eq!(store.attempt_count(), 2);
        });
    }

    #[test]
    fn catalog_store_serves_shared_snapshot() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let catalog = CourseCatalog::new(3).with_course(
                CourseNode::new("a", 10.0, DifficultyTier::Intro).teaching("loops", 0.5),
            );
            let store = MemoryCatalogStore::new(catalog);
            let snapshot = store.graph().await.unwrap();
            assert_eq!(snapshot.version, 3);
            assert_eq!(snapshot.len(), 1);
        });
    }
}
