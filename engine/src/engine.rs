use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexSet;
use parking_lot::RwLock;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use compass_domain::{
    CourseCatalog, CourseCatalogStore, EngineConfig, EngineError, FeedbackEvent, LearnerStore,
    LearningPath, ProgressStore, RationaleTag, RecommendationEntry, RecommendationResult,
};
use compass_feedback::{FeedbackIngestor, FeedbackJournal, IngestAck};
use compass_pathing::{PathOptimizer, PathingTelemetry};
use compass_recommender::{
    FeatureExtractor, RecommendationModel, RecommenderTelemetry, SkillSpace, WeaknessAnalyzer,
    WeaknessBoard,
};
use shared_logging::LogLevel;

use crate::cache::FeatureCache;
use crate::telemetry::EngineTelemetry;

/// Builder used to configure a [`RecommendationEngine`].
pub struct EngineBuilder {
    config: EngineConfig,
    learners: Arc<dyn LearnerStore>,
    progress: Arc<dyn ProgressStore>,
    catalogs: Arc<dyn CourseCatalogStore>,
    journal: Option<Arc<FeedbackJournal>>,
    telemetry: Option<EngineTelemetry>,
    recommender_telemetry: Option<RecommenderTelemetry>,
    pathing_telemetry: Option<PathingTelemetry>,
}

impl EngineBuilder {
    /// Overrides the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a durable feedback journal.
    #[must_use]
    pub fn journal(mut self, journal: Arc<FeedbackJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Attaches request-level telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: EngineTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Attaches telemetry for the feedback/model components.
    #[must_use]
    pub fn recommender_telemetry(mut self, telemetry: RecommenderTelemetry) -> Self {
        self.recommender_telemetry = Some(telemetry);
        self
    }

    /// Attaches telemetry for the path optimizer.
    #[must_use]
    pub fn pathing_telemetry(mut self, telemetry: PathingTelemetry) -> Self {
        self.pathing_telemetry = Some(telemetry);
        self
    }

    /// Finalizes the builder returning a [`RecommendationEngine`].
    #[must_use]
    pub fn build(self) -> RecommendationEngine {
        let model = Arc::new(RecommendationModel::new(self.config.model));
        let analyzer = Arc::new(WeaknessAnalyzer::new(self.config.weakness));
        let board = WeaknessBoard::new();

        let mut ingestor = FeedbackIngestor::builder(
            Arc::clone(&self.learners),
            Arc::clone(&self.progress),
            Arc::clone(&self.catalogs),
            Arc::clone(&model),
        )
        .config(self.config.clone())
        .analyzer(Arc::clone(&analyzer))
        .board(board.clone());
        if let Some(journal) = self.journal {
            ingestor = ingestor.journal(journal);
        }
        if let Some(telemetry) = self.recommender_telemetry {
            ingestor = ingestor.telemetry(telemetry);
        }

        RecommendationEngine {
            cache: FeatureCache::new(Duration::from_secs(self.config.feature_cache_ttl_secs)),
            optimizer: PathOptimizer::new(self.config.path),
            learners: self.learners,
            progress: self.progress,
            catalogs: self.catalogs,
            model,
            analyzer,
            board,
            ingestor: Arc::new(ingestor.build()),
            space: RwLock::new(None),
            telemetry: self.telemetry,
            pathing_telemetry: self.pathing_telemetry,
        }
    }
}

/// Facade composing feature extraction, scoring, weakness analysis, path
/// optimization, and feedback ingestion into the three request-level
/// operations exposed to the surrounding service layer.
pub struct RecommendationEngine {
    learners: Arc<dyn LearnerStore>,
    progress: Arc<dyn ProgressStore>,
    catalogs: Arc<dyn CourseCatalogStore>,
    model: Arc<RecommendationModel>,
    analyzer: Arc<WeaknessAnalyzer>,
    board: WeaknessBoard,
    optimizer: PathOptimizer,
    ingestor: Arc<FeedbackIngestor>,
    cache: FeatureCache,
    space: RwLock<Option<Arc<SkillSpace>>>,
    telemetry: Option<EngineTelemetry>,
    pathing_telemetry: Option<PathingTelemetry>,
}

impl RecommendationEngine {
    /// Creates a builder over the collaborator seams.
    #[must_use]
    pub fn builder(
        learners: Arc<dyn LearnerStore>,
        progress: Arc<dyn ProgressStore>,
        catalogs: Arc<dyn CourseCatalogStore>,
    ) -> EngineBuilder {
        EngineBuilder {
            config: EngineConfig::default(),
            learners,
            progress,
            catalogs,
            journal: None,
            telemetry: None,
            recommender_telemetry: None,
            pathing_telemetry: None,
        }
    }

    /// The ingestor, for wiring an upstream event-source pump.
    #[must_use]
    pub fn ingestor(&self) -> Arc<FeedbackIngestor> {
        Arc::clone(&self.ingestor)
    }

    /// The board holding the latest weakness profile per learner.
    #[must_use]
    pub fn board(&self) -> WeaknessBoard {
        self.board.clone()
    }

    /// Number of live feature-cache entries.
    #[must_use]
    pub fn cached_features(&self) -> usize {
        self.cache.len()
    }

    /// Ranks catalog courses for the learner, strongest first, at most `k`.
    ///
    /// The whole call scores against one model snapshot. Learners below the
    /// cold-start cutoff are scored by the population prior and tagged so the
    /// caller can tell the difference from personalized output.
    pub async fn recommend(
        &self,
        learner_id: &str,
        k: usize,
    ) -> Result<RecommendationResult, EngineError> {
        let request = Uuid::new_v4().to_string();
        let profile = self.learners.profile(learner_id).await?;
        profile.validate()?;
        let catalog = self.catalogs.graph().await?;
        let extractor = self.extractor_for(&catalog);
        let snapshot = self.model.snapshot();
        self.model.ensure_fresh(&snapshot)?;

        let completed: IndexSet<String> = self
            .progress
            .learner_history(learner_id)
            .await?
            .into_iter()
            .filter(compass_domain::ProgressRecord::is_completed)
            .map(|record| record.course_id)
            .collect();
        let weakness = self.board.get(learner_id);
        let cold = self.model.is_cold(profile.interactions);

        let mut entries = Vec::new();
        for course in catalog.courses.values() {
            if completed.contains(&course.course_id) {
                continue;
            }
            let features = match self.cache.get(learner_id, &course.course_id, catalog.version) {
                Some(features) => features,
                None => {
                    let (learner_vec, course_vec) = extractor.extract(&profile, course)?;
                    let features =
                        extractor.pair_features(&profile, course, &learner_vec, &course_vec);
                    self.cache.insert(
                        learner_id,
                        &course.course_id,
                        catalog.version,
                        features.clone(),
                    );
                    features
                }
            };
            let (confidence, rationale) = if cold {
                (
                    self.model.prior().score(course, &profile, self.model.config()),
                    RationaleTag::ColdStart,
                )
            } else {
                let remediates = weakness
                    .as_ref()
                    .is_some_and(|profile| course.taught.keys().any(|tag| profile.is_weak(tag)));
                (
                    snapshot.predict(&features),
                    if remediates {
                        RationaleTag::Remediation
                    } else {
                        RationaleTag::Personalized
                    },
                )
            };
            entries.push(RecommendationEntry {
                course_id: course.course_id.clone(),
                confidence,
                rationale,
            });
        }

        let result = RecommendationResult::ranked(entries, k);
        self.log(
            LogLevel::Info,
            "recommend.complete",
            &request,
            json!({
                "learner_id": learner_id,
                "cold_start": cold,
                "model_version": snapshot.version,
                "results": result.len()
            }),
        );
        self.emit(
            "recommend.served",
            json!({ "learner_id": learner_id, "results": result.len() }),
        );
        Ok(result)
    }

    /// Plans a prerequisite-respecting course sequence covering the goals.
    pub async fn plan_path(
        &self,
        learner_id: &str,
        goals: &IndexSet<String>,
    ) -> Result<LearningPath, EngineError> {
        self.plan_path_with(learner_id, goals, &CancellationToken::new())
            .await
    }

    /// Plans a path under a caller-supplied cancellation token; an observed
    /// cancellation aborts between topological steps with `Cancelled`.
    pub async fn plan_path_with(
        &self,
        learner_id: &str,
        goals: &IndexSet<String>,
        cancel: &CancellationToken,
    ) -> Result<LearningPath, EngineError> {
        let request = Uuid::new_v4().to_string();
        if goals.is_empty() {
            return Err(EngineError::malformed(
                "path planning requires a non-empty goal set",
            ));
        }
        let profile = self.learners.profile(learner_id).await?;
        profile.validate()?;
        let catalog = self.catalogs.graph().await?;
        let weakness = match self.board.get(learner_id) {
            Some(profile) => profile,
            None => {
                let history = self.progress.learner_history(learner_id).await?;
                self.analyzer.analyze(learner_id, &history)
            }
        };

        let path = self.optimizer.plan_with_telemetry(
            &profile,
            goals,
            &catalog,
            &weakness,
            cancel,
            self.pathing_telemetry.as_ref(),
        )?;
        self.log(
            LogLevel::Info,
            "plan_path.complete",
            &request,
            json!({
                "learner_id": learner_id,
                "plan_id": path.plan_id,
                "courses": path.len(),
                "total_duration_minutes": path.total_duration_minutes
            }),
        );
        self.emit(
            "plan_path.served",
            json!({ "learner_id": learner_id, "courses": path.len() }),
        );
        Ok(path)
    }

    /// Feeds one upstream feedback event into the engine.
    pub async fn ingest_feedback(&self, event: FeedbackEvent) -> Result<IngestAck, EngineError> {
        self.ingestor.ingest(event).await
    }

    /// Drains the feedback update lanes.
    pub async fn shutdown(&self) {
        self.ingestor.shutdown().await;
    }

    fn extractor_for(&self, catalog: &CourseCatalog) -> FeatureExtractor {
        if let Some(space) = self.space.read().as_ref() {
            if space.catalog_version() == catalog.version {
                return FeatureExtractor::new(Arc::clone(space));
            }
        }
        let space = Arc::new(SkillSpace::from_catalog(catalog));
        *self.space.write() = Some(Arc::clone(&space));
        FeatureExtractor::new(space)
    }

    fn log(&self, level: LogLevel, message: &str, correlation: &str, fields: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, correlation, fields);
        }
    }

    fn emit(&self, event_type: &str, payload: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.event(event_type, payload);
        }
    }
}
