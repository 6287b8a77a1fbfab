use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use compass_domain::{
    CourseCatalogStore, EngineConfig, EngineError, FeedbackEvent, FeedbackOutcome, LearnerStore,
    ProgressStore, QuizAttempt,
};
use compass_recommender::{
    FeatureExtractor, RecommendationModel, RecommenderTelemetry, SkillSpace, WeaknessAnalyzer,
    WeaknessBoard,
};
use shared_logging::LogLevel;

use crate::journal::FeedbackJournal;

/// Acknowledgement returned to the upstream collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestAck {
    /// The event was applied.
    Accepted,
    /// The event was already applied; redelivery is a no-op, not an error.
    Duplicate,
}

struct Lane {
    sender: mpsc::Sender<FeedbackEvent>,
    handle: JoinHandle<()>,
}

struct UpdateStream {
    sender: mpsc::Sender<FeedbackEvent>,
    handle: JoinHandle<()>,
}

/// Builder used to configure a [`FeedbackIngestor`].
pub struct FeedbackIngestorBuilder {
    config: EngineConfig,
    learners: Arc<dyn LearnerStore>,
    progress: Arc<dyn ProgressStore>,
    catalogs: Arc<dyn CourseCatalogStore>,
    model: Arc<RecommendationModel>,
    analyzer: Option<Arc<WeaknessAnalyzer>>,
    board: Option<WeaknessBoard>,
    journal: Option<Arc<FeedbackJournal>>,
    telemetry: Option<RecommenderTelemetry>,
}

impl FeedbackIngestorBuilder {
    /// Overrides the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the weakness analyzer.
    #[must_use]
    pub fn analyzer(mut self, analyzer: Arc<WeaknessAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Shares a weakness board with the surrounding engine.
    #[must_use]
    pub fn board(mut self, board: WeaknessBoard) -> Self {
        self.board = Some(board);
        self
    }

    /// Attaches a durable journal; its history warm-starts deduplication.
    #[must_use]
    pub fn journal(mut self, journal: Arc<FeedbackJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn telemetry(mut self, telemetry: RecommenderTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Finalizes the builder.
    #[must_use]
    pub fn build(self) -> FeedbackIngestor {
        let seen = self
            .journal
            .as_ref()
            .and_then(|journal| journal.applied_ids().ok())
            .unwrap_or_default();
        let analyzer = self
            .analyzer
            .unwrap_or_else(|| Arc::new(WeaknessAnalyzer::new(self.config.weakness)));
        FeedbackIngestor {
            config: self.config,
            learners: self.learners,
            progress: self.progress,
            catalogs: self.catalogs,
            model: self.model,
            analyzer,
            board: self.board.unwrap_or_default(),
            journal: self.journal,
            telemetry: self.telemetry,
            seen: Mutex::new(seen),
            lanes: Mutex::new(IndexMap::new()),
            updates: Mutex::new(None),
        }
    }
}

/// Consumes feedback events exactly once and drives the asynchronous
/// weakness and model updates.
///
/// Writes are serialized through a single-writer discipline: one bounded
/// lane per learner for weakness recomputation and one global ordered stream
/// for model parameters. Full lanes reject with a retryable `Overloaded`
/// instead of growing unbounded or dropping data.
pub struct FeedbackIngestor {
    config: EngineConfig,
    learners: Arc<dyn LearnerStore>,
    progress: Arc<dyn ProgressStore>,
    catalogs: Arc<dyn CourseCatalogStore>,
    model: Arc<RecommendationModel>,
    analyzer: Arc<WeaknessAnalyzer>,
    board: WeaknessBoard,
    journal: Option<Arc<FeedbackJournal>>,
    telemetry: Option<RecommenderTelemetry>,
    seen: Mutex<IndexSet<Uuid>>,
    lanes: Mutex<IndexMap<String, Lane>>,
    updates: Mutex<Option<UpdateStream>>,
}

impl FeedbackIngestor {
    /// Creates a builder over the collaborator seams.
    #[must_use]
    pub fn builder(
        learners: Arc<dyn LearnerStore>,
        progress: Arc<dyn ProgressStore>,
        catalogs: Arc<dyn CourseCatalogStore>,
        model: Arc<RecommendationModel>,
    ) -> FeedbackIngestorBuilder {
        FeedbackIngestorBuilder {
            config: EngineConfig::default(),
            learners,
            progress,
            catalogs,
            model,
            analyzer: None,
            board: None,
            journal: None,
            telemetry: None,
        }
    }

    /// The board the ingestor publishes weakness profiles to.
    #[must_use]
    pub fn board(&self) -> WeaknessBoard {
        self.board.clone()
    }

    /// Ingests one feedback event.
    ///
    /// Duplicates (by `event_id`) acknowledge as [`IngestAck::Duplicate`]
    /// without touching any state. Capacity on both update lanes is reserved
    /// before the progress store is mutated, so a rejected event leaves no
    /// trace and can be retried verbatim. The call never blocks on update
    /// application; workers apply updates in order, per learner and globally.
    pub async fn ingest(&self, event: FeedbackEvent) -> Result<IngestAck, EngineError> {
        event.validate()?;
        if self.seen.lock().contains(&event.event_id) {
            self.log(
                LogLevel::Debug,
                "ingest.duplicate",
                json!({ "event_id": event.event_id }),
            );
            return Ok(IngestAck::Duplicate);
        }

        let lane_sender = self.lane_sender(&event.learner_id);
        let lane_permit =
            lane_sender
                .try_reserve()
                .map_err(|_| EngineError::Overloaded {
                    lane: format!("weakness:{}", event.learner_id),
                })?;
        let update_sender = self.update_sender();
        let update_permit =
            update_sender
                .try_reserve()
                .map_err(|_| EngineError::Overloaded {
                    lane: "model-update".to_string(),
                })?;

        // Second gate under the lock: of two racing deliveries of the same
        // event, exactly one inserts and applies.
        if !self.seen.lock().insert(event.event_id) {
            return Ok(IngestAck::Duplicate);
        }

        if let Err(err) = self.apply_to_progress(&event).await {
            self.seen.lock().shift_remove(&event.event_id);
            return Err(err);
        }
        if let Err(err) = self.learners.record_interaction(&event.learner_id).await {
            self.log(
                LogLevel::Warn,
                "ingest.interaction_count_failed",
                json!({ "event_id": event.event_id, "error": err.to_string() }),
            );
        }
        if let Some(journal) = &self.journal {
            if let Err(err) = journal.append(&event) {
                self.log(
                    LogLevel::Warn,
                    "ingest.journal_failed",
                    json!({ "event_id": event.event_id, "error": err.to_string() }),
                );
            }
        }

        self.log(
            LogLevel::Info,
            "ingest.accepted",
            json!({
                "event_id": event.event_id,
                "learner_id": event.learner_id,
                "outcome": event.outcome.label()
            }),
        );
        lane_permit.send(event.clone());
        update_permit.send(event);
        Ok(IngestAck::Accepted)
    }

    /// Closes every lane and waits for the workers to drain.
    pub async fn shutdown(&self) {
        let lanes: Vec<Lane> = {
            let mut lanes = self.lanes.lock();
            lanes.drain(..).map(|(_, lane)| lane).collect()
        };
        let update = self.updates.lock().take();

        let mut handles = Vec::new();
        for lane in lanes {
            drop(lane.sender);
            handles.push(lane.handle);
        }
        if let Some(stream) = update {
            drop(stream.sender);
            handles.push(stream.handle);
        }
        let _ = futures::future::join_all(handles).await;
    }

    async fn apply_to_progress(&self, event: &FeedbackEvent) -> Result<(), EngineError> {
        match &event.outcome {
            FeedbackOutcome::Quiz { skill_tag, score } => {
                self.progress
                    .append_attempt(
                        &event.learner_id,
                        &event.course_id,
                        QuizAttempt::new(skill_tag.clone(), *score, event.at),
                    )
                    .await
            }
            FeedbackOutcome::Completion {
                lesson,
                time_spent_minutes,
            } => {
                self.progress
                    .record_completion(
                        &event.learner_id,
                        &event.course_id,
                        lesson.clone(),
                        *time_spent_minutes,
                        event.at,
                    )
                    .await
            }
            // Ratings carry no progress mutation; they only train the model.
            FeedbackOutcome::Rating { .. } => Ok(()),
        }
    }

    fn lane_sender(&self, learner_id: &str) -> mpsc::Sender<FeedbackEvent> {
        let mut lanes = self.lanes.lock();
        if let Some(lane) = lanes.get(learner_id) {
            return lane.sender.clone();
        }
        let (sender, receiver) = mpsc::channel(self.config.lane_capacity);
        let handle = tokio::spawn(weakness_worker(
            learner_id.to_string(),
            receiver,
            Arc::clone(&self.progress),
            Arc::clone(&self.analyzer),
            self.board.clone(),
            self.telemetry.clone(),
        ));
        lanes.insert(
            learner_id.to_string(),
            Lane {
                sender: sender.clone(),
                handle,
            },
        );
        sender
    }

    fn update_sender(&self) -> mpsc::Sender<FeedbackEvent> {
        let mut updates = self.updates.lock();
        if let Some(stream) = updates.as_ref() {
            return stream.sender.clone();
        }
        let (sender, receiver) = mpsc::channel(self.config.update_stream_capacity);
        let handle = tokio::spawn(model_update_worker(
            receiver,
            Arc::clone(&self.learners),
            Arc::clone(&self.catalogs),
            Arc::clone(&self.model),
            self.telemetry.clone(),
        ));
        *updates = Some(UpdateStream {
            sender: sender.clone(),
            handle,
        });
        sender
    }

    fn log(&self, level: LogLevel, message: &str, fields: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, fields);
        }
    }
}

async fn weakness_worker(
    learner_id: String,
    mut receiver: mpsc::Receiver<FeedbackEvent>,
    progress: Arc<dyn ProgressStore>,
    analyzer: Arc<WeaknessAnalyzer>,
    board: WeaknessBoard,
    telemetry: Option<RecommenderTelemetry>,
) {
    while let Some(event) = receiver.recv().await {
        match progress.learner_history(&learner_id).await {
            Ok(history) => {
                let profile = analyzer.analyze(&learner_id, &history);
                let weak = profile.weak_tags.len();
                board.publish(profile);
                if let Some(telemetry) = &telemetry {
                    let _ = telemetry.log(
                        LogLevel::Debug,
                        "weakness.recomputed",
                        json!({
                            "learner_id": learner_id,
                            "event_id": event.event_id,
                            "weak_tags": weak
                        }),
                    );
                }
            }
            Err(err) => {
                if let Some(telemetry) = &telemetry {
                    let _ = telemetry.log(
                        LogLevel::Warn,
                        "weakness.recompute_failed",
                        json!({ "learner_id": learner_id, "error": err.to_string() }),
                    );
                }
            }
        }
    }
}

async fn model_update_worker(
    mut receiver: mpsc::Receiver<FeedbackEvent>,
    learners: Arc<dyn LearnerStore>,
    catalogs: Arc<dyn CourseCatalogStore>,
    model: Arc<RecommendationModel>,
    telemetry: Option<RecommenderTelemetry>,
) {
    while let Some(event) = receiver.recv().await {
        match &event.outcome {
            FeedbackOutcome::Completion { lesson: None, .. } => {
                model.prior().record_completion(&event.course_id);
            }
            FeedbackOutcome::Rating { stars } => {
                model.prior().record_rating(&event.course_id, *stars);
            }
            _ => {}
        }
        match apply_model_update(&event, &learners, &catalogs, &model).await {
            Ok(version) => {
                if let Some(telemetry) = &telemetry {
                    let _ = telemetry.log(
                        LogLevel::Debug,
                        "model.update.applied",
                        json!({ "event_id": event.event_id, "version": version }),
                    );
                    let _ = telemetry.event(
                        "model.updated",
                        json!({ "version": version, "learner_id": event.learner_id }),
                    );
                }
            }
            Err(err) => {
                // Logged and dropped; the event itself was already applied to
                // the progress store, only this parameter step is lost.
                if let Some(telemetry) = &telemetry {
                    let _ = telemetry.log(
                        LogLevel::Warn,
                        "model.update.failed",
                        json!({ "event_id": event.event_id, "error": err.to_string() }),
                    );
                }
            }
        }
    }
}

async fn apply_model_update(
    event: &FeedbackEvent,
    learners: &Arc<dyn LearnerStore>,
    catalogs: &Arc<dyn CourseCatalogStore>,
    model: &Arc<RecommendationModel>,
) -> Result<u64, EngineError> {
    let profile = learners.profile(&event.learner_id).await?;
    let catalog = catalogs.graph().await?;
    let course = catalog
        .get(&event.course_id)
        .ok_or_else(|| EngineError::UnknownCourse {
            course_id: event.course_id.clone(),
        })?;
    let extractor = FeatureExtractor::new(Arc::new(SkillSpace::from_catalog(&catalog)));
    let (learner_vec, course_vec) = extractor.extract(&profile, course)?;
    let features = extractor.pair_features(&profile, course, &learner_vec, &course_vec);
    Ok(model.apply_feedback(&features, event.outcome.training_label()))
}
