use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use compass_domain::{EngineError, FeedbackEvent};
use shared_event_bus::EventRecord;

use crate::ingestor::FeedbackIngestor;

/// Decodes a bus record into a feedback event. The upstream source publishes
/// `feedback.*` typed records whose payload is the serialized event.
pub fn decode_feedback(record: &EventRecord) -> Result<FeedbackEvent, EngineError> {
    if !record.event_type.starts_with("feedback.") {
        return Err(EngineError::malformed(format!(
            "unexpected event type '{}'",
            record.event_type
        )));
    }
    serde_json::from_value(record.payload.clone())
        .map_err(|err| EngineError::malformed(format!("undecodable feedback payload: {err}")))
}

/// Pumps bus deliveries into the ingestor until the bus closes.
///
/// Delivery is at-least-once and unordered across learners: duplicates
/// acknowledge as no-ops inside the ingestor, decode failures and rejected
/// events are logged and left to the upstream redelivery loop.
pub fn spawn_bus_pump(
    mut receiver: broadcast::Receiver<EventRecord>,
    ingestor: Arc<FeedbackIngestor>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(record) => match decode_feedback(&record) {
                    Ok(event) => {
                        if let Err(err) = ingestor.ingest(event).await {
                            eprintln!("feedback ingest failed: {err}");
                        }
                    }
                    Err(err) => eprintln!("feedback decode failed: {err}"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    eprintln!("feedback pump lagged, {skipped} deliveries skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::{
        CourseCatalog, CourseNode, DifficultyTier, FeedbackOutcome, LearnerProfile, LearningStyle,
        MemoryCatalogStore, MemoryLearnerStore, MemoryProgressStore, ModelConfig,
    };
    use compass_recommender::RecommendationModel;
    use serde_json::json;
    use shared_event_bus::{EventPublisher, EventSubscriber, MemoryEventBus};
    use tokio::runtime::Runtime;

    fn feedback_record(event: &FeedbackEvent) -> EventRecord {
        EventRecord::new(
            "progress-tracker",
            format!("feedback.{}", event.outcome.label()),
            serde_json::to_value(event).unwrap(),
        )
    }

    #[test]
    fn decode_rejects_foreign_event_types() {
        let record = EventRecord::new("chat", "message.posted", json!({}));
        assert!(matches!(
            decode_feedback(&record),
            Err(EngineError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn pump_feeds_bus_deliveries_into_the_ingestor() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let learners = Arc::new(MemoryLearnerStore::new());
            learners.upsert(
                LearnerProfile::new("l-1", LearningStyle::Visual).with_skill("loops", 0.2),
            );
            let progress = Arc::new(MemoryProgressStore::new());
            let catalog = CourseCatalog::new(1).with_course(
                CourseNode::new("c-1", 20.0, DifficultyTier::Intro).teaching("loops", 0.5),
            );
            let ingestor = Arc::new(
                FeedbackIngestor::builder(
                    learners,
                    Arc::clone(&progress) as Arc<dyn compass_domain::ProgressStore>,
                    Arc::new(MemoryCatalogStore::new(catalog)),
                    Arc::new(RecommendationModel::new(ModelConfig::default())),
                )
                .build(),
            );

            let bus = MemoryEventBus::new(16);
            let pump = spawn_bus_pump(bus.subscribe().await.unwrap(), Arc::clone(&ingestor));

            let event = FeedbackEvent::new(
                "l-1",
                "c-1",
                FeedbackOutcome::Quiz {
                    skill_tag: "loops".into(),
                    score: 0.3,
                },
            );
            // Redelivered once: the pump must apply it exactly once.
            bus.publish(feedback_record(&event)).await.unwrap();
            bus.publish(feedback_record(&event).redelivered()).await.unwrap();
            drop(bus);
            pump.await.unwrap();

            assert_eq!(progress.attempt_count(), 1);
            ingestor.shutdown().await;
        });
    }
}
