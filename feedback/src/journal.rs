use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indexmap::IndexSet;
use parking_lot::Mutex;
use uuid::Uuid;

use compass_domain::FeedbackEvent;

/// Durable JSONL journal of applied feedback events. Replayed at startup so
/// deduplication survives restarts.
#[derive(Debug)]
pub struct FeedbackJournal {
    path: PathBuf,
    writer: Mutex<std::fs::File>,
}

impl FeedbackJournal {
    /// Opens or creates a journal at the provided path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating journal dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening feedback journal {}", path.display()))?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Appends one applied event.
    pub fn append(&self, event: &FeedbackEvent) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, event)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Replays every journaled event, oldest first.
    pub fn replay(&self) -> Result<Vec<FeedbackEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("opening feedback journal {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str::<FeedbackEvent>(&line)
                .with_context(|| "failed to deserialize journaled feedback event")?;
            events.push(event);
        }
        Ok(events)
    }

    /// Identifiers of every journaled event, for dedup warm-start.
    pub fn applied_ids(&self) -> Result<IndexSet<Uuid>> {
        Ok(self
            .replay()?
            .into_iter()
            .map(|event| event.event_id)
            .collect())
    }

    /// Returns the journal path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::FeedbackOutcome;
    use tempfile::tempdir;

    fn quiz(learner: &str) -> FeedbackEvent {
        FeedbackEvent::new(
            learner,
            "c-1",
            FeedbackOutcome::Quiz {
                skill_tag: "loops".into(),
                score: 0.3,
            },
        )
    }

    #[test]
    fn journal_replays_in_append_order() {
        let dir = tempdir().unwrap();
        let journal = FeedbackJournal::open(dir.path().join("feedback.log")).unwrap();
        let first = quiz("l-1");
        let second = quiz("l-2");
        journal.append(&first).unwrap();
        journal.append(&second).unwrap();
        let replayed = journal.replay().unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].event_id, first.event_id);
        assert_eq!(replayed[1].event_id, second.event_id);
    }

    #[test]
    fn applied_ids_deduplicate_redeliveries() {
        let dir = tempdir().unwrap();
        let journal = FeedbackJournal::open(dir.path().join("feedback.log")).unwrap();
        let event = quiz("l-1");
        journal.append(&event).unwrap();
        journal.append(&event).unwrap();
        let ids = journal.applied_ids().unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&event.event_id));
    }

    #[test]
    fn missing_file_replays_empty() {
        let dir = tempdir().unwrap();
        let journal = FeedbackJournal::open(dir.path().join("feedback.log")).unwrap();
        std::fs::remove_file(journal.path()).unwrap();
        assert!(journal.replay().unwrap().is_empty());
    }
}
