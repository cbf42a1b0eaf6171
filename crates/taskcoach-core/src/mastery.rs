//! Per-topic mastery tracking.
//!
//! The tracker owns the in-memory [`MemoryStore`] and writes it through to a
//! [`DurableStore`] after every mutation. All mutations run inside one async
//! mutex, held across the save, so concurrent updates are applied strictly
//! one after another and none is lost.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::StoreError;
use crate::model::{
    FollowUp, HistoryRecord, MasteryUpdate, MemoryStore, NormalizedTask, QuizResult,
};
use crate::traits::DurableStore;

/// Mastery assumed for a topic with no prior attempts.
pub const NEUTRAL_PRIOR: f64 = 0.5;

/// Scale applied to the distance between a score and the neutral midpoint.
pub const NUDGE_RATE: f64 = 0.3;

/// Default store key for the mastery document.
pub const DEFAULT_STORE_KEY: &str = "memory";

/// Move `current` mastery toward a quiz `score`, clamped to [0, 1].
pub fn nudge(current: f64, score: f64) -> f64 {
    let delta = (score - NEUTRAL_PRIOR) * NUDGE_RATE;
    (current + delta).clamp(0.0, 1.0)
}

/// Shared, write-through mastery state.
pub struct MasteryTracker {
    store: Arc<dyn DurableStore>,
    key: String,
    state: Mutex<MemoryStore>,
    /// Why an existing document could not be loaded. While set, every save
    /// is refused so the document on disk is never replaced.
    load_error: Option<String>,
}

impl MasteryTracker {
    /// Load the mastery document under `key`.
    ///
    /// An absent document yields an empty store. A document that cannot be
    /// read or parsed also yields an empty in-memory view, but the tracker
    /// is then read-only: updates fail with [`StoreError::NotLoaded`] rather
    /// than overwrite history they never saw.
    pub async fn open(store: Arc<dyn DurableStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let loaded = match store.load(&key).await {
            Ok(Some(value)) => serde_json::from_value::<MemoryStore>(value)
                .map(Some)
                .map_err(|e| e.to_string()),
            Ok(None) => Ok(None),
            Err(e) => Err(e.to_string()),
        };

        let (state, load_error) = match loaded {
            Ok(memory) => (memory.unwrap_or_default(), None),
            Err(reason) => {
                tracing::warn!(
                    key = %key,
                    error = %reason,
                    "mastery document could not be loaded, updates are disabled"
                );
                (MemoryStore::default(), Some(reason))
            }
        };

        tracing::debug!(
            key = %key,
            attempts = state.history.len(),
            topics = state.skills.len(),
            "mastery tracker opened"
        );

        Self {
            store,
            key,
            state: Mutex::new(state),
            load_error,
        }
    }

    /// Store key this tracker reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Why the stored document could not be loaded, if it could not.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        match &self.load_error {
            Some(reason) => Err(StoreError::NotLoaded {
                key: self.key.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Record a graded quiz and nudge the topic's mastery.
    ///
    /// The change is staged on a copy and only committed once the store has
    /// accepted it, so a save failure leaves memory and disk in agreement and
    /// is returned to the caller.
    #[instrument(skip_all, fields(title = %task.normalized_title, score = result.score))]
    pub async fn update_from_quiz(
        &self,
        task: &NormalizedTask,
        result: &QuizResult,
    ) -> Result<MasteryUpdate, StoreError> {
        self.ensure_writable()?;
        let title = task.normalized_title.clone();
        let mut state = self.state.lock().await;

        let mut staged = state.clone();
        staged.history.push(HistoryRecord {
            title: title.clone(),
            score: result.score,
            passed: result.passed,
            timestamp: Utc::now(),
        });
        let current = staged.skills.get(&title).copied().unwrap_or(NEUTRAL_PRIOR);
        let mastery = nudge(current, result.score);
        staged.skills.insert(title, mastery);

        let document = serde_json::to_value(&staged)?;
        self.store.save(&self.key, &document).await?;
        *state = staged;

        tracing::info!(previous = current, mastery, "mastery updated");

        Ok(MasteryUpdate {
            mastery,
            passed: result.passed,
            next_agent: if result.passed {
                FollowUp::None
            } else {
                FollowUp::HelpAgent
            },
        })
    }

    /// Current mastery for `title`, if the topic has been attempted.
    pub async fn mastery(&self, title: &str) -> Option<f64> {
        self.state.lock().await.skills.get(title).copied()
    }

    /// A copy of the full in-memory document.
    pub async fn snapshot(&self) -> MemoryStore {
        self.state.lock().await.clone()
    }

    /// Make sure the store holds the current state, for use at shutdown.
    ///
    /// Updates are already written through, so this only writes when the
    /// stored document differs from memory (for example after it was removed
    /// externally). Nothing is written for a store that was never loaded or
    /// an empty state that was never changed.
    pub async fn flush(&self) -> Result<(), StoreError> {
        if self.load_error.is_some() {
            tracing::debug!(key = %self.key, "skipping flush of unloaded mastery document");
            return Ok(());
        }

        let state = self.state.lock().await;
        let unchanged = match self.store.load(&self.key).await? {
            Some(stored) => {
                let stored: MemoryStore =
                    serde_json::from_value(stored).map_err(|e| StoreError::Corrupt {
                        key: self.key.clone(),
                        message: e.to_string(),
                    })?;
                stored == *state
            }
            None => *state == MemoryStore::default(),
        };
        if unchanged {
            return Ok(());
        }
        let document = serde_json::to_value(&*state)?;
        self.store.save(&self.key, &document).await
    }
}
