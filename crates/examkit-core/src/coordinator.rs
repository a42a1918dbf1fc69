//! Saving a completed test: two independent writes, bounded and
//! retryable.
//!
//! A submission issues the history-record write and the rotation-state
//! write concurrently. The writes are independent: one can land while
//! the other fails, and the outcome keeps both results so callers can
//! retry only the failed half. Readers hold a watch handle on the save
//! state so a history fetch can wait out an in-flight write instead of
//! racing it.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::error::StoreError;
use crate::history::HistoryRecord;
use crate::model::{RotationSet, Tier};
use crate::traits::ResultStore;

/// Bounded wait applied to each write attempt. The underlying operation
/// is not cancelled remotely; the coordinator only stops waiting.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for readers awaiting an in-flight submission.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(12);

/// Where the current submission stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Saving,
    Saved,
    Failed,
}

/// Per-write results of one submission attempt.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub history: Result<(), StoreError>,
    pub rotation: Result<(), StoreError>,
}

/// The four ways a submission attempt can land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcomeKind {
    /// Both writes succeeded.
    Saved,
    /// Only the history record landed.
    HistoryOnly,
    /// Only the rotation state landed.
    RotationOnly,
    /// Neither write landed.
    Failed,
}

impl SaveOutcome {
    pub fn kind(&self) -> SaveOutcomeKind {
        match (&self.history, &self.rotation) {
            (Ok(()), Ok(())) => SaveOutcomeKind::Saved,
            (Ok(()), Err(_)) => SaveOutcomeKind::HistoryOnly,
            (Err(_), Ok(())) => SaveOutcomeKind::RotationOnly,
            (Err(_), Err(_)) => SaveOutcomeKind::Failed,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.kind() == SaveOutcomeKind::Saved
    }
}

/// The retained snapshot of a submission, with per-write completion so
/// a retry re-sends only what is still missing.
struct PendingSubmission {
    record: HistoryRecord,
    rotation: RotationSet,
    history_done: bool,
    rotation_done: bool,
}

/// Orchestrates persistence of a completed test.
///
/// State machine per submission: `Idle → Saving → {Saved, Failed}`,
/// and `Failed → Saving` on [`retry`](Self::retry). Exactly one bounded
/// attempt per call; there is no automatic retry loop.
pub struct ResultPersistenceCoordinator {
    store: Arc<dyn ResultStore>,
    write_timeout: Duration,
    state_tx: watch::Sender<SaveState>,
    pending: Option<PendingSubmission>,
}

impl ResultPersistenceCoordinator {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        let (state_tx, _) = watch::channel(SaveState::Idle);
        Self {
            store,
            write_timeout: WRITE_TIMEOUT,
            state_tx,
            pending: None,
        }
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn state(&self) -> SaveState {
        *self.state_tx.borrow()
    }

    /// A handle readers can hold to observe the save state across
    /// tasks.
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.state_tx.subscribe()
    }

    /// Wait (bounded) until no submission is in flight, then report the
    /// state observed. Used by history reads to avoid fetching a list
    /// that is missing the result currently being written.
    pub async fn await_settled(&self, bound: Duration) -> SaveState {
        let mut rx = self.subscribe();
        settled(&mut rx, bound).await
    }

    /// Persist a submission: the history record and the updated
    /// rotation state for all three tiers, written concurrently.
    ///
    /// The snapshot is retained whatever the outcome, so the caller can
    /// [`retry`](Self::retry) without re-scoring or regenerating.
    pub async fn submit(&mut self, record: HistoryRecord, rotation: RotationSet) -> SaveOutcome {
        let mut pending = PendingSubmission {
            record,
            rotation,
            history_done: false,
            rotation_done: false,
        };
        let outcome = self.attempt(&mut pending).await;
        self.pending = Some(pending);
        outcome
    }

    /// Re-send whatever part of the last submission has not landed.
    /// Returns `None` when there is no submission to retry.
    pub async fn retry(&mut self) -> Option<SaveOutcome> {
        let mut pending = self.pending.take()?;
        let outcome = self.attempt(&mut pending).await;
        self.pending = Some(pending);
        Some(outcome)
    }

    async fn attempt(&self, pending: &mut PendingSubmission) -> SaveOutcome {
        self.state_tx.send_replace(SaveState::Saving);

        let history_done = pending.history_done;
        let rotation_done = pending.rotation_done;
        let timeout_secs = self.write_timeout.as_secs();

        let history_write = async {
            if history_done {
                return Ok(());
            }
            match timeout(self.write_timeout, self.store.append_history(&pending.record)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(timeout_secs)),
            }
        };

        let rotation_write = async {
            if rotation_done {
                return Ok(());
            }
            let user = &pending.record.user;
            let writes = Tier::ALL
                .iter()
                .map(|&tier| self.store.put_rotation(user, tier, pending.rotation.tier(tier)));
            match timeout(self.write_timeout, try_join_all(writes)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(StoreError::Timeout(timeout_secs)),
            }
        };

        let (history, rotation) = tokio::join!(history_write, rotation_write);

        pending.history_done = history.is_ok();
        pending.rotation_done = rotation.is_ok();

        if let Err(err) = &history {
            tracing::warn!("history write failed: {err}");
        }
        if let Err(err) = &rotation {
            tracing::warn!("rotation write failed: {err}");
        }

        let outcome = SaveOutcome { history, rotation };
        let state = if outcome.is_saved() {
            SaveState::Saved
        } else {
            SaveState::Failed
        };
        self.state_tx.send_replace(state);
        outcome
    }
}

/// Wait on a subscription handle until no write is in flight, bounded
/// by `bound`. Reports the last state observed (which is still
/// `Saving` if the bound elapsed first).
pub async fn settled(rx: &mut watch::Receiver<SaveState>, bound: Duration) -> SaveState {
    let _ = timeout(bound, rx.wait_for(|state| *state != SaveState::Saving)).await;
    *rx.borrow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerSheet, ChoiceLabel, Question, RotationState, Test, Tier, UserId};
    use crate::scoring;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Store double with per-operation failure, delay, and hang
    /// injection.
    #[derive(Default)]
    struct FlakyStore {
        fail_history: AtomicBool,
        fail_rotation: AtomicBool,
        hang_history: AtomicBool,
        delay_history_secs: AtomicU32,
        history_calls: AtomicU32,
        rotation_calls: AtomicU32,
        records: Mutex<Vec<HistoryRecord>>,
        rotations: Mutex<Vec<(Tier, RotationState)>>,
    }

    #[async_trait]
    impl ResultStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn get_rotation(
            &self,
            _user: &UserId,
            _tier: Tier,
        ) -> Result<Option<RotationState>, StoreError> {
            Ok(None)
        }

        async fn put_rotation(
            &self,
            _user: &UserId,
            tier: Tier,
            state: &RotationState,
        ) -> Result<(), StoreError> {
            self.rotation_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_rotation.load(Ordering::Relaxed) {
                return Err(StoreError::Network("connection reset".into()));
            }
            self.rotations.lock().unwrap().push((tier, state.clone()));
            Ok(())
        }

        async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
            self.history_calls.fetch_add(1, Ordering::Relaxed);
            if self.hang_history.load(Ordering::Relaxed) {
                std::future::pending::<()>().await;
            }
            let delay = self.delay_history_secs.load(Ordering::Relaxed);
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_secs(u64::from(delay))).await;
            }
            if self.fail_history.load(Ordering::Relaxed) {
                return Err(StoreError::Network("connection reset".into()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn list_history(&self, _user: &UserId) -> Result<Vec<HistoryRecord>, StoreError> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn delete_history(&self, _user: &UserId, _id: Uuid) -> Result<(), StoreError> {
            Ok(())
        }

        async fn add_favorite(
            &self,
            _user: &UserId,
            _question_id: &str,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn remove_favorite(
            &self,
            _user: &UserId,
            _question_id: &str,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn list_favorites(&self, _user: &UserId) -> Result<Vec<String>, StoreError> {
            Ok(vec![])
        }
    }

    fn make_record() -> HistoryRecord {
        let questions = (0..2)
            .map(|i| Question {
                id: format!("q-{i}"),
                points: Tier::Three,
                question: format!("prompt {i}"),
                image: None,
                choices: BTreeMap::from([
                    (ChoiceLabel::A, "yes".to_string()),
                    (ChoiceLabel::B, "no".to_string()),
                ]),
                answer: ChoiceLabel::A,
            })
            .collect();
        let test = Test::new(questions);
        let answers = AnswerSheet::new();
        let result = scoring::score(&test, &answers, std::time::Duration::from_secs(60));
        HistoryRecord::from_submission(UserId::new("alice"), &test, &answers, result)
    }

    #[tokio::test]
    async fn submit_success_saves_both_writes() {
        let store = Arc::new(FlakyStore::default());
        let mut coordinator = ResultPersistenceCoordinator::new(store.clone());

        let outcome = coordinator
            .submit(make_record(), RotationSet::default())
            .await;

        assert_eq!(outcome.kind(), SaveOutcomeKind::Saved);
        assert_eq!(coordinator.state(), SaveState::Saved);
        assert_eq!(store.records.lock().unwrap().len(), 1);
        // One upsert per tier.
        assert_eq!(store.rotation_calls.load(Ordering::Relaxed), 3);
        let tiers: Vec<Tier> = store
            .rotations
            .lock()
            .unwrap()
            .iter()
            .map(|(tier, _)| *tier)
            .collect();
        assert_eq!(tiers, Tier::ALL);
    }

    #[tokio::test]
    async fn history_failure_is_rotation_only() {
        let store = Arc::new(FlakyStore::default());
        store.fail_history.store(true, Ordering::Relaxed);
        let mut coordinator = ResultPersistenceCoordinator::new(store.clone());

        let outcome = coordinator
            .submit(make_record(), RotationSet::default())
            .await;

        assert_eq!(outcome.kind(), SaveOutcomeKind::RotationOnly);
        assert!(outcome.history.is_err());
        assert_eq!(coordinator.state(), SaveState::Failed);
    }

    #[tokio::test]
    async fn retry_resends_only_the_failed_half() {
        let store = Arc::new(FlakyStore::default());
        store.fail_history.store(true, Ordering::Relaxed);
        let mut coordinator = ResultPersistenceCoordinator::new(store.clone());

        let outcome = coordinator
            .submit(make_record(), RotationSet::default())
            .await;
        assert_eq!(outcome.kind(), SaveOutcomeKind::RotationOnly);
        assert_eq!(store.rotation_calls.load(Ordering::Relaxed), 3);

        store.fail_history.store(false, Ordering::Relaxed);
        let outcome = coordinator.retry().await.unwrap();

        assert_eq!(outcome.kind(), SaveOutcomeKind::Saved);
        assert_eq!(coordinator.state(), SaveState::Saved);
        // The rotation half was not re-sent.
        assert_eq!(store.rotation_calls.load(Ordering::Relaxed), 3);
        assert_eq!(store.history_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn rotation_failure_is_history_only() {
        let store = Arc::new(FlakyStore::default());
        store.fail_rotation.store(true, Ordering::Relaxed);
        let mut coordinator = ResultPersistenceCoordinator::new(store.clone());

        let outcome = coordinator
            .submit(make_record(), RotationSet::default())
            .await;

        assert_eq!(outcome.kind(), SaveOutcomeKind::HistoryOnly);
        assert!(outcome.rotation.is_err());
        // The history record still landed and is never discarded.
        assert_eq!(store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retry_without_submission_is_none() {
        let store = Arc::new(FlakyStore::default());
        let mut coordinator = ResultPersistenceCoordinator::new(store);
        assert!(coordinator.retry().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_write_times_out_and_keeps_snapshot() {
        let store = Arc::new(FlakyStore::default());
        store.hang_history.store(true, Ordering::Relaxed);
        let mut coordinator = ResultPersistenceCoordinator::new(store.clone());

        let record = make_record();
        let record_id = record.id;
        let outcome = coordinator.submit(record, RotationSet::default()).await;

        assert_eq!(outcome.kind(), SaveOutcomeKind::RotationOnly);
        assert!(matches!(outcome.history, Err(StoreError::Timeout(10))));
        assert_eq!(coordinator.state(), SaveState::Failed);

        // The identical snapshot is retried once the store recovers.
        store.hang_history.store(false, Ordering::Relaxed);
        let outcome = coordinator.retry().await.unwrap();
        assert_eq!(outcome.kind(), SaveOutcomeKind::Saved);
        assert_eq!(store.records.lock().unwrap()[0].id, record_id);
    }

    #[tokio::test(start_paused = true)]
    async fn readers_can_await_settlement() {
        let store = Arc::new(FlakyStore::default());
        store.delay_history_secs.store(3, Ordering::Relaxed);
        let mut coordinator = ResultPersistenceCoordinator::new(store);
        let mut rx = coordinator.subscribe();

        let writer = tokio::spawn(async move {
            coordinator.submit(make_record(), RotationSet::default()).await
        });

        // A reader arriving mid-write waits the submission out instead
        // of racing it.
        rx.wait_for(|state| *state == SaveState::Saving).await.unwrap();
        let observed = settled(&mut rx, SETTLE_TIMEOUT).await;
        assert_eq!(observed, SaveState::Saved);

        let outcome = writer.await.unwrap();
        assert!(outcome.is_saved());
    }

    #[tokio::test]
    async fn await_settled_is_immediate_when_idle() {
        let store = Arc::new(FlakyStore::default());
        let coordinator = ResultPersistenceCoordinator::new(store);
        let state = coordinator.await_settled(SETTLE_TIMEOUT).await;
        assert_eq!(state, SaveState::Idle);
    }
}
