//! In-memory store for offline use and testing.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use examkit_core::error::StoreError;
use examkit_core::history::HistoryRecord;
use examkit_core::model::{RotationState, Tier, UserId};
use examkit_core::traits::ResultStore;

/// A `ResultStore` backed by in-process maps.
///
/// Doubles as the guest/offline backend and as a test double: it counts
/// calls and can be switched to fail all writes.
#[derive(Default)]
pub struct MemoryStore {
    rotations: Mutex<HashMap<(UserId, Tier), RotationState>>,
    history: Mutex<HashMap<UserId, Vec<HistoryRecord>>>,
    favorites: Mutex<HashMap<UserId, BTreeSet<String>>>,
    call_count: AtomicU32,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations performed.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Make every subsequent write fail with a network error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            Err(StoreError::Network("simulated write failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_rotation(
        &self,
        user: &UserId,
        tier: Tier,
    ) -> Result<Option<RotationState>, StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let rotations = self.rotations.lock().unwrap();
        Ok(rotations.get(&(user.clone(), tier)).cloned())
    }

    async fn put_rotation(
        &self,
        user: &UserId,
        tier: Tier,
        state: &RotationState,
    ) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        self.rotations
            .lock()
            .unwrap()
            .insert((user.clone(), tier), state.clone());
        Ok(())
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        self.history
            .lock()
            .unwrap()
            .entry(record.user.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn list_history(&self, user: &UserId) -> Result<Vec<HistoryRecord>, StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let history = self.history.lock().unwrap();
        let mut records = history.get(user).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn delete_history(&self, user: &UserId, id: Uuid) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        let mut history = self.history.lock().unwrap();
        let records = history
            .get_mut(user)
            .ok_or_else(|| StoreError::NotFound(format!("history for {user}")))?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(format!("history record {id}")));
        }
        Ok(())
    }

    async fn add_favorite(&self, user: &UserId, question_id: &str) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        self.favorites
            .lock()
            .unwrap()
            .entry(user.clone())
            .or_default()
            .insert(question_id.to_string());
        Ok(())
    }

    async fn remove_favorite(
        &self,
        user: &UserId,
        question_id: &str,
    ) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        if let Some(set) = self.favorites.lock().unwrap().get_mut(user) {
            set.remove(question_id);
        }
        Ok(())
    }

    async fn list_favorites(&self, user: &UserId) -> Result<Vec<String>, StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let favorites = self.favorites.lock().unwrap();
        Ok(favorites
            .get(user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examkit_core::scoring::ExamResult;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn make_record(user: &UserId, score: u32) -> HistoryRecord {
        HistoryRecord {
            id: Uuid::new_v4(),
            user: user.clone(),
            created_at: Utc::now(),
            result: ExamResult {
                correct: 0,
                wrong: 0,
                unanswered: 24,
                score,
                max_score: 96,
                accuracy: 0,
                elapsed_secs: 60,
            },
            question_ids: vec![],
            user_answers: BTreeMap::new(),
            correct_answers: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn rotation_roundtrip() {
        let store = MemoryStore::new();
        let user = alice();

        assert_eq!(store.get_rotation(&user, Tier::Three).await.unwrap(), None);

        let state = RotationState {
            used: BTreeSet::from(["q-1".to_string()]),
            round: 3,
        };
        store.put_rotation(&user, Tier::Three, &state).await.unwrap();

        let loaded = store.get_rotation(&user, Tier::Three).await.unwrap();
        assert_eq!(loaded, Some(state));
        // Tiers are independent.
        assert_eq!(store.get_rotation(&user, Tier::Four).await.unwrap(), None);
    }

    #[tokio::test]
    async fn history_append_list_delete() {
        let store = MemoryStore::new();
        let user = alice();

        let first = make_record(&user, 10);
        let second = make_record(&user, 20);
        store.append_history(&first).await.unwrap();
        store.append_history(&second).await.unwrap();

        let records = store.list_history(&user).await.unwrap();
        assert_eq!(records.len(), 2);

        store.delete_history(&user, first.id).await.unwrap();
        let records = store.list_history(&user).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, second.id);

        let err = store.delete_history(&user, first.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_is_per_user() {
        let store = MemoryStore::new();
        let user = alice();
        let other = UserId::new("bob");

        store.append_history(&make_record(&user, 10)).await.unwrap();

        assert_eq!(store.list_history(&user).await.unwrap().len(), 1);
        assert!(store.list_history(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn favorites_roundtrip() {
        let store = MemoryStore::new();
        let user = alice();

        store.add_favorite(&user, "q-7").await.unwrap();
        store.add_favorite(&user, "q-3").await.unwrap();
        store.add_favorite(&user, "q-7").await.unwrap();

        let favorites = store.list_favorites(&user).await.unwrap();
        assert_eq!(favorites, vec!["q-3".to_string(), "q-7".to_string()]);

        store.remove_favorite(&user, "q-3").await.unwrap();
        assert_eq!(store.list_favorites(&user).await.unwrap(), vec!["q-7"]);
    }

    #[tokio::test]
    async fn write_failure_injection() {
        let store = MemoryStore::new();
        let user = alice();

        store.set_fail_writes(true);
        let err = store
            .put_rotation(&user, Tier::Three, &RotationState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Network(_)));

        store.set_fail_writes(false);
        store
            .put_rotation(&user, Tier::Three, &RotationState::default())
            .await
            .unwrap();
        assert!(store.call_count() >= 2);
    }
}
