//! The persistence seam: the async trait remote result stores
//! implement.
//!
//! Implementations live in the `examkit-store` crate. Every operation
//! may fail or hang; callers wrap them in explicit timeouts (see the
//! coordinator).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::history::HistoryRecord;
use crate::model::{RotationSet, RotationState, Tier, UserId};

/// A durable per-user record store reachable over a network.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Human-readable backend name (e.g. "rest").
    fn name(&self) -> &str;

    /// Read one tier's rotation state. `None` when the user has no
    /// state yet for that tier.
    async fn get_rotation(
        &self,
        user: &UserId,
        tier: Tier,
    ) -> Result<Option<RotationState>, StoreError>;

    /// Upsert one tier's rotation state.
    async fn put_rotation(
        &self,
        user: &UserId,
        tier: Tier,
        state: &RotationState,
    ) -> Result<(), StoreError>;

    /// Append a completed-test record to the user's history.
    async fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError>;

    /// All history records for a user, ordered by creation time.
    async fn list_history(&self, user: &UserId) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Delete a single history record.
    async fn delete_history(&self, user: &UserId, id: Uuid) -> Result<(), StoreError>;

    async fn add_favorite(&self, user: &UserId, question_id: &str) -> Result<(), StoreError>;

    async fn remove_favorite(&self, user: &UserId, question_id: &str)
        -> Result<(), StoreError>;

    async fn list_favorites(&self, user: &UserId) -> Result<Vec<String>, StoreError>;
}

/// Fetch all three tiers' rotation state at login. Tiers with no stored
/// state start fresh.
pub async fn load_rotation_set(
    store: &dyn ResultStore,
    user: &UserId,
) -> Result<RotationSet, StoreError> {
    let mut set = RotationSet::default();
    for tier in Tier::ALL {
        if let Some(state) = store.get_rotation(user, tier).await? {
            set.set_tier(tier, state);
        }
    }
    Ok(set)
}
