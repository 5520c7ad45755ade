//! Durable source-of-truth boundary.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use pulse_core::error::StoreResult;
use pulse_core::{EventId, UserId};

/// Read boundary with durable storage: the authoritative unread count
/// and seen set for a user. [`ReconciliationStore::refresh_from`] uses
/// this to self-heal any drift in the best-effort counters.
///
/// [`ReconciliationStore::refresh_from`]: crate::store::ReconciliationStore::refresh_from
#[async_trait]
pub trait AuthoritativeSource: Send + Sync {
    async fn fetch_authoritative_unread(
        &self,
        user: &UserId,
    ) -> StoreResult<(u64, HashSet<EventId>)>;
}

/// In-memory authoritative source.
///
/// Used by tests and by deployments without a durable backend wired up;
/// a user with no recorded snapshot refreshes to zero unread.
#[derive(Default)]
pub struct InMemorySource {
    snapshots: RwLock<HashMap<UserId, (u64, HashSet<EventId>)>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the authoritative snapshot for a user.
    pub async fn set(&self, user: UserId, count: u64, seen: HashSet<EventId>) {
        self.snapshots.write().await.insert(user, (count, seen));
    }
}

#[async_trait]
impl AuthoritativeSource for InMemorySource {
    async fn fetch_authoritative_unread(
        &self,
        user: &UserId,
    ) -> StoreResult<(u64, HashSet<EventId>)> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(user).cloned().unwrap_or_default())
    }
}
