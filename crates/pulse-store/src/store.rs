//! Per-user unread counters and read markers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use pulse_core::error::StoreResult;
use pulse_core::{EventId, UserId};

use crate::source::AuthoritativeSource;

/// Default per-user bound on retained dedup/seen entries.
pub const DEFAULT_RETENTION: usize = 1024;

/// Read/unread state for one user.
///
/// `delivered` is the dedup set: every event counted for this user.
/// `seen` is the read-marker set. The unread counter equals the number
/// of delivered items not yet seen; the insertion-order queues bound
/// both sets, evicting oldest-first.
#[derive(Debug, Default)]
struct ReadState {
    unread_count: u64,
    seen: HashSet<EventId>,
    seen_order: VecDeque<EventId>,
    delivered: HashSet<EventId>,
    delivered_order: VecDeque<EventId>,
}

impl ReadState {
    fn record_delivered(&mut self, id: EventId, retention: usize) {
        if self.delivered.insert(id) {
            self.delivered_order.push_back(id);
        }
        while self.delivered_order.len() > retention {
            if let Some(old) = self.delivered_order.pop_front() {
                self.delivered.remove(&old);
            }
        }
    }

    fn record_seen(&mut self, id: EventId, retention: usize) -> bool {
        let inserted = self.seen.insert(id);
        if inserted {
            self.seen_order.push_back(id);
        }
        while self.seen_order.len() > retention {
            if let Some(old) = self.seen_order.pop_front() {
                self.seen.remove(&old);
            }
        }
        inserted
    }
}

/// The authoritative per-user unread counter store.
///
/// Every mutation of one user's state runs under that user's own lock,
/// so increments, mark-reads and resets serialize per user while
/// different users proceed in parallel. State is created lazily on
/// first touch and never destroyed, only superseded by [`refresh`].
///
/// [`refresh`]: ReconciliationStore::refresh
pub struct ReconciliationStore {
    users: RwLock<HashMap<UserId, Arc<Mutex<ReadState>>>>,
    retention: usize,
}

impl ReconciliationStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Create a store with a custom per-user dedup retention bound.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            retention: retention.max(1),
        }
    }

    /// Fetch or lazily create the state entry for a user.
    async fn entry(&self, user: &UserId) -> Arc<Mutex<ReadState>> {
        {
            let users = self.users.read().await;
            if let Some(entry) = users.get(user) {
                return entry.clone();
            }
        }
        let mut users = self.users.write().await;
        users.entry(user.clone()).or_default().clone()
    }

    /// Count an event as delivered to a user.
    ///
    /// Returns `true` if the counter was incremented, `false` if the
    /// event was already delivered or already seen (duplicate
    /// redelivery from an at-least-once source).
    pub async fn increment(&self, user: &UserId, event: &EventId) -> StoreResult<bool> {
        let entry = self.entry(user).await;
        let mut state = entry.lock().await;
        if state.seen.contains(event) || state.delivered.contains(event) {
            debug!(%user, %event, "duplicate delivery, skipping increment");
            return Ok(false);
        }
        state.record_delivered(*event, self.retention);
        state.unread_count += 1;
        Ok(true)
    }

    /// Mark a single item read. Idempotent; the decrement clamps at zero
    /// and only fires when the item was actually counted unread.
    pub async fn mark_read(&self, user: &UserId, event: &EventId) -> StoreResult<()> {
        let entry = self.entry(user).await;
        let mut state = entry.lock().await;
        let was_counted = state.delivered.contains(event) && !state.seen.contains(event);
        if state.record_seen(*event, self.retention) && was_counted {
            state.unread_count = state.unread_count.saturating_sub(1);
        }
        Ok(())
    }

    /// Mark every outstanding item read and zero the counter.
    ///
    /// Capture and reset happen under the same user lock, so an
    /// increment racing this call lands entirely before it (and is
    /// absorbed) or entirely after it (and survives as unread),
    /// never torn in between.
    pub async fn mark_all_read(&self, user: &UserId) -> StoreResult<()> {
        let entry = self.entry(user).await;
        let mut state = entry.lock().await;
        let outstanding: Vec<EventId> = state
            .delivered
            .iter()
            .filter(|id| !state.seen.contains(*id))
            .copied()
            .collect();
        for id in outstanding {
            state.record_seen(id, self.retention);
        }
        state.unread_count = 0;
        Ok(())
    }

    /// Unconditionally replace a user's counter and seen set from the
    /// durable source of truth. Dedup entries survive: an event already
    /// delivered must not recount after a refresh.
    pub async fn refresh(
        &self,
        user: &UserId,
        count: u64,
        seen: HashSet<EventId>,
    ) -> StoreResult<()> {
        let entry = self.entry(user).await;
        let mut state = entry.lock().await;
        state.seen_order = seen.iter().copied().collect();
        state.seen = seen;
        state.unread_count = count;
        Ok(())
    }

    /// Fetch the authoritative state for a user and replace local state
    /// with it. Returns the refreshed count.
    pub async fn refresh_from(
        &self,
        source: &dyn AuthoritativeSource,
        user: &UserId,
    ) -> StoreResult<u64> {
        let (count, seen) = source.fetch_authoritative_unread(user).await?;
        self.refresh(user, count, seen).await?;
        Ok(count)
    }

    /// Current unread count. A user never touched reads as zero.
    pub async fn unread_count(&self, user: &UserId) -> StoreResult<u64> {
        let users = self.users.read().await;
        match users.get(user) {
            Some(entry) => Ok(entry.lock().await.unread_count),
            None => Ok(0),
        }
    }

    /// Every user with materialized state. Used to resolve `All`
    /// audiences against users who are known but currently offline.
    pub async fn known_users(&self) -> Vec<UserId> {
        self.users.read().await.keys().cloned().collect()
    }
}

impl Default for ReconciliationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[tokio::test]
    async fn test_increment_counts_once_per_event() {
        let store = ReconciliationStore::new();
        let u = user("alice");
        let e = EventId::new();

        assert!(store.increment(&u, &e).await.unwrap());
        assert!(!store.increment(&u, &e).await.unwrap());
        assert_eq!(store.unread_count(&u).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store = ReconciliationStore::new();
        let u = user("alice");
        let e1 = EventId::new();
        let e2 = EventId::new();

        store.increment(&u, &e1).await.unwrap();
        store.increment(&u, &e2).await.unwrap();

        store.mark_read(&u, &e1).await.unwrap();
        store.mark_read(&u, &e1).await.unwrap();
        assert_eq!(store.unread_count(&u).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_of_uncounted_item_never_goes_negative() {
        let store = ReconciliationStore::new();
        let u = user("alice");

        store.mark_read(&u, &EventId::new()).await.unwrap();
        assert_eq!(store.unread_count(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seen_item_never_recounts() {
        let store = ReconciliationStore::new();
        let u = user("alice");
        let e = EventId::new();

        store.increment(&u, &e).await.unwrap();
        store.mark_read(&u, &e).await.unwrap();
        // Redelivery after the item was read must not resurrect it.
        assert!(!store.increment(&u, &e).await.unwrap());
        assert_eq!(store.unread_count(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_zeroes_counter() {
        let store = ReconciliationStore::new();
        let u = user("alice");
        for _ in 0..5 {
            store.increment(&u, &EventId::new()).await.unwrap();
        }

        store.mark_all_read(&u).await.unwrap();
        assert_eq!(store.unread_count(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_after_mark_all_read_survives() {
        let store = ReconciliationStore::new();
        let u = user("alice");
        store.increment(&u, &EventId::new()).await.unwrap();
        store.mark_all_read(&u).await.unwrap();

        store.increment(&u, &EventId::new()).await.unwrap();
        assert_eq!(store.unread_count(&u).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refresh_round_trip() {
        let store = ReconciliationStore::new();
        let u = user("alice");
        store.increment(&u, &EventId::new()).await.unwrap();

        let seen: HashSet<EventId> = [EventId::new(), EventId::new()].into_iter().collect();
        store.refresh(&u, 7, seen).await.unwrap();
        assert_eq!(store.unread_count(&u).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_delivered_survives_refresh() {
        let store = ReconciliationStore::new();
        let u = user("alice");
        let e = EventId::new();
        store.increment(&u, &e).await.unwrap();

        store.refresh(&u, 0, HashSet::new()).await.unwrap();
        // Already-delivered event redelivered after a refresh must not recount.
        assert!(!store.increment(&u, &e).await.unwrap());
        assert_eq!(store.unread_count(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retention_evicts_oldest_dedup_entries() {
        let store = ReconciliationStore::with_retention(3);
        let u = user("alice");
        let first = EventId::new();
        store.increment(&u, &first).await.unwrap();
        for _ in 0..3 {
            store.increment(&u, &EventId::new()).await.unwrap();
        }

        // The oldest entry fell out of the dedup window, so a redelivery
        // counts again. The bounded window trades this for bounded memory.
        assert!(store.increment(&u, &first).await.unwrap());
        assert_eq!(store.unread_count(&u).await.unwrap(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_increments_count_once() {
        let store = Arc::new(ReconciliationStore::new());
        let u = user("alice");
        let e = EventId::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let u = u.clone();
            handles.push(tokio::spawn(async move {
                store.increment(&u, &e).await.unwrap()
            }));
        }
        let counted: usize = join_all(handles).await.into_iter().filter(|c| *c).count();
        assert_eq!(counted, 1);
        assert_eq!(store.unread_count(&u).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_with_mark_all_read_lose_nothing() {
        let store = Arc::new(ReconciliationStore::new());
        let u = user("alice");
        let total: u64 = 32;

        let mut handles = Vec::new();
        for _ in 0..total {
            let store = store.clone();
            let u = u.clone();
            handles.push(tokio::spawn(async move {
                store.increment(&u, &EventId::new()).await.unwrap();
            }));
        }
        {
            let store = store.clone();
            let u = u.clone();
            handles.push(tokio::spawn(async move {
                store.mark_all_read(&u).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whatever the interleaving, no update is torn: the final count
        // is at most the number of increments, and a second reset plus a
        // fresh increment behaves exactly as from a quiescent state.
        let count = store.unread_count(&u).await.unwrap();
        assert!(count <= total);
        store.mark_all_read(&u).await.unwrap();
        assert_eq!(store.unread_count(&u).await.unwrap(), 0);
        store.increment(&u, &EventId::new()).await.unwrap();
        assert_eq!(store.unread_count(&u).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let store = ReconciliationStore::new();
        let a = user("alice");
        let b = user("bob");

        store.increment(&a, &EventId::new()).await.unwrap();
        store.increment(&b, &EventId::new()).await.unwrap();
        store.mark_all_read(&a).await.unwrap();

        assert_eq!(store.unread_count(&a).await.unwrap(), 0);
        assert_eq!(store.unread_count(&b).await.unwrap(), 1);
    }

    async fn join_all(handles: Vec<tokio::task::JoinHandle<bool>>) -> Vec<bool> {
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }
}
