//! Live push-channel registry.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use pulse_core::{PushEnvelope, UserId};

/// Per-channel send buffer. A channel whose buffer fills up (slow or
/// stalled socket) drops pushes rather than blocking the dispatcher.
pub const CHANNEL_BUFFER: usize = 64;

/// Sender half of one live push connection.
pub type PushSender = mpsc::Sender<PushEnvelope>;

/// Identifier of one live connection. A user may hold many (one per
/// open tab); a channel belongs to exactly one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct LiveChannel {
    sender: PushSender,
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryInner {
    by_user: HashMap<UserId, HashMap<ChannelId, LiveChannel>>,
    owners: HashMap<ChannelId, UserId>,
}

/// Maps connected users to their live channels.
///
/// All mutation goes through one lock, so concurrent connects from the
/// same user both end up registered. Entries are ephemeral: created on
/// handshake, removed on disconnect, never persisted.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live channel for a user.
    pub async fn register(&self, user: UserId, channel: ChannelId, sender: PushSender) {
        let mut inner = self.inner.write().await;
        inner.owners.insert(channel, user.clone());
        inner.by_user.entry(user.clone()).or_default().insert(
            channel,
            LiveChannel {
                sender,
                connected_at: Utc::now(),
            },
        );
        debug!(%user, %channel, "channel registered");
    }

    /// Remove a channel. Unknown channels (e.g. a duplicate disconnect
    /// signal) are a no-op.
    pub async fn unregister(&self, channel: &ChannelId) {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.owners.remove(channel) else {
            return;
        };
        if let Some(channels) = inner.by_user.get_mut(&user) {
            if let Some(live) = channels.remove(channel) {
                let connected_for = Utc::now() - live.connected_at;
                debug!(
                    %user,
                    %channel,
                    connected_secs = connected_for.num_seconds(),
                    "channel unregistered"
                );
            }
            if channels.is_empty() {
                inner.by_user.remove(&user);
            }
        }
    }

    /// Senders for every live channel of a user.
    pub async fn channels_for(&self, user: &UserId) -> Vec<(ChannelId, PushSender)> {
        let inner = self.inner.read().await;
        inner
            .by_user
            .get(user)
            .map(|channels| {
                channels
                    .iter()
                    .map(|(id, channel)| (*id, channel.sender.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Users with at least one live channel.
    pub async fn connected_users(&self) -> Vec<UserId> {
        self.inner.read().await.by_user.keys().cloned().collect()
    }

    /// Total number of live channels.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.owners.len()
    }
}
