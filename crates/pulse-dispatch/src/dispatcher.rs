//! Event dispatcher: targeting, counting, fan-out.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use pulse_core::{resolver, Audience, Event, PulseError, PulseResult, PushEnvelope, UserId};
use pulse_store::{ReconciliationStore, UserDirectory};

use crate::registry::SubscriptionRegistry;

/// What one dispatch accomplished, for logging and the ingest response.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchReport {
    /// Users whose counter was incremented.
    pub targeted: usize,
    /// Users skipped because the event was already delivered to them.
    pub deduplicated: usize,
    /// Live channels the push was handed to.
    pub delivered_channels: usize,
}

/// Consumes events, resolves their targets, updates counters, and
/// pushes to every live channel of every targeted user.
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    store: Arc<ReconciliationStore>,
    directory: Arc<dyn UserDirectory>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        store: Arc<ReconciliationStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            registry,
            store,
            directory,
        }
    }

    /// Dispatch one event.
    ///
    /// Counter updates come first and are dedup-guarded; a duplicate
    /// redelivery is invisible (no recount, no repeated push). Pushes
    /// are fire-and-forget per channel: a full or closed channel drops
    /// that one push and never blocks other channels or users. A store
    /// failure aborts loudly so the producer can retry the whole event;
    /// dedup makes the retry safe for users already counted.
    pub async fn dispatch(&self, event: &Event) -> PulseResult<DispatchReport> {
        if let Err(e) = event.validate() {
            warn!(event_id = %event.id, kind = %event.kind, error = %e, "dropping invalid event");
            return Err(e);
        }

        let targets = self.targets(&event.audience).await?;
        let envelope = PushEnvelope::from_event(event);
        let mut report = DispatchReport::default();

        for user in &targets {
            let counted = self.store.increment(user, &event.id).await?;
            if !counted {
                report.deduplicated += 1;
                continue;
            }
            report.targeted += 1;

            for (channel, sender) in self.registry.channels_for(user).await {
                match sender.try_send(envelope.clone()) {
                    Ok(()) => report.delivered_channels += 1,
                    Err(TrySendError::Full(_)) => {
                        debug!(%user, %channel, "push channel full, dropping push")
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(%user, %channel, "push channel closed, dropping push")
                    }
                }
            }
        }

        info!(
            event_id = %event.id,
            kind = %event.kind,
            targeted = report.targeted,
            deduplicated = report.deduplicated,
            channels = report.delivered_channels,
            "event dispatched"
        );
        Ok(report)
    }

    /// The users an audience targets.
    ///
    /// `Users` targets exactly the named set, so counters stay correct
    /// for users who are offline or not even in the roster yet. `All`
    /// and `Roles` resolve over the directory roster; `All` extends to
    /// users known only to the store or the registry.
    async fn targets(&self, audience: &Audience) -> PulseResult<Vec<UserId>> {
        if let Audience::Users(users) = audience {
            return Ok(users.iter().cloned().collect());
        }

        let roster = self.directory.known_users().await.map_err(PulseError::Store)?;
        let mut picked = HashSet::new();
        let mut targets = Vec::new();
        for identity in &roster {
            if resolver::resolve(audience, identity) && picked.insert(identity.id.clone()) {
                targets.push(identity.id.clone());
            }
        }

        if matches!(audience, Audience::All) {
            let extra = self
                .store
                .known_users()
                .await
                .into_iter()
                .chain(self.registry.connected_users().await);
            for user in extra {
                if picked.insert(user.clone()) {
                    targets.push(user);
                }
            }
        }

        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ChannelId, CHANNEL_BUFFER};
    use pulse_core::{EventKind, Role, UserIdentity};
    use pulse_store::StaticDirectory;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct Fixture {
        registry: Arc<SubscriptionRegistry>,
        store: Arc<ReconciliationStore>,
        dispatcher: Dispatcher,
    }

    fn fixture(roster: Vec<UserIdentity>) -> Fixture {
        let registry = Arc::new(SubscriptionRegistry::new());
        let store = Arc::new(ReconciliationStore::new());
        let dispatcher = Dispatcher::new(
            registry.clone(),
            store.clone(),
            Arc::new(StaticDirectory::new(roster)),
        );
        Fixture {
            registry,
            store,
            dispatcher,
        }
    }

    fn roles(role: &str) -> Audience {
        Audience::Roles([Role::new(role)].into_iter().collect())
    }

    #[tokio::test]
    async fn test_offline_user_still_counted() {
        let fx = fixture(vec![UserIdentity::new("alice", "student")]);
        let event = Event::new(EventKind::AnnouncementCreated, Audience::All, json!({}));

        let report = fx.dispatcher.dispatch(&event).await.unwrap();
        assert_eq!(report.targeted, 1);
        assert_eq!(report.delivered_channels, 0);
        assert_eq!(
            fx.store.unread_count(&UserId::new("alice")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_two_channels_one_increment() {
        let fx = fixture(vec![UserIdentity::new("alice", "admin")]);
        let alice = UserId::new("alice");
        let (tx1, mut rx1) = mpsc::channel(CHANNEL_BUFFER);
        let (tx2, mut rx2) = mpsc::channel(CHANNEL_BUFFER);
        fx.registry.register(alice.clone(), ChannelId::new(), tx1).await;
        fx.registry.register(alice.clone(), ChannelId::new(), tx2).await;

        let event = Event::new(
            EventKind::AnnouncementCreated,
            roles("admin"),
            json!({ "title": "hi" }),
        );
        let report = fx.dispatcher.dispatch(&event).await.unwrap();

        assert_eq!(report.targeted, 1);
        assert_eq!(report.delivered_channels, 2);
        assert_eq!(fx.store.unread_count(&alice).await.unwrap(), 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_dispatch_counts_once() {
        let fx = fixture(vec![UserIdentity::new("alice", "student")]);
        let event = Event::new(EventKind::MessagePosted, Audience::All, json!({}));

        fx.dispatcher.dispatch(&event).await.unwrap();
        let second = fx.dispatcher.dispatch(&event).await.unwrap();

        assert_eq!(second.targeted, 0);
        assert_eq!(second.deduplicated, 1);
        assert_eq!(
            fx.store.unread_count(&UserId::new("alice")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_role_audience_skips_other_roles() {
        let fx = fixture(vec![
            UserIdentity::new("alice", "admin"),
            UserIdentity::new("bob", "student"),
        ]);
        let event = Event::new(EventKind::AnnouncementCreated, roles("admin"), json!({}));

        let report = fx.dispatcher.dispatch(&event).await.unwrap();
        assert_eq!(report.targeted, 1);
        assert_eq!(
            fx.store.unread_count(&UserId::new("bob")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_users_audience_reaches_unknown_user() {
        let fx = fixture(vec![]);
        let ghost = UserId::new("ghost");
        let event = Event::new(
            EventKind::MessagePosted,
            Audience::Users([ghost.clone()].into_iter().collect()),
            json!({}),
        );

        let report = fx.dispatcher.dispatch(&event).await.unwrap();
        assert_eq!(report.targeted, 1);
        assert_eq!(fx.store.unread_count(&ghost).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_event_applies_to_nobody() {
        let fx = fixture(vec![UserIdentity::new("alice", "student")]);
        let event = Event::new(
            EventKind::MessagePosted,
            Audience::Users(HashSet::new()),
            json!({}),
        );

        assert!(matches!(
            fx.dispatcher.dispatch(&event).await,
            Err(PulseError::InvalidEvent(_))
        ));
        assert_eq!(
            fx.store.unread_count(&UserId::new("alice")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_all_audience_reaches_store_known_user() {
        let fx = fixture(vec![]);
        let offline = UserId::new("offline");
        // A user known only through earlier counter activity.
        fx.store.increment(&offline, &pulse_core::EventId::new()).await.unwrap();

        let event = Event::new(EventKind::AnnouncementCreated, Audience::All, json!({}));
        fx.dispatcher.dispatch(&event).await.unwrap();
        assert_eq!(fx.store.unread_count(&offline).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_late_connection_gets_no_replay() {
        let fx = fixture(vec![UserIdentity::new("alice", "student")]);
        let alice = UserId::new("alice");

        let event = Event::new(EventKind::AnnouncementCreated, Audience::All, json!({}));
        fx.dispatcher.dispatch(&event).await.unwrap();

        // Connecting after the fact replays nothing; the count is the
        // client's signal to pull.
        let (tx, mut rx) = mpsc::channel(CHANNEL_BUFFER);
        fx.registry.register(alice.clone(), ChannelId::new(), tx).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(fx.store.unread_count(&alice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_full_channel_does_not_fail_dispatch() {
        let fx = fixture(vec![UserIdentity::new("alice", "student")]);
        let alice = UserId::new("alice");
        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(PushEnvelope {
            kind: EventKind::MessagePosted,
            data: json!({}),
        })
        .unwrap();
        fx.registry.register(alice.clone(), ChannelId::new(), tx).await;

        let event = Event::new(EventKind::AnnouncementCreated, Audience::All, json!({}));
        let report = fx.dispatcher.dispatch(&event).await.unwrap();

        // The push was dropped but the counter still moved.
        assert_eq!(report.delivered_channels, 0);
        assert_eq!(fx.store.unread_count(&alice).await.unwrap(), 1);
    }
}
