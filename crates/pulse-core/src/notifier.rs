//! Producer-side event client.
//!
//! Out-of-process event sources (the announcements service, the request
//! workflow, the chat backend) use this client to hand events to a
//! running Pulse server over HTTP.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::event::{Audience, EventKind};
use crate::identity::UserId;

/// Default Pulse server URL.
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3040";

/// Sends events to the Pulse server's ingest endpoint via HTTP.
#[derive(Clone)]
pub struct EventNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl EventNotifier {
    /// Create a new notifier with default settings.
    ///
    /// Uses the `PULSE_SERVER_URL` environment variable if set,
    /// otherwise defaults to `http://127.0.0.1:3040`.
    pub fn new() -> Self {
        let base_url =
            std::env::var("PULSE_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        debug!(base_url = %base_url, "EventNotifier initialized");
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    /// Create a notifier with a custom base URL.
    pub fn with_url(base_url: &str) -> Self {
        debug!(base_url = %base_url, "EventNotifier initialized with custom URL");
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            base_url: base_url.to_string(),
        }
    }

    /// Send an event to the server's ingest endpoint.
    ///
    /// Fire-and-forget: failures are logged, never returned. The server
    /// not running is a normal condition for producers.
    pub async fn send_event(&self, kind: EventKind, audience: Audience, payload: Value) {
        let url = format!("{}/internal/events", self.base_url);
        let body = serde_json::json!({
            "kind": kind,
            "audience": audience,
            "payload": payload,
        });

        debug!(url = %url, kind = %kind, "Sending event to Pulse server");

        match self.client.post(&url).json(&body).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!(kind = %kind, "Event accepted by Pulse server");
                } else {
                    warn!(
                        kind = %kind,
                        status_code = %response.status(),
                        "Pulse server rejected event"
                    );
                }
            }
            Err(e) => {
                // Expected when the Pulse server is not running.
                debug!(
                    kind = %kind,
                    error = %e,
                    url = %url,
                    "Failed to send event (Pulse server may not be running)"
                );
            }
        }
    }

    /// Notify that an announcement was created.
    pub async fn notify_announcement(&self, audience: Audience, payload: Value) {
        self.send_event(EventKind::AnnouncementCreated, audience, payload)
            .await;
    }

    /// Notify a user that one of their requests changed status.
    pub async fn notify_request_status(&self, user: UserId, request_id: &str, status: &str) {
        let payload = serde_json::json!({
            "request_id": request_id,
            "status": status,
        });
        self.send_event(
            EventKind::RequestStatusChanged,
            Audience::Users([user].into_iter().collect()),
            payload,
        )
        .await;
    }

    /// Notify a user that a chat message was posted to them.
    pub async fn notify_message(&self, user: UserId, payload: Value) {
        self.send_event(
            EventKind::MessagePosted,
            Audience::Users([user].into_iter().collect()),
            payload,
        )
        .await;
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}
