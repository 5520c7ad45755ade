//! Event domain model and the push wire contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::error::{PulseError, PulseResult};
use crate::identity::{Role, UserId};

/// Unique event identifier, used purely for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Recognized event kinds. An unrecognized kind fails deserialization at
/// the ingest boundary, so it can never reach the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    AnnouncementCreated,
    RequestStatusChanged,
    MessagePosted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnnouncementCreated => "AnnouncementCreated",
            Self::RequestStatusChanged => "RequestStatusChanged",
            Self::MessagePosted => "MessagePosted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The targeting rule attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Audience {
    /// Every known user.
    All,
    /// Users holding any of these roles.
    Roles(HashSet<Role>),
    /// A specific set of users.
    Users(HashSet<UserId>),
}

/// A domain event. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub audience: Audience,
    #[serde(default)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, audience: Audience, payload: Value) -> Self {
        Self {
            id: EventId::new(),
            kind,
            audience,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Reject events that could never have a recipient. An empty target
    /// set is a producer bug, not something to deliver to nobody.
    pub fn validate(&self) -> PulseResult<()> {
        match &self.audience {
            Audience::All => Ok(()),
            Audience::Roles(roles) if roles.is_empty() => {
                Err(PulseError::invalid_event("roles audience is empty"))
            }
            Audience::Users(users) if users.is_empty() => {
                Err(PulseError::invalid_event("users audience is empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Wire shape of a push message: `{"type": <kind>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: Value,
}

impl PushEnvelope {
    pub fn from_event(event: &Event) -> Self {
        Self {
            kind: event.kind,
            data: event.payload.clone(),
        }
    }
}
