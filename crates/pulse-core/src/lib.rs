//! Pulse Core Library
//!
//! Domain models and pure logic for the Pulse notification engine:
//! events, audiences, targeting resolution, and the push wire contract.

pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod notifier;
pub mod resolver;

pub use error::{PulseError, PulseResult, StoreError};
pub use event::{Audience, Event, EventId, EventKind, PushEnvelope};
pub use identity::{Role, UserId, UserIdentity};
