//! Pulse Dispatch
//!
//! Live-channel registry and the event dispatcher: targeting
//! resolution, counter updates, and fan-out to every open connection.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use registry::{ChannelId, PushSender, SubscriptionRegistry, CHANNEL_BUFFER};
