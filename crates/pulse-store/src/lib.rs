//! Pulse Reconciliation Store
//!
//! Owns per-user unread counters and read markers. The only writer of
//! counter state; everything else (dispatch, the pull API) goes through
//! the atomic operations defined here.

pub mod directory;
pub mod source;
pub mod store;

pub use directory::{StaticDirectory, UserDirectory};
pub use source::{AuthoritativeSource, InMemorySource};
pub use store::ReconciliationStore;
