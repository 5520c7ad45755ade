//! Centralized error types for Pulse.

use thiserror::Error;

/// Main error type for Pulse operations.
#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Pulse operations.
pub type PulseResult<T> = Result<T, PulseError>;

impl PulseError {
    /// Create an invalid-event error.
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Errors surfaced by the reconciliation store and its durable boundary.
///
/// The in-memory engine never fails, but every operation returns a
/// `Result` so a durable backing can report unavailability loudly
/// instead of silently losing an increment.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Reconciliation store unavailable: {0}")]
    Unavailable(String),

    #[error("Authoritative source error: {0}")]
    Source(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
