//! Route handlers.

pub mod internal;
pub mod unread;
