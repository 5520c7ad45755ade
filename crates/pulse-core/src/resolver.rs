//! Targeting resolution.
//!
//! A pure predicate so that retried dispatch attempts always produce
//! identical targeting decisions.

use crate::event::Audience;
use crate::identity::UserIdentity;

/// Decide whether an event with the given audience is relevant to a user.
pub fn resolve(audience: &Audience, user: &UserIdentity) -> bool {
    match audience {
        Audience::All => true,
        Audience::Roles(roles) => roles.contains(&user.role),
        Audience::Users(users) => users.contains(&user.id),
    }
}
