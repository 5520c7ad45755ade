//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PulseError, PulseResult};
use crate::identity::UserIdentity;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3040
}

fn default_retention() -> usize {
    1024
}

/// A roster entry mapping a user id to its role. `Roles` and `All`
/// audiences resolve against this roster, so it must list every user
/// that should receive role-targeted events while offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub role: String,
}

/// Pulse server configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-user bound on retained dedup entries; oldest are evicted first.
    #[serde(default = "default_retention")]
    pub dedup_retention: usize,

    #[serde(default)]
    pub users: Vec<RosterEntry>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dedup_retention: default_retention(),
            users: Vec::new(),
        }
    }
}

impl PulseConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> PulseResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| PulseError::config(e.to_string()))
    }

    /// The roster as resolved identities.
    pub fn roster(&self) -> Vec<UserIdentity> {
        self.users
            .iter()
            .map(|entry| UserIdentity::new(entry.id.clone(), entry.role.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: PulseConfig = toml::from_str("").unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3040);
        assert_eq!(config.dedup_retention, 1024);
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_roster_parsing() {
        let config: PulseConfig = toml::from_str(
            r#"
            port = 8080

            [[users]]
            id = "alice"
            role = "admin"

            [[users]]
            id = "bob"
            role = "student"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        let roster = config.roster();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].role.as_str(), "admin");
    }
}
