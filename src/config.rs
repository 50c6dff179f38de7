//! Node configuration

use crate::crypto::pow::ProofOfWorkConfig;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Node configuration. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address the node serves requests on
    pub listen_addr: String,

    /// Leading hex zeros required by the puzzle
    pub difficulty: u32,

    /// Amount credited to the miner for each block
    pub reward: u64,

    /// Sender recorded on reward transactions
    pub reward_sender: String,

    /// Owner given to newly issued tickets
    pub default_ticket_owner: String,

    /// Upper bound for one peer chain fetch, in milliseconds
    pub peer_timeout_ms: u64,

    /// Reject issuing a tracker that already exists
    pub unique_trackers: bool,

    /// Peers registered at startup
    pub peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: crate::DEFAULT_LISTEN_ADDR.to_string(),
            difficulty: crate::DEFAULT_DIFFICULTY,
            reward: crate::DEFAULT_REWARD,
            reward_sender: "system".to_string(),
            default_ticket_owner: "Company".to_string(),
            peer_timeout_ms: 5_000,
            unique_trackers: false,
            peers: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the node cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.difficulty == 0 || self.difficulty > 64 {
            return Err(LedgerError::config("difficulty must be between 1 and 64"));
        }
        if self.reward_sender.is_empty() {
            return Err(LedgerError::config("reward_sender must not be empty"));
        }
        if self.peer_timeout_ms == 0 {
            return Err(LedgerError::config("peer_timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn pow_config(&self) -> ProofOfWorkConfig {
        ProofOfWorkConfig {
            difficulty: self.difficulty,
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.reward, 1);
        assert_eq!(config.default_ticket_owner, "Company");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            difficulty = 3
            peers = ["http://127.0.0.1:5001"]
            "#,
        )
        .unwrap();
        assert_eq!(config.difficulty, 3);
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.reward_sender, "system");
    }

    #[test]
    fn test_rejects_zero_difficulty() {
        assert!(matches!(
            NodeConfig::from_toml_str("difficulty = 0"),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_addr = \"0.0.0.0:7000\"").unwrap();
        writeln!(file, "unique_trackers = true").unwrap();

        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:7000");
        assert!(config.unique_trackers);
    }
}
