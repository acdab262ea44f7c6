//! Node configuration.
//!
//! Handles loading and validation of node configuration from TOML files and
//! command-line overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use quadvote_types::{Address, Credits};
use tracing_subscriber::EnvFilter;

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name
    pub name: String,
    /// Privileged account (Bech32m "qv1..." or "0x..." hex)
    pub owner: String,
    /// Data directory for the state snapshot
    pub data_dir: PathBuf,
    /// Persist a snapshot after every successful mutation
    pub persist: bool,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Credits minted by the owner when starting without a snapshot
    pub genesis: Vec<GenesisMint>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "quadvote-node".to_string(),
            owner: Address::from_seed(b"quadvote-dev-owner").to_string(),
            data_dir: PathBuf::from("./data"),
            persist: true,
            logging: LoggingConfig::default(),
            genesis: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.owner_address()?;
        self.genesis_mints()?;

        if EnvFilter::try_new(&self.logging.level).is_err() {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        Ok(())
    }

    /// Parsed owner address.
    pub fn owner_address(&self) -> anyhow::Result<Address> {
        Address::from_str(&self.owner)
            .map_err(|e| anyhow::anyhow!("Invalid owner address '{}': {}", self.owner, e))
    }

    /// Parsed genesis allocations.
    pub fn genesis_mints(&self) -> anyhow::Result<Vec<(Address, Credits)>> {
        self.genesis
            .iter()
            .map(|mint| {
                let account = Address::from_str(&mint.account).map_err(|e| {
                    anyhow::anyhow!("Invalid genesis account '{}': {}", mint.account, e)
                })?;
                Ok((account, Credits::from(mint.credits)))
            })
            .collect()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "quadvote_governance=debug"
    pub level: String,
    /// Emit JSON log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// One genesis allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisMint {
    pub account: String,
    pub credits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.name, "quadvote-node");
        assert!(config.persist);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let owner = format!("0x{}", "aa".repeat(20));
        let toml = format!(
            r#"
owner = "{owner}"

[logging]
json = true

[[genesis]]
account = "0x{acct}"
credits = 100
"#,
            owner = owner,
            acct = "01".repeat(20),
        );
        let config: NodeConfig = toml::from_str(&toml).unwrap();

        assert_eq!(config.owner_address().unwrap(), Address::from_bytes([0xaa; 20]));
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json);
        assert_eq!(
            config.genesis_mints().unwrap(),
            vec![(Address::from_bytes([1u8; 20]), Credits::new(100))]
        );
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quadvote.toml");

        let mut config = NodeConfig::default();
        config.genesis.push(GenesisMint {
            account: Address::from_seed(b"alice").to_string(),
            credits: 100,
        });
        config.to_file(&path).unwrap();

        assert_eq!(NodeConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = NodeConfig::default();
        config.owner = "nobody".to_string();
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.genesis.push(GenesisMint { account: "0x12".to_string(), credits: 1 });
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.logging.level = "quadvote=notalevel".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(NodeConfig::from_file(Path::new("/nonexistent/quadvote.toml")).is_err());
    }
}
