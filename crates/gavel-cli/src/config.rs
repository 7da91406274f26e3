//! CLI configuration management.
//!
//! Handles the ledger location, logging and the parameters used when a new
//! ledger is initialised.

use std::path::{Path, PathBuf};

use gavel_governance::GovernanceConfig;
use gavel_types::Address;
use serde::{Deserialize, Serialize};

/// System pool used when none is configured.
pub const DEFAULT_TREASURY: Address = Address::from_bytes([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Ledger file
    pub ledger_path: PathBuf,
    /// Caller used when `--from` is omitted
    pub default_account: Option<String>,
    /// Tracing filter directive
    pub log_level: String,
    /// Emit logs as JSON
    pub json_logs: bool,
    /// Parameters applied by `gavel init`
    pub genesis: GenesisSettings,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            ledger_path: base_dir().join("ledger.json"),
            default_account: None,
            log_level: "warn".to_string(),
            json_logs: false,
            genesis: GenesisSettings::default(),
        }
    }
}

/// Deployment parameters. Integers are kept to 64 bits so they fit TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisSettings {
    /// Treasury pool address
    pub treasury: String,
    pub minimum_stake: u64,
    pub quorum_percentage: u8,
    pub voting_period: u64,
    pub stake_lock_duration: u64,
}

impl Default for GenesisSettings {
    fn default() -> Self {
        let defaults = GovernanceConfig::default();
        Self {
            treasury: DEFAULT_TREASURY.to_string(),
            minimum_stake: u64::try_from(defaults.minimum_stake).unwrap_or(u64::MAX),
            quorum_percentage: defaults.quorum_percentage,
            voting_period: defaults.voting_period,
            stake_lock_duration: defaults.stake_lock_duration,
        }
    }
}

impl GenesisSettings {
    /// Build the engine configuration.
    pub fn governance_config(&self) -> GovernanceConfig {
        GovernanceConfig {
            minimum_stake: u128::from(self.minimum_stake),
            quorum_percentage: self.quorum_percentage,
            voting_period: self.voting_period,
            stake_lock_duration: self.stake_lock_duration,
            ..GovernanceConfig::default()
        }
    }

    pub fn treasury_address(&self) -> anyhow::Result<Address> {
        self.treasury
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid treasury address '{}': {}", self.treasury, e))
    }
}

impl CliConfig {
    /// Load configuration from `path`, or from the default location.
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("Config file '{}' not found", config_path.display());
            }
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", config_path.display(), e)
        })?;
        let config: CliConfig = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", config_path.display(), e)
        })?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration file path.
    pub fn config_path() -> PathBuf {
        base_dir().join("config.toml")
    }
}

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gavel")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.log_level, "warn");
        assert!(config.ledger_path.ends_with("ledger.json"));
        assert_eq!(config.genesis.treasury_address().unwrap(), DEFAULT_TREASURY);
        assert_eq!(config.genesis.governance_config(), GovernanceConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CliConfig::default();
        config.genesis.quorum_percentage = 67;
        config.default_account = Some(DEFAULT_TREASURY.to_string());
        config.save(&path).unwrap();

        let loaded = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.genesis, config.genesis);
        assert_eq!(loaded.default_account, config.default_account);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"debug\"\n[genesis]\nvoting_period = 10\n").unwrap();

        let loaded = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.genesis.voting_period, 10);
        assert_eq!(loaded.genesis.quorum_percentage, 51);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
