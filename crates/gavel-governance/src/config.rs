//! Governance configuration.
//!
//! Initialized with defaults at deployment and mutated only through the
//! owner-gated setters on [`crate::Governance`]. Voting period changes apply
//! to proposals created afterwards; existing proposals keep their window.

use std::collections::BTreeSet;

use gavel_types::{Address, Amount, BlockHeight};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Default minimum stake (also the proposal eligibility floor).
pub const DEFAULT_MINIMUM_STAKE: Amount = 100_000_000;
/// Default yes-share threshold, in percent.
pub const DEFAULT_QUORUM_PERCENTAGE: u8 = 51;
/// Default voting window (~1 day at 10 minute blocks).
pub const DEFAULT_VOTING_PERIOD: BlockHeight = 144;
/// Default stake lock (~10 days at 10 minute blocks).
pub const DEFAULT_STAKE_LOCK_DURATION: BlockHeight = 1_440;
pub const DEFAULT_MAX_TITLE_LEN: usize = 256;
pub const DEFAULT_MAX_DESCRIPTION_LEN: usize = 4_096;

/// Which recipients a proposal may pay out to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "recipients", rename_all = "snake_case")]
pub enum RecipientAllowlist {
    /// Any well-formed address
    #[default]
    Open,
    /// Only the listed addresses
    Restricted(BTreeSet<Address>),
}

impl RecipientAllowlist {
    pub fn permits(&self, recipient: &Address) -> bool {
        match self {
            RecipientAllowlist::Open => true,
            RecipientAllowlist::Restricted(set) => set.contains(recipient),
        }
    }
}

/// Process-wide governance parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Floor for a single stake deposit and for proposal eligibility
    pub minimum_stake: Amount,
    /// Required yes share of all cast weight (0..=100)
    pub quorum_percentage: u8,
    /// Voting window applied to new proposals, in blocks
    pub voting_period: BlockHeight,
    /// Lock applied from the height of every stake deposit, in blocks
    pub stake_lock_duration: BlockHeight,
    /// Maximum title length in bytes
    pub max_title_len: usize,
    /// Maximum description length in bytes
    pub max_description_len: usize,
    /// Payout recipient restriction
    pub recipient_allowlist: RecipientAllowlist,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            minimum_stake: DEFAULT_MINIMUM_STAKE,
            quorum_percentage: DEFAULT_QUORUM_PERCENTAGE,
            voting_period: DEFAULT_VOTING_PERIOD,
            stake_lock_duration: DEFAULT_STAKE_LOCK_DURATION,
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            max_description_len: DEFAULT_MAX_DESCRIPTION_LEN,
            recipient_allowlist: RecipientAllowlist::Open,
        }
    }
}

impl GovernanceConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        validate_quorum_percentage(self.quorum_percentage)?;
        validate_voting_period(self.voting_period)?;
        Ok(())
    }
}

pub(crate) fn validate_quorum_percentage(value: u8) -> Result<(), GovernanceError> {
    if value > 100 {
        return Err(GovernanceError::InvalidParameter(format!(
            "quorum percentage {} exceeds 100",
            value
        )));
    }
    Ok(())
}

pub(crate) fn validate_voting_period(value: BlockHeight) -> Result<(), GovernanceError> {
    if value == 0 {
        return Err(GovernanceError::InvalidParameter(
            "voting period must be at least one block".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GovernanceConfig::default();
        assert_eq!(config.minimum_stake, 100_000_000);
        assert_eq!(config.quorum_percentage, 51);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GovernanceConfig::default();
        config.quorum_percentage = 101;
        assert!(matches!(config.validate(), Err(GovernanceError::InvalidParameter(_))));

        let mut config = GovernanceConfig::default();
        config.voting_period = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allowlist_permits() {
        let allowed = Address::from_bytes([1u8; 20]);
        let other = Address::from_bytes([2u8; 20]);

        assert!(RecipientAllowlist::Open.permits(&other));

        let restricted = RecipientAllowlist::Restricted([allowed].into_iter().collect());
        assert!(restricted.permits(&allowed));
        assert!(!restricted.permits(&other));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GovernanceConfig =
            serde_json::from_str(r#"{"quorum_percentage": 67}"#).unwrap();
        assert_eq!(config.quorum_percentage, 67);
        assert_eq!(config.voting_period, DEFAULT_VOTING_PERIOD);
        assert_eq!(config.recipient_allowlist, RecipientAllowlist::Open);
    }
}
