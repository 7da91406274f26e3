use gavel_types::{Address, Amount, BlockHeight};
use thiserror::Error;

use crate::transfer::TransferError;

/// Errors that can occur in governance operations.
///
/// Every variant is a typed rejection of a single operation; the ledger is
/// left exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Unauthorized: {0} is not the owner")]
    Unauthorized(Address),

    #[error("Withdrawal not allowed: {0}")]
    WithdrawalNotAllowed(WithdrawalDenial),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Invalid amount: {amount} is below the minimum stake {minimum}")]
    InvalidAmount { amount: Amount, minimum: Amount },

    #[error("Not a stakeholder: {0}")]
    NotStakeholder(Address),

    #[error("Proposal not active: {0}")]
    ProposalNotActive(u64),

    #[error("Proposal already finalized: {0}")]
    AlreadyFinalized(u64),

    #[error("Voting not yet expired: ends at {end}, current height {current}")]
    VotingNotYetExpired { end: BlockHeight, current: BlockHeight },

    #[error("Transfer failed: {0}")]
    TransferFailure(#[from] TransferError),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Recipient not allowed: {0}")]
    RecipientNotAllowed(Address),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Why an unstake was refused. Both causes surface as
/// [`GovernanceError::WithdrawalNotAllowed`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalDenial {
    #[error("requested {requested} exceeds staked {staked}")]
    ExceedsStake { requested: Amount, staked: Amount },

    #[error("stake locked until height {until} (current {current})")]
    Locked { until: BlockHeight, current: BlockHeight },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::InvalidAmount { amount: 5, minimum: 10 };
        assert!(err.to_string().contains("below the minimum"));
    }

    #[test]
    fn test_withdrawal_denial_display() {
        let err = GovernanceError::WithdrawalNotAllowed(WithdrawalDenial::Locked {
            until: 200,
            current: 150,
        });
        assert!(err.to_string().contains("200"));
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn test_transfer_error_conversion() {
        let err: GovernanceError = TransferError::InsufficientFunds {
            available: 1,
            requested: 2,
        }
        .into();
        assert!(matches!(err, GovernanceError::TransferFailure(_)));
    }
}
