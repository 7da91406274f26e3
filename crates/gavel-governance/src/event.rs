//! Journal of committed governance mutations.

use gavel_types::{Address, Amount, BlockHeight};
use serde::{Deserialize, Serialize};

/// One committed state change. Rejected operations never produce events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceEvent {
    Staked {
        participant: Address,
        amount: Amount,
        total: Amount,
        lock_until: BlockHeight,
        height: BlockHeight,
    },
    Unstaked {
        participant: Address,
        amount: Amount,
        remaining: Amount,
        height: BlockHeight,
    },
    ProposalCreated {
        id: u64,
        proposer: Address,
        amount: Amount,
        recipient: Address,
        end_height: BlockHeight,
        height: BlockHeight,
    },
    VoteCast {
        id: u64,
        voter: Address,
        choice: bool,
        weight: Amount,
        height: BlockHeight,
    },
    ProposalExecuted {
        id: u64,
        recipient: Address,
        amount: Amount,
        height: BlockHeight,
    },
    ProposalRejected {
        id: u64,
        height: BlockHeight,
    },
    ConfigUpdated {
        field: String,
        value: String,
        height: BlockHeight,
    },
}

impl GovernanceEvent {
    /// Height the event was committed at.
    pub fn height(&self) -> BlockHeight {
        match self {
            GovernanceEvent::Staked { height, .. }
            | GovernanceEvent::Unstaked { height, .. }
            | GovernanceEvent::ProposalCreated { height, .. }
            | GovernanceEvent::VoteCast { height, .. }
            | GovernanceEvent::ProposalExecuted { height, .. }
            | GovernanceEvent::ProposalRejected { height, .. }
            | GovernanceEvent::ConfigUpdated { height, .. } => *height,
        }
    }

    /// Short label.
    pub fn kind(&self) -> &'static str {
        match self {
            GovernanceEvent::Staked { .. } => "staked",
            GovernanceEvent::Unstaked { .. } => "unstaked",
            GovernanceEvent::ProposalCreated { .. } => "proposal_created",
            GovernanceEvent::VoteCast { .. } => "vote_cast",
            GovernanceEvent::ProposalExecuted { .. } => "proposal_executed",
            GovernanceEvent::ProposalRejected { .. } => "proposal_rejected",
            GovernanceEvent::ConfigUpdated { .. } => "config_updated",
        }
    }
}
