//! Proposal lifecycle management.
//!
//! Proposals go through states: Active -> Executed | Rejected.
//! Identifiers are assigned 1..N and never reused.

use std::collections::BTreeMap;

use gavel_types::{Address, Amount, BlockHeight};
use serde::{Deserialize, Serialize};

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;
use crate::stake::StakeLedger;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Accepting votes until `end_height`, then awaiting execution
    Active,
    /// Passed and paid out
    Executed,
    /// Did not pass; no payout
    Rejected,
}

impl ProposalStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, ProposalStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Executed => "executed",
            ProposalStatus::Rejected => "rejected",
        }
    }
}

/// Treasury spending proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique proposal ID
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Creator
    pub proposer: Address,
    /// Requested transfer quantity
    pub amount: Amount,
    /// Transfer target
    pub recipient: Address,
    /// Height at creation; first height votes are accepted
    pub start_height: BlockHeight,
    /// First height votes are no longer accepted
    pub end_height: BlockHeight,
    /// Stake weight voting yes
    pub yes_votes: Amount,
    /// Stake weight voting no
    pub no_votes: Amount,
    pub status: ProposalStatus,
    /// Set exactly once, by execution
    pub executed: bool,
    /// Height at which the proposal was finalized
    pub finalized_at: Option<BlockHeight>,
}

impl Proposal {
    /// Whether votes are accepted at `current_height`.
    pub fn is_active(&self, current_height: BlockHeight) -> bool {
        self.status == ProposalStatus::Active
            && self.start_height <= current_height
            && current_height < self.end_height
    }

    /// Whether the voting window has closed.
    pub fn voting_expired(&self, current_height: BlockHeight) -> bool {
        current_height >= self.end_height
    }

    /// Total weight cast.
    pub fn total_votes(&self) -> Amount {
        self.yes_votes.saturating_add(self.no_votes)
    }
}

/// Caller-supplied proposal contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub amount: Amount,
    pub recipient: Address,
}

/// Proposal registry managing all proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: BTreeMap<u64, Proposal>,
    next_id: u64,
}

impl ProposalRegistry {
    /// Create a new registry.
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a new proposal and return its identifier.
    ///
    /// The proposer must hold at least `minimum_stake`. The voting window is
    /// fixed from the configured period at creation time.
    pub fn create(
        &mut self,
        stakes: &StakeLedger,
        config: &GovernanceConfig,
        proposer: Address,
        draft: ProposalDraft,
        current_height: BlockHeight,
    ) -> Result<u64, GovernanceError> {
        match stakes.get(&proposer) {
            Some(record) if record.amount >= config.minimum_stake => {}
            _ => return Err(GovernanceError::NotStakeholder(proposer)),
        }

        if draft.title.is_empty() {
            return Err(GovernanceError::InvalidProposal("title is empty".to_string()));
        }
        if draft.title.len() > config.max_title_len {
            return Err(GovernanceError::InvalidProposal(format!(
                "title is {} bytes, limit {}",
                draft.title.len(),
                config.max_title_len
            )));
        }
        if draft.description.len() > config.max_description_len {
            return Err(GovernanceError::InvalidProposal(format!(
                "description is {} bytes, limit {}",
                draft.description.len(),
                config.max_description_len
            )));
        }
        if draft.recipient.is_zero() {
            return Err(GovernanceError::InvalidProposal(
                "recipient is the zero address".to_string(),
            ));
        }
        if !config.recipient_allowlist.permits(&draft.recipient) {
            return Err(GovernanceError::RecipientNotAllowed(draft.recipient));
        }

        let end_height = current_height
            .checked_add(config.voting_period)
            .ok_or(GovernanceError::Overflow)?;
        let id = self.next_id;
        let next_id = id.checked_add(1).ok_or(GovernanceError::Overflow)?;

        let proposal = Proposal {
            id,
            title: draft.title,
            description: draft.description,
            proposer,
            amount: draft.amount,
            recipient: draft.recipient,
            start_height: current_height,
            end_height,
            yes_votes: 0,
            no_votes: 0,
            status: ProposalStatus::Active,
            executed: false,
            finalized_at: None,
        };

        self.proposals.insert(id, proposal);
        self.next_id = next_id;
        Ok(id)
    }

    /// Get a proposal.
    pub fn get(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// True iff the proposal exists, is active and `current_height` is
    /// inside `[start_height, end_height)`.
    pub fn is_active(&self, id: u64, current_height: BlockHeight) -> bool {
        self.get(id)
            .map(|p| p.is_active(current_height))
            .unwrap_or(false)
    }

    /// Add `weight` to the chosen tally.
    ///
    /// Performs no eligibility checks; the engine validates activity and
    /// voter uniqueness first. Fails without mutating on overflow.
    pub fn apply_vote(&mut self, id: u64, weight: Amount, choice: bool) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        let tally = if choice {
            &mut proposal.yes_votes
        } else {
            &mut proposal.no_votes
        };
        *tally = tally.checked_add(weight).ok_or(GovernanceError::Overflow)?;
        Ok(())
    }

    /// Close the proposal as executed (`passed`) or rejected.
    pub fn finalize(
        &mut self,
        id: u64,
        passed: bool,
        current_height: BlockHeight,
    ) -> Result<ProposalStatus, GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if proposal.executed {
            return Err(GovernanceError::AlreadyFinalized(id));
        }

        proposal.status = if passed {
            ProposalStatus::Executed
        } else {
            ProposalStatus::Rejected
        };
        proposal.executed = true;
        proposal.finalized_at = Some(current_height);
        Ok(proposal.status)
    }

    /// All proposals ordered by identifier.
    pub fn all(&self) -> Vec<&Proposal> {
        self.proposals.values().collect()
    }

    /// Get proposals by status.
    pub fn by_status(&self, status: ProposalStatus) -> Vec<&Proposal> {
        self.proposals
            .values()
            .filter(|p| p.status == status)
            .collect()
    }

    /// Number of proposals ever created.
    pub fn count(&self) -> u64 {
        self.next_id.saturating_sub(1)
    }

    /// Check the structural invariants of a deserialized registry.
    ///
    /// Ids start at 1, `next_id` is above every stored id, each entry is
    /// keyed by its own id, windows are non-empty and `executed` is set
    /// exactly when the status is final.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.next_id == 0 {
            return Err(GovernanceError::InvalidParameter(
                "next proposal id must be at least 1".to_string(),
            ));
        }
        if let Some(&max_id) = self.proposals.keys().next_back() {
            if max_id >= self.next_id {
                return Err(GovernanceError::InvalidParameter(format!(
                    "next proposal id {} does not exceed stored id {}",
                    self.next_id, max_id
                )));
            }
        }
        for (&key, proposal) in &self.proposals {
            if key == 0 || key != proposal.id {
                return Err(GovernanceError::InvalidParameter(format!(
                    "proposal stored under id {} claims id {}",
                    key, proposal.id
                )));
            }
            if proposal.end_height <= proposal.start_height {
                return Err(GovernanceError::InvalidParameter(format!(
                    "proposal {} has an empty voting window",
                    key
                )));
            }
            if proposal.executed != proposal.status.is_final() {
                return Err(GovernanceError::InvalidParameter(format!(
                    "proposal {} is {} but executed={}",
                    key,
                    proposal.status.as_str(),
                    proposal.executed
                )));
            }
        }
        Ok(())
    }
}

impl Default for ProposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}
