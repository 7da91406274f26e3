//! Vote tracking.
//!
//! At most one immutable record per (proposal, voter) pair. The existence
//! of a record is what marks a voter as having voted.

use std::collections::BTreeMap;

use gavel_types::{Address, Amount, BlockHeight};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// A cast vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Always true once a record exists
    pub voted: bool,
    /// true = yes, false = no
    pub choice: bool,
    /// Stake weight applied to the tally
    pub weight: Amount,
    /// Height the vote was cast at
    pub cast_at: BlockHeight,
}

/// Votes keyed by proposal, then voter.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTracker {
    votes: BTreeMap<u64, BTreeMap<Address, VoteRecord>>,
}

impl VoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote. Fails `AlreadyVoted` if one exists for the pair.
    pub fn record_vote(
        &mut self,
        proposal_id: u64,
        voter: Address,
        choice: bool,
        weight: Amount,
        cast_at: BlockHeight,
    ) -> Result<VoteRecord, GovernanceError> {
        let ballots = self.votes.entry(proposal_id).or_default();
        if ballots.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        let record = VoteRecord {
            voted: true,
            choice,
            weight,
            cast_at,
        };
        ballots.insert(voter, record);
        Ok(record)
    }

    /// Look up a vote.
    pub fn get_vote(&self, proposal_id: u64, voter: &Address) -> Option<VoteRecord> {
        self.votes
            .get(&proposal_id)
            .and_then(|ballots| ballots.get(voter))
            .copied()
    }

    pub fn has_voted(&self, proposal_id: u64, voter: &Address) -> bool {
        self.get_vote(proposal_id, voter).is_some()
    }

    /// All votes cast on a proposal, ordered by voter.
    pub fn votes_for(&self, proposal_id: u64) -> Vec<(Address, VoteRecord)> {
        self.votes
            .get(&proposal_id)
            .map(|ballots| ballots.iter().map(|(a, r)| (*a, *r)).collect())
            .unwrap_or_default()
    }
}
