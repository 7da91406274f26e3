//! Governance engine.
//!
//! Orchestrates staking, proposal creation, voting and treasury execution.
//! All mutable state lives behind one lock that each public operation holds
//! for its full duration, so operations are serialized and either commit
//! completely or leave no trace.
//!
//! Operations that move funds validate first, call the [`FundTransfer`]
//! capability last, and only then commit local state.

use gavel_types::{Address, Amount, BlockHeight};
use num_bigint::BigUint;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::HeightSource;
use crate::config::{
    validate_quorum_percentage, validate_voting_period, GovernanceConfig, RecipientAllowlist,
};
use crate::error::GovernanceError;
use crate::event::GovernanceEvent;
use crate::proposal::{Proposal, ProposalDraft, ProposalRegistry, ProposalStatus};
use crate::stake::{StakeLedger, StakeRecord, StakeTerms};
use crate::transfer::FundTransfer;
use crate::vote::{VoteRecord, VoteTracker};

/// Result of executing a proposal whose voting window has closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Quorum met; `amount` was paid to `recipient`
    Executed { recipient: Address, amount: Amount },
    /// Quorum not met; nothing was paid
    Rejected,
}

impl ExecutionOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed { .. })
    }
}

/// Whether `yes` reaches `quorum_percentage` of all cast weight.
///
/// Exact integer comparison `yes * 100 >= (yes + no) * quorum`. No votes
/// at all never pass.
pub fn meets_quorum(yes: Amount, no: Amount, quorum_percentage: u8) -> bool {
    if yes == 0 && no == 0 {
        return false;
    }
    let yes_big = BigUint::from(yes);
    let total = &yes_big + BigUint::from(no);
    yes_big * 100u32 >= total * u32::from(quorum_percentage)
}

#[derive(Debug, Clone)]
struct GovernanceState {
    config: GovernanceConfig,
    stakes: StakeLedger,
    proposals: ProposalRegistry,
    votes: VoteTracker,
    events: Vec<GovernanceEvent>,
}

/// Serializable image of the whole governance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub owner: Address,
    pub treasury: Address,
    pub config: GovernanceConfig,
    pub stakes: StakeLedger,
    pub proposals: ProposalRegistry,
    pub votes: VoteTracker,
    #[serde(default)]
    pub events: Vec<GovernanceEvent>,
}

/// The governance engine.
///
/// `T` moves funds on the host ledger, `C` supplies the current height.
pub struct Governance<T, C> {
    owner: Address,
    treasury: Address,
    funds: T,
    clock: C,
    state: Mutex<GovernanceState>,
}

impl<T: FundTransfer, C: HeightSource> Governance<T, C> {
    /// Deploy a fresh engine.
    ///
    /// `owner` is the only caller allowed to change configuration;
    /// `treasury` is the system pool holding stakes and payouts.
    pub fn new(
        owner: Address,
        treasury: Address,
        config: GovernanceConfig,
        funds: T,
        clock: C,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        info!(
            owner = %owner,
            treasury = %treasury,
            quorum = config.quorum_percentage,
            "governance deployed"
        );
        Ok(Self {
            owner,
            treasury,
            funds,
            clock,
            state: Mutex::new(GovernanceState {
                config,
                stakes: StakeLedger::new(),
                proposals: ProposalRegistry::new(),
                votes: VoteTracker::new(),
                events: Vec::new(),
            }),
        })
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// Rejects snapshots whose config or proposal registry is inconsistent,
    /// so identifiers can never be reissued.
    pub fn restore(snapshot: GovernanceSnapshot, funds: T, clock: C) -> Result<Self, GovernanceError> {
        snapshot.config.validate()?;
        snapshot.proposals.validate()?;
        debug!(
            proposals = snapshot.proposals.count(),
            stakeholders = snapshot.stakes.len(),
            "restoring governance"
        );
        Ok(Self {
            owner: snapshot.owner,
            treasury: snapshot.treasury,
            funds,
            clock,
            state: Mutex::new(GovernanceState {
                config: snapshot.config,
                stakes: snapshot.stakes,
                proposals: snapshot.proposals,
                votes: snapshot.votes,
                events: snapshot.events,
            }),
        })
    }

    /// Capture the full state.
    pub fn snapshot(&self) -> GovernanceSnapshot {
        let state = self.state.lock();
        GovernanceSnapshot {
            owner: self.owner,
            treasury: self.treasury,
            config: state.config.clone(),
            stakes: state.stakes.clone(),
            proposals: state.proposals.clone(),
            votes: state.votes.clone(),
            events: state.events.clone(),
        }
    }

    // ----- Staking -----

    /// Lock `amount` of the participant's funds in the treasury pool.
    pub fn stake(&self, participant: Address, amount: Amount) -> Result<StakeRecord, GovernanceError> {
        let mut state = self.state.lock();
        let height = self.clock.current_height();
        let terms = StakeTerms {
            minimum_stake: state.config.minimum_stake,
            lock_duration: state.config.stake_lock_duration,
        };

        let record = state
            .stakes
            .stake(participant, amount, terms, height, &self.treasury, &self.funds)
            .map_err(|e| {
                if matches!(e, GovernanceError::TransferFailure(_)) {
                    warn!(participant = %participant, error = %e, "stake deposit failed");
                }
                e
            })?;

        info!(
            participant = %participant,
            amount,
            total = record.amount,
            lock_until = record.lock_until,
            "stake deposited"
        );
        state.events.push(GovernanceEvent::Staked {
            participant,
            amount,
            total: record.amount,
            lock_until: record.lock_until,
            height,
        });
        Ok(record)
    }

    /// Withdraw `amount` of unlocked stake back to the participant.
    pub fn unstake(&self, participant: Address, amount: Amount) -> Result<StakeRecord, GovernanceError> {
        let mut state = self.state.lock();
        let height = self.clock.current_height();

        let record = state
            .stakes
            .unstake(participant, amount, height, &self.treasury, &self.funds)
            .map_err(|e| {
                if matches!(e, GovernanceError::TransferFailure(_)) {
                    warn!(participant = %participant, error = %e, "stake withdrawal failed");
                }
                e
            })?;

        info!(
            participant = %participant,
            amount,
            remaining = record.amount,
            "stake withdrawn"
        );
        state.events.push(GovernanceEvent::Unstaked {
            participant,
            amount,
            remaining: record.amount,
            height,
        });
        Ok(record)
    }

    // ----- Proposals and voting -----

    /// Create a treasury spending proposal. Returns its identifier.
    pub fn create_proposal(&self, proposer: Address, draft: ProposalDraft) -> Result<u64, GovernanceError> {
        let mut state = self.state.lock();
        let height = self.clock.current_height();
        let state = &mut *state;

        let id = state
            .proposals
            .create(&state.stakes, &state.config, proposer, draft, height)?;

        let (amount, recipient, end_height) = match state.proposals.get(id) {
            Some(p) => (p.amount, p.recipient, p.end_height),
            None => return Err(GovernanceError::ProposalNotFound(id)),
        };

        info!(
            id,
            proposer = %proposer,
            amount,
            recipient = %recipient,
            end_height,
            "proposal created"
        );
        state.events.push(GovernanceEvent::ProposalCreated {
            id,
            proposer,
            amount,
            recipient,
            end_height,
            height,
        });
        Ok(id)
    }

    /// Cast a stake-weighted vote. Weight is the voter's stake right now.
    pub fn vote(&self, proposal_id: u64, voter: Address, choice: bool) -> Result<VoteRecord, GovernanceError> {
        let mut state = self.state.lock();
        let height = self.clock.current_height();

        if state.proposals.get(proposal_id).is_none() {
            return Err(GovernanceError::ProposalNotFound(proposal_id));
        }
        let weight = state
            .stakes
            .get(&voter)
            .map(|r| r.amount)
            .ok_or(GovernanceError::NotStakeholder(voter))?;
        if !state.proposals.is_active(proposal_id, height) {
            return Err(GovernanceError::ProposalNotActive(proposal_id));
        }
        if state.votes.has_voted(proposal_id, &voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        // Tally first: it is the only step that can still fail.
        state.proposals.apply_vote(proposal_id, weight, choice)?;
        let record = state
            .votes
            .record_vote(proposal_id, voter, choice, weight, height)?;

        info!(
            id = proposal_id,
            voter = %voter,
            choice,
            weight,
            "vote cast"
        );
        state.events.push(GovernanceEvent::VoteCast {
            id: proposal_id,
            voter,
            choice,
            weight,
            height,
        });
        Ok(record)
    }

    /// Close a proposal whose voting window has ended.
    ///
    /// A passing proposal pays out from the treasury; if that transfer
    /// fails nothing changes and the call can be retried. A failing
    /// proposal is marked rejected and still returns `Ok`.
    pub fn execute_proposal(&self, proposal_id: u64) -> Result<ExecutionOutcome, GovernanceError> {
        let mut state = self.state.lock();
        let height = self.clock.current_height();

        let proposal = state
            .proposals
            .get(proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))?;

        if proposal.executed {
            return Err(GovernanceError::AlreadyFinalized(proposal_id));
        }
        if !proposal.voting_expired(height) {
            return Err(GovernanceError::VotingNotYetExpired {
                end: proposal.end_height,
                current: height,
            });
        }

        let passed = meets_quorum(
            proposal.yes_votes,
            proposal.no_votes,
            state.config.quorum_percentage,
        );
        let (recipient, amount) = (proposal.recipient, proposal.amount);
        debug!(
            id = proposal_id,
            yes = proposal.yes_votes,
            no = proposal.no_votes,
            quorum = state.config.quorum_percentage,
            passed,
            "quorum evaluated"
        );

        if passed {
            if let Err(e) = self.funds.transfer(&self.treasury, &recipient, amount) {
                warn!(id = proposal_id, error = %e, "proposal payout failed");
                return Err(e.into());
            }
        }

        state.proposals.finalize(proposal_id, passed, height)?;

        if passed {
            info!(id = proposal_id, recipient = %recipient, amount, "proposal executed");
            state.events.push(GovernanceEvent::ProposalExecuted {
                id: proposal_id,
                recipient,
                amount,
                height,
            });
            Ok(ExecutionOutcome::Executed { recipient, amount })
        } else {
            info!(id = proposal_id, "proposal rejected");
            state.events.push(GovernanceEvent::ProposalRejected {
                id: proposal_id,
                height,
            });
            Ok(ExecutionOutcome::Rejected)
        }
    }

    // ----- Owner-only configuration -----

    pub fn update_minimum_stake(&self, caller: Address, value: Amount) -> Result<(), GovernanceError> {
        self.update_config(caller, "minimum_stake", value.to_string(), |config| {
            config.minimum_stake = value;
            Ok(())
        })
    }

    pub fn update_quorum_percentage(&self, caller: Address, value: u8) -> Result<(), GovernanceError> {
        self.update_config(caller, "quorum_percentage", value.to_string(), |config| {
            validate_quorum_percentage(value)?;
            config.quorum_percentage = value;
            Ok(())
        })
    }

    /// Applies to proposals created after the change.
    pub fn update_voting_period(&self, caller: Address, value: BlockHeight) -> Result<(), GovernanceError> {
        self.update_config(caller, "voting_period", value.to_string(), |config| {
            validate_voting_period(value)?;
            config.voting_period = value;
            Ok(())
        })
    }

    pub fn set_recipient_allowlist(
        &self,
        caller: Address,
        allowlist: RecipientAllowlist,
    ) -> Result<(), GovernanceError> {
        let description = match &allowlist {
            RecipientAllowlist::Open => "open".to_string(),
            RecipientAllowlist::Restricted(set) => format!("restricted({})", set.len()),
        };
        self.update_config(caller, "recipient_allowlist", description, |config| {
            config.recipient_allowlist = allowlist;
            Ok(())
        })
    }

    fn update_config<F>(
        &self,
        caller: Address,
        field: &str,
        value: String,
        apply: F,
    ) -> Result<(), GovernanceError>
    where
        F: FnOnce(&mut GovernanceConfig) -> Result<(), GovernanceError>,
    {
        if caller != self.owner {
            return Err(GovernanceError::Unauthorized(caller));
        }

        let mut state = self.state.lock();
        let height = self.clock.current_height();

        let mut config = state.config.clone();
        apply(&mut config)?;
        state.config = config;

        info!(field, value = %value, "config updated");
        state.events.push(GovernanceEvent::ConfigUpdated {
            field: field.to_string(),
            value,
            height,
        });
        Ok(())
    }

    // ----- Reads -----

    pub fn get_proposal(&self, id: u64) -> Option<Proposal> {
        self.state.lock().proposals.get(id).cloned()
    }

    pub fn get_stake(&self, participant: &Address) -> Option<StakeRecord> {
        self.state.lock().stakes.get(participant)
    }

    pub fn get_vote(&self, proposal_id: u64, voter: &Address) -> Option<VoteRecord> {
        self.state.lock().votes.get_vote(proposal_id, voter)
    }

    /// Current staked amount, zero if the participant never staked.
    pub fn calculate_voting_power(&self, participant: &Address) -> Amount {
        self.state.lock().stakes.voting_power(participant)
    }

    /// Whether `id` is accepting votes at the current height.
    pub fn is_active(&self, id: u64) -> bool {
        let state = self.state.lock();
        state.proposals.is_active(id, self.clock.current_height())
    }

    /// All proposals ordered by identifier.
    pub fn list_proposals(&self) -> Vec<Proposal> {
        self.state.lock().proposals.all().into_iter().cloned().collect()
    }

    pub fn proposals_with_status(&self, status: ProposalStatus) -> Vec<Proposal> {
        self.state
            .lock()
            .proposals
            .by_status(status)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.lock().proposals.count()
    }

    pub fn total_staked(&self) -> Amount {
        self.state.lock().stakes.total_staked()
    }

    pub fn votes_for(&self, proposal_id: u64) -> Vec<(Address, VoteRecord)> {
        self.state.lock().votes.votes_for(proposal_id)
    }

    pub fn config(&self) -> GovernanceConfig {
        self.state.lock().config.clone()
    }

    pub fn events(&self) -> Vec<GovernanceEvent> {
        self.state.lock().events.clone()
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn current_height(&self) -> BlockHeight {
        self.clock.current_height()
    }

    pub fn funds(&self) -> &T {
        &self.funds
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::transfer::BalanceBook;

    const OWNER: Address = Address::from_bytes([0xAA; 20]);
    const TREASURY: Address = Address::from_bytes([0xEE; 20]);

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn engine() -> Governance<BalanceBook, ManualClock> {
        let config = GovernanceConfig {
            minimum_stake: 100,
            voting_period: 10,
            stake_lock_duration: 20,
            ..GovernanceConfig::default()
        };
        Governance::new(OWNER, TREASURY, config, BalanceBook::new(), ManualClock::new(0)).unwrap()
    }

    #[test]
    fn test_quorum_boundaries() {
        assert!(meets_quorum(51, 49, 51));
        assert!(!meets_quorum(50, 50, 51));
        assert!(!meets_quorum(0, 0, 51));
        assert!(meets_quorum(1, 0, 100));
        assert!(!meets_quorum(99, 1, 100));
        assert!(meets_quorum(0, 5, 0));
    }

    #[test]
    fn test_quorum_large_values() {
        assert!(meets_quorum(Amount::MAX, Amount::MAX - 1, 50));
        assert!(!meets_quorum(Amount::MAX - 1, Amount::MAX, 50));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = GovernanceConfig {
            quorum_percentage: 150,
            ..GovernanceConfig::default()
        };
        assert!(Governance::new(OWNER, TREASURY, config, BalanceBook::new(), ManualClock::new(0)).is_err());
    }

    #[test]
    fn test_admin_requires_owner() {
        let gov = engine();
        assert_eq!(
            gov.update_minimum_stake(addr(1), 5),
            Err(GovernanceError::Unauthorized(addr(1)))
        );
        assert_eq!(gov.config().minimum_stake, 100);
        assert!(gov.events().is_empty());

        gov.update_minimum_stake(OWNER, 5).unwrap();
        assert_eq!(gov.config().minimum_stake, 5);
        assert_eq!(gov.events().len(), 1);
    }

    #[test]
    fn test_admin_validation() {
        let gov = engine();
        assert!(matches!(
            gov.update_quorum_percentage(OWNER, 101),
            Err(GovernanceError::InvalidParameter(_))
        ));
        assert!(gov.update_voting_period(OWNER, 0).is_err());
        assert_eq!(gov.config().quorum_percentage, 51);

        gov.update_quorum_percentage(OWNER, 67).unwrap();
        gov.update_voting_period(OWNER, 30).unwrap();
        assert_eq!(gov.config().quorum_percentage, 67);
        assert_eq!(gov.config().voting_period, 30);
    }

    #[test]
    fn test_voting_period_change_spares_existing_proposals() {
        let gov = engine();
        gov.funds().mint(addr(1), 1_000).unwrap();
        gov.stake(addr(1), 100).unwrap();

        let draft = ProposalDraft {
            title: "First".to_string(),
            description: String::new(),
            amount: 1,
            recipient: addr(9),
        };
        let first = gov.create_proposal(addr(1), draft.clone()).unwrap();
        gov.update_voting_period(OWNER, 50).unwrap();
        let second = gov.create_proposal(addr(1), draft).unwrap();

        assert_eq!(gov.get_proposal(first).unwrap().end_height, 10);
        assert_eq!(gov.get_proposal(second).unwrap().end_height, 50);
    }

    #[test]
    fn test_allowlist_setter() {
        let gov = engine();
        let allowlist = RecipientAllowlist::Restricted([addr(9)].into_iter().collect());
        assert!(gov.set_recipient_allowlist(addr(1), allowlist.clone()).is_err());
        gov.set_recipient_allowlist(OWNER, allowlist.clone()).unwrap();
        assert_eq!(gov.config().recipient_allowlist, allowlist);
    }

    #[test]
    fn test_zero_stake_record_votes_with_zero_weight() {
        let gov = engine();
        gov.funds().mint(addr(1), 1_000).unwrap();
        gov.funds().mint(addr(2), 1_000).unwrap();
        gov.stake(addr(1), 100).unwrap();
        gov.stake(addr(2), 100).unwrap();
        gov.clock().advance(20);
        gov.unstake(addr(2), 100).unwrap();

        let id = gov
            .create_proposal(
                addr(1),
                ProposalDraft {
                    title: "T".to_string(),
                    description: String::new(),
                    amount: 1,
                    recipient: addr(9),
                },
            )
            .unwrap();

        let record = gov.vote(id, addr(2), true).unwrap();
        assert_eq!(record.weight, 0);
        assert_eq!(gov.get_proposal(id).unwrap().yes_votes, 0);
    }

    #[test]
    fn test_snapshot_restore_keeps_id_sequence() {
        let gov = engine();
        gov.funds().mint(addr(1), 1_000).unwrap();
        gov.stake(addr(1), 100).unwrap();
        let draft = ProposalDraft {
            title: "T".to_string(),
            description: String::new(),
            amount: 1,
            recipient: addr(9),
        };
        gov.create_proposal(addr(1), draft.clone()).unwrap();

        let snapshot = gov.snapshot();
        let funds = BalanceBook::from_balances(gov.funds().balances());
        let restored = Governance::restore(snapshot.clone(), funds, ManualClock::new(0)).unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.create_proposal(addr(1), draft).unwrap(), 2);
    }

    #[test]
    fn test_restore_rejects_reused_ids() {
        let gov = engine();
        gov.funds().mint(addr(1), 1_000).unwrap();
        gov.stake(addr(1), 100).unwrap();
        let draft = ProposalDraft {
            title: "Original".to_string(),
            description: String::new(),
            amount: 1,
            recipient: addr(9),
        };
        gov.create_proposal(addr(1), draft).unwrap();

        for next_id in [0u64, 1] {
            let mut json = serde_json::to_value(gov.snapshot()).unwrap();
            json["proposals"]["next_id"] = serde_json::json!(next_id);
            let edited: GovernanceSnapshot = serde_json::from_value(json).unwrap();

            let funds = BalanceBook::from_balances(gov.funds().balances());
            let result = Governance::restore(edited, funds, ManualClock::new(0));
            assert!(matches!(result, Err(GovernanceError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_snapshot_json() {
        let gov = engine();
        gov.funds().mint(addr(1), 1_000).unwrap();
        gov.stake(addr(1), 100).unwrap();
        let snapshot = gov.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: GovernanceSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
