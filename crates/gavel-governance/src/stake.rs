//! Stake ledger.
//!
//! Tracks each participant's locked balance and unlock height. A record is
//! created on first deposit and never removed; a zero balance is a valid
//! terminal state.

use std::collections::BTreeMap;

use gavel_types::{Address, Amount, BlockHeight};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, WithdrawalDenial};
use crate::transfer::FundTransfer;

/// A participant's stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Locked balance
    pub amount: Amount,
    /// First height at which withdrawal is allowed
    pub lock_until: BlockHeight,
}

impl StakeRecord {
    pub fn is_locked(&self, current_height: BlockHeight) -> bool {
        current_height < self.lock_until
    }
}

/// Terms applied to a deposit.
#[derive(Debug, Clone, Copy)]
pub struct StakeTerms {
    pub minimum_stake: Amount,
    pub lock_duration: BlockHeight,
}

/// Stake ledger keyed by participant.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeLedger {
    stakes: BTreeMap<Address, StakeRecord>,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit `amount` from the participant's host balance into `pool`.
    ///
    /// The minimum applies to this deposit alone, not the resulting total.
    /// Every deposit resets the lock to `current_height + lock_duration`.
    pub fn stake<T: FundTransfer>(
        &mut self,
        participant: Address,
        amount: Amount,
        terms: StakeTerms,
        current_height: BlockHeight,
        pool: &Address,
        funds: &T,
    ) -> Result<StakeRecord, GovernanceError> {
        if amount < terms.minimum_stake {
            return Err(GovernanceError::InvalidAmount {
                amount,
                minimum: terms.minimum_stake,
            });
        }

        let current = self.get(&participant).map(|r| r.amount).unwrap_or(0);
        let updated = StakeRecord {
            amount: current.checked_add(amount).ok_or(GovernanceError::Overflow)?,
            lock_until: current_height.saturating_add(terms.lock_duration),
        };

        funds.transfer(&participant, pool, amount)?;

        self.stakes.insert(participant, updated);
        Ok(updated)
    }

    /// Withdraw `amount` from `pool` back to the participant.
    ///
    /// Leaves `lock_until` untouched.
    pub fn unstake<T: FundTransfer>(
        &mut self,
        participant: Address,
        amount: Amount,
        current_height: BlockHeight,
        pool: &Address,
        funds: &T,
    ) -> Result<StakeRecord, GovernanceError> {
        let record = self
            .get(&participant)
            .ok_or(GovernanceError::NotStakeholder(participant))?;

        if amount > record.amount {
            return Err(GovernanceError::WithdrawalNotAllowed(
                WithdrawalDenial::ExceedsStake {
                    requested: amount,
                    staked: record.amount,
                },
            ));
        }
        if record.is_locked(current_height) {
            return Err(GovernanceError::WithdrawalNotAllowed(WithdrawalDenial::Locked {
                until: record.lock_until,
                current: current_height,
            }));
        }

        funds.transfer(pool, &participant, amount)?;

        let updated = StakeRecord {
            amount: record.amount - amount,
            lock_until: record.lock_until,
        };
        self.stakes.insert(participant, updated);
        Ok(updated)
    }

    /// Get a participant's stake record.
    pub fn get(&self, participant: &Address) -> Option<StakeRecord> {
        self.stakes.get(participant).copied()
    }

    /// Voting weight: the live staked amount, zero without a record.
    pub fn voting_power(&self, participant: &Address) -> Amount {
        self.get(participant).map(|r| r.amount).unwrap_or(0)
    }

    /// Sum of all staked balances.
    pub fn total_staked(&self) -> Amount {
        self.stakes
            .values()
            .fold(0, |acc: Amount, r| acc.saturating_add(r.amount))
    }

    /// Number of participants that ever staked.
    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &StakeRecord)> {
        self.stakes.iter()
    }
}
