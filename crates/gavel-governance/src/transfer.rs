//! Fund transfer seam.
//!
//! Stake deposits, withdrawals and proposal payouts all move funds through
//! a [`FundTransfer`] implementation supplied by the host. The engine treats
//! it as a fallible dependency and calls it as the last step before
//! committing local state.

use std::collections::HashMap;

use gavel_types::{Address, Amount};
use parking_lot::Mutex;
use thiserror::Error;

/// Reasons a host transfer can be declined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Amount, requested: Amount },

    #[error("Invalid destination: {0}")]
    InvalidDestination(Address),

    #[error("Balance overflow")]
    Overflow,

    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

/// Host capability that moves funds between principals, including the
/// system-controlled treasury pool.
pub trait FundTransfer: Send + Sync {
    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError>;
}

impl<T: FundTransfer + ?Sized> FundTransfer for std::sync::Arc<T> {
    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError> {
        (**self).transfer(from, to, amount)
    }
}

/// In-memory host balances.
///
/// Used by the CLI's file-backed ledger and by tests. Transfers are
/// all-or-nothing: on error no balance changes.
#[derive(Debug, Default)]
pub struct BalanceBook {
    balances: Mutex<HashMap<Address, Amount>>,
}

impl BalanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_balances(balances: HashMap<Address, Amount>) -> Self {
        Self {
            balances: Mutex::new(balances),
        }
    }

    /// Credit `amount` out of thin air. Host-side faucet.
    pub fn mint(&self, to: Address, amount: Amount) -> Result<Amount, TransferError> {
        let mut balances = self.balances.lock();
        let entry = balances.entry(to).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(TransferError::Overflow)?;
        Ok(*entry)
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances.lock().get(address).copied().unwrap_or(0)
    }

    /// Copy of all non-zero balances.
    pub fn balances(&self) -> HashMap<Address, Amount> {
        self.balances
            .lock()
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(address, amount)| (*address, *amount))
            .collect()
    }
}

impl FundTransfer for BalanceBook {
    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError> {
        if to.is_zero() {
            return Err(TransferError::InvalidDestination(*to));
        }

        let mut balances = self.balances.lock();

        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        balances.insert(*from, available - amount);
        balances.insert(*to, credited);
        Ok(())
    }
}
