//! Gavel Governance - Stake-weighted governance ledger.
//!
//! This crate provides:
//! - Stake ledger with time-locked deposits
//! - Proposal lifecycle management
//! - One-vote-per-voter tracking
//! - Quorum-gated treasury execution
//!
//! The [`Governance`] engine is the only entry point that mutates state.
//! It serializes every operation behind a single lock and talks to the
//! host ledger through the [`HeightSource`] and [`FundTransfer`] seams.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod proposal;
pub mod stake;
pub mod transfer;
pub mod vote;

pub use clock::{HeightSource, ManualClock};
pub use config::{GovernanceConfig, RecipientAllowlist};
pub use engine::{ExecutionOutcome, Governance, GovernanceSnapshot};
pub use error::{GovernanceError, WithdrawalDenial};
pub use event::GovernanceEvent;
pub use proposal::{Proposal, ProposalRegistry, ProposalStatus};
pub use stake::{StakeLedger, StakeRecord};
pub use transfer::{BalanceBook, FundTransfer, TransferError};
pub use vote::{VoteRecord, VoteTracker};
