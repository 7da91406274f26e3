//! Gavel Types - Core type definitions shared across the Gavel workspace.
//!
//! This crate provides:
//! - Addresses (20-byte opaque principals, Bech32m encoded)
//! - Amount and block height aliases
//! - Type-level errors

pub mod address;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use error::TypesError;

/// Quantity of the host ledger's fungible unit.
pub type Amount = u128;

/// Point on the host's monotonic block counter.
pub type BlockHeight = u64;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Amount, BlockHeight, TypesError};
}
