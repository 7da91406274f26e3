//! Gavel Storage - JSON file persistence for a local governance ledger.
//!
//! A ledger file holds the host state the engine depends on (balances and
//! block height) together with a full governance snapshot. Files are
//! written atomically and carry a blake3 checksum of the ledger body.
//! Writers hold an exclusive lock on a sibling `.lock` file from load
//! through save.

pub mod error;
pub mod ledger_store;

pub use error::StorageError;
pub use ledger_store::{LedgerFile, LedgerLock, LedgerStore, LEDGER_FORMAT_VERSION};
