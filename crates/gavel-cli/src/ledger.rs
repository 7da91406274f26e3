//! File-backed local ledger.
//!
//! Rebuilds the governance engine, host balances and height from the
//! ledger file for each command, and writes them back after a successful
//! mutation. The store's exclusive lock is held for the lifetime of a
//! `LocalLedger`, so concurrent invocations apply one after another.

use gavel_governance::{BalanceBook, Governance, GovernanceConfig, HeightSource, ManualClock};
use gavel_storage::{LedgerFile, LedgerLock, LedgerStore};
use gavel_types::Address;

pub type Engine = Governance<BalanceBook, ManualClock>;

pub struct LocalLedger {
    store: LedgerStore,
    engine: Engine,
    _lock: LedgerLock,
}

impl LocalLedger {
    /// Create a new ledger file. Refuses to overwrite unless `force`.
    pub fn init(
        store: LedgerStore,
        owner: Address,
        treasury: Address,
        config: GovernanceConfig,
        force: bool,
    ) -> anyhow::Result<Self> {
        let lock = store.lock()?;
        if store.exists() && !force {
            anyhow::bail!(
                "Ledger already exists at '{}' (use --force to replace it)",
                store.path().display()
            );
        }
        let engine = Governance::new(owner, treasury, config, BalanceBook::new(), ManualClock::new(0))?;
        let ledger = Self {
            store,
            engine,
            _lock: lock,
        };
        ledger.save()?;
        Ok(ledger)
    }

    /// Open an existing ledger file.
    pub fn open(store: LedgerStore) -> anyhow::Result<Self> {
        let lock = store.lock()?;
        let file = store.load()?.ok_or_else(|| {
            anyhow::anyhow!(
                "No ledger at '{}'; run `gavel init` first",
                store.path().display()
            )
        })?;

        let funds = BalanceBook::from_balances(file.balances.into_iter().collect());
        let clock = ManualClock::new(file.height);
        let engine = Governance::restore(file.governance, funds, clock)?;
        Ok(Self {
            store,
            engine,
            _lock: lock,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Persist the current state.
    pub fn save(&self) -> anyhow::Result<()> {
        let file = LedgerFile {
            height: self.engine.clock().current_height(),
            balances: self.engine.funds().balances().into_iter().collect(),
            governance: self.engine.snapshot(),
        };
        self.store.save(&file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    const OWNER: Address = Address::from_bytes([0xAA; 20]);
    const TREASURY: Address = Address::from_bytes([0xEE; 20]);

    #[test]
    fn test_init_open_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));

        let ledger =
            LocalLedger::init(store.clone(), OWNER, TREASURY, GovernanceConfig::default(), false).unwrap();
        let alice = Address::from_bytes([1; 20]);
        ledger.engine().funds().mint(alice, 200_000_000).unwrap();
        ledger.engine().stake(alice, 100_000_000).unwrap();
        ledger.engine().clock().advance(3);
        ledger.save().unwrap();
        drop(ledger);

        let reopened = LocalLedger::open(store).unwrap();
        assert_eq!(reopened.engine().current_height(), 3);
        assert_eq!(reopened.engine().calculate_voting_power(&alice), 100_000_000);
        assert_eq!(reopened.engine().funds().balance_of(&TREASURY), 100_000_000);
        assert_eq!(reopened.engine().owner(), OWNER);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        LocalLedger::init(store.clone(), OWNER, TREASURY, GovernanceConfig::default(), false).unwrap();

        assert!(LocalLedger::init(store.clone(), OWNER, TREASURY, GovernanceConfig::default(), false).is_err());
        assert!(LocalLedger::init(store, OWNER, TREASURY, GovernanceConfig::default(), true).is_ok());
    }

    #[test]
    fn test_concurrent_opens_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let alice = Address::from_bytes([1; 20]);
        {
            let ledger =
                LocalLedger::init(store.clone(), OWNER, TREASURY, GovernanceConfig::default(), false).unwrap();
            ledger.engine().funds().mint(alice, 200_000_000).unwrap();
            ledger.save().unwrap();
        }

        let first = LocalLedger::open(store.clone()).unwrap();

        let opened = Arc::new(AtomicBool::new(false));
        let second = {
            let store = store.clone();
            let opened = opened.clone();
            thread::spawn(move || {
                let ledger = LocalLedger::open(store).unwrap();
                opened.store(true, Ordering::SeqCst);
                ledger.engine().update_minimum_stake(OWNER, 5).unwrap();
                ledger.save().unwrap();
            })
        };

        first.engine().stake(alice, 100_000_000).unwrap();
        first.save().unwrap();
        thread::sleep(Duration::from_millis(200));
        assert!(!opened.load(Ordering::SeqCst), "second open must wait for the first");
        drop(first);
        second.join().unwrap();

        let reopened = LocalLedger::open(store).unwrap();
        assert_eq!(reopened.engine().calculate_voting_power(&alice), 100_000_000);
        assert_eq!(reopened.engine().config().minimum_stake, 5);
    }

    #[test]
    fn test_open_missing_ledger() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        assert!(LocalLedger::open(store).is_err());
    }
}
