//! Ledger file store.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use gavel_governance::GovernanceSnapshot;
use gavel_types::{Address, Amount, BlockHeight};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Current on-disk format.
pub const LEDGER_FORMAT_VERSION: u32 = 1;

/// Everything needed to rebuild a local ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFile {
    /// Host block height
    pub height: BlockHeight,
    /// Host balances, including the treasury pool
    pub balances: BTreeMap<Address, Amount>,
    /// Governance state
    pub governance: GovernanceSnapshot,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    ledger: LedgerFile,
}

fn checksum(ledger: &LedgerFile) -> Result<String, StorageError> {
    let body = serde_json::to_vec(ledger)?;
    Ok(hex::encode(blake3::hash(&body).as_bytes()))
}

/// Exclusive hold on a ledger's lock file. Released on drop.
#[derive(Debug)]
pub struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl LedgerLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release {}: {}", self.path.display(), e);
        }
    }
}

/// Reads and writes a single ledger file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Sibling file used for locking, so the ledger itself can be replaced
    /// by rename while the lock is held.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Block until this process holds the exclusive lock.
    pub fn lock(&self) -> Result<LedgerLock, StorageError> {
        let file = self.open_lock_file()?;
        file.lock_exclusive()?;
        tracing::debug!("Locked {}", self.path.display());
        Ok(LedgerLock {
            file,
            path: self.lock_path(),
        })
    }

    /// Take the exclusive lock, or `None` if another holder has it.
    pub fn try_lock(&self) -> Result<Option<LedgerLock>, StorageError> {
        let file = self.open_lock_file()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(LedgerLock {
                file,
                path: self.lock_path(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn open_lock_file(&self) -> Result<File, StorageError> {
        self.create_parent()?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        Ok(file)
    }

    fn create_parent(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Load the ledger, or `None` if the file does not exist yet.
    pub fn load(&self) -> Result<Option<LedgerFile>, StorageError> {
        if !self.path.exists() {
            tracing::debug!("No ledger at {}", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let envelope: Envelope = serde_json::from_str(&content)?;

        if envelope.version != LEDGER_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion(envelope.version));
        }

        let actual = checksum(&envelope.ledger)?;
        if actual != envelope.checksum {
            return Err(StorageError::Corrupted {
                expected: envelope.checksum,
                actual,
            });
        }

        tracing::info!(
            "Loaded ledger from {} at height {}",
            self.path.display(),
            envelope.ledger.height
        );
        Ok(Some(envelope.ledger))
    }

    /// Write the ledger atomically (temp file, then rename).
    pub fn save(&self, ledger: &LedgerFile) -> Result<(), StorageError> {
        self.create_parent()?;

        let envelope = Envelope {
            version: LEDGER_FORMAT_VERSION,
            checksum: checksum(ledger)?,
            ledger: ledger.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!("Saved ledger to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_governance::{BalanceBook, Governance, GovernanceConfig, ManualClock};
    use tempfile::TempDir;

    fn sample_ledger() -> LedgerFile {
        let owner = Address::from_bytes([0xAA; 20]);
        let treasury = Address::from_bytes([0xEE; 20]);
        let alice = Address::from_bytes([1; 20]);
        let config = GovernanceConfig {
            minimum_stake: 10,
            ..GovernanceConfig::default()
        };
        let gov = Governance::new(owner, treasury, config, BalanceBook::new(), ManualClock::new(7)).unwrap();
        gov.funds().mint(alice, u128::MAX / 2).unwrap();
        gov.stake(alice, 1_000).unwrap();

        LedgerFile {
            height: 7,
            balances: gov.funds().balances().into_iter().collect(),
            governance: gov.snapshot(),
        }
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        assert!(!store.exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("nested").join("ledger.json"));
        let ledger = sample_ledger();

        store.save(&ledger).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), Some(ledger));
    }

    #[test]
    fn test_tampered_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let store = LedgerStore::new(&path);
        store.save(&sample_ledger()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let tampered = content.replacen("\"height\": 7", "\"height\": 8", 1);
        assert_ne!(content, tampered);
        fs::write(&path, tampered).unwrap();

        assert!(matches!(store.load(), Err(StorageError::Corrupted { .. })));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let store = LedgerStore::new(&path);
        store.save(&sample_ledger()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replacen("\"version\": 1", "\"version\": 99", 1)).unwrap();

        assert_eq!(store.load(), Err(StorageError::UnsupportedVersion(99)));
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));

        let held = store.lock().unwrap();
        assert!(held.path().ends_with("ledger.lock"));
        assert!(store.try_lock().unwrap().is_none());

        // Saving under the lock still replaces the ledger by rename.
        store.save(&sample_ledger()).unwrap();
        assert!(store.load().unwrap().is_some());

        drop(held);
        assert!(store.try_lock().unwrap().is_some());
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            LedgerStore::new(&path).load(),
            Err(StorageError::Serialization(_))
        ));
    }
}
