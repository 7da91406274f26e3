use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Ledger file corrupted: checksum {actual} does not match recorded {expected}")]
    Corrupted { expected: String, actual: String },

    #[error("Unsupported ledger format version: {0}")]
    UnsupportedVersion(u32),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
