//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// Constraint variants are surfaced to mutation callers so invalid requests
/// can be rejected without a state change; the remaining variants indicate
/// backend failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A pilot with this number is already registered.
    #[error("pilot number already registered: {number}")]
    DuplicatePilot {
        /// The conflicting pilot number.
        number: String,
    },

    /// No pilot with this number is registered.
    #[error("unknown pilot number: {number}")]
    UnknownPilot {
        /// The unmatched pilot number.
        number: String,
    },

    /// Sector id outside the fixed 1..=3 range.
    #[error("invalid sector id: {sector_id}")]
    InvalidSector {
        /// The rejected sector id.
        sector_id: u8,
    },

    /// Registration attempted after the race started.
    #[error("race already started")]
    RaceStarted,

    /// RocksDB error.
    #[error("RocksDB error: {0}")]
    RocksDb(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error is a rejected request rather than a backend failure.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicatePilot { .. }
                | StoreError::UnknownPilot { .. }
                | StoreError::InvalidSector { .. }
                | StoreError::RaceStarted
        )
    }
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::RocksDb(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
