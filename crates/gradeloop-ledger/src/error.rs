//! Error types for gradeloop-ledger

use thiserror::Error;

/// Errors that can occur in the grading event store
#[derive(Error, Debug)]
pub enum StorageError {
    /// An event with this idempotency key was already recorded
    #[error("Idempotency violation: event with key {key} already recorded")]
    IdempotencyViolation { key: String },

    /// Event payload could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Durable backend failure (connection, query, transaction)
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether this error reports a duplicate write rather than a fault.
    pub fn is_idempotency_violation(&self) -> bool {
        matches!(self, StorageError::IdempotencyViolation { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
