//! Domain-level error taxonomy for gradeloop.
//!
//! Decisions themselves never fail; these errors cover configuration,
//! persistence and explicit budget checks.

use crate::domain::taxonomy::ErrorCategory;

/// Gradeloop domain errors.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid forbidden pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("retry limit exceeded for {category}: attempt {attempt} of {max_attempts}")]
    RetryLimitExceeded {
        category: ErrorCategory,
        attempt: u32,
        max_attempts: u32,
    },

    #[error("storage error: {0}")]
    Storage(#[from] gradeloop_ledger::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecisionError {
    /// Whether this error is the store rejecting an already-recorded attempt.
    pub fn is_idempotency_violation(&self) -> bool {
        matches!(self, DecisionError::Storage(e) if e.is_idempotency_violation())
    }
}

/// Result type for gradeloop domain operations.
pub type Result<T> = std::result::Result<T, DecisionError>;
