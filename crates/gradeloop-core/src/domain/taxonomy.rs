//! Failure taxonomy and remediation actions.
//!
//! Both enums are closed: adding a variant forces the classifier, the retry
//! policy table and the summary formatter to handle it.

use serde::{Deserialize, Serialize};

/// The nine failure classes assigned to a non-accepted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    SchemaViolation,
    MissingEvidence,
    FlakyPattern,
    SelectorIssue,
    PolicyDegraded,
    LowConfidence,
    Timeout,
    Inconsistent,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 9] = [
        ErrorCategory::SchemaViolation,
        ErrorCategory::MissingEvidence,
        ErrorCategory::FlakyPattern,
        ErrorCategory::SelectorIssue,
        ErrorCategory::PolicyDegraded,
        ErrorCategory::LowConfidence,
        ErrorCategory::Timeout,
        ErrorCategory::Inconsistent,
        ErrorCategory::Unknown,
    ];

    /// Stable wire code, also used as a reason code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::SchemaViolation => "SCHEMA_VIOLATION",
            ErrorCategory::MissingEvidence => "MISSING_EVIDENCE",
            ErrorCategory::FlakyPattern => "FLAKY_PATTERN",
            ErrorCategory::SelectorIssue => "SELECTOR_ISSUE",
            ErrorCategory::PolicyDegraded => "POLICY_DEGRADED",
            ErrorCategory::LowConfidence => "LOW_CONFIDENCE",
            ErrorCategory::Timeout => "TIMEOUT",
            ErrorCategory::Inconsistent => "INCONSISTENT",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Remediation chosen by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryAction {
    RetryWithSchema,
    RetryExpandContext,
    RetryStability,
    RetrySelectorHeal,
    RetryDifferentSpecialist,
    Escalate,
    /// Fallback when escalation is disabled by the caller.
    Accept,
}

impl RetryAction {
    pub fn code(&self) -> &'static str {
        match self {
            RetryAction::RetryWithSchema => "RETRY_WITH_SCHEMA",
            RetryAction::RetryExpandContext => "RETRY_EXPAND_CONTEXT",
            RetryAction::RetryStability => "RETRY_STABILITY",
            RetryAction::RetrySelectorHeal => "RETRY_SELECTOR_HEAL",
            RetryAction::RetryDifferentSpecialist => "RETRY_DIFFERENT_SPECIALIST",
            RetryAction::Escalate => "ESCALATE",
            RetryAction::Accept => "ACCEPT",
        }
    }

    /// Whether the action asks the caller to re-invoke a specialist.
    pub fn is_retry(&self) -> bool {
        match self {
            RetryAction::RetryWithSchema
            | RetryAction::RetryExpandContext
            | RetryAction::RetryStability
            | RetryAction::RetrySelectorHeal
            | RetryAction::RetryDifferentSpecialist => true,
            RetryAction::Escalate | RetryAction::Accept => false,
        }
    }
}

impl std::fmt::Display for RetryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
