//! Storage trait definitions for gradeloop
//!
//! `GradingEventStore` is the persistence boundary of the decision core.
//! Any backend (in-memory, relational, log-structured) must preserve:
//! - idempotent insert-or-reject on `idempotency_key`
//! - ordering by `attempt_no` within a `trace_id`
//! - the filters exposed by [`EventQuery`]
//!
//! The in-memory reference implementation lives in the `memory` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Terminal outcome of one grading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Accept,
    Retry,
    Escalate,
}

impl DecisionOutcome {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionOutcome::Accept => "ACCEPT",
            DecisionOutcome::Retry => "RETRY",
            DecisionOutcome::Escalate => "ESCALATE",
        }
    }
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted audit record of a single grading attempt.
///
/// Created once by the caller after a decision, written exactly once, never
/// mutated or deleted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingEvent {
    pub message_id: String,
    pub trace_id: String,
    pub attempt_no: u32,
    pub decision: DecisionOutcome,
    /// Calibrated quality score in [0, 1]
    pub qscore: f64,
    /// Reason codes in decision order; the idempotency key hashes them sorted
    pub reasons: Vec<String>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub specialist_id: String,
    /// Snapshot of the graded result, used as the next attempt's previous result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_result: Option<serde_json::Value>,
}

/// Audit filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventQuery {
    pub decision: Option<DecisionOutcome>,
    pub min_qscore: Option<f64>,
    pub specialist_id: Option<String>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decision(mut self, decision: DecisionOutcome) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn min_qscore(mut self, min_qscore: f64) -> Self {
        self.min_qscore = Some(min_qscore);
        self
    }

    pub fn specialist(mut self, specialist_id: impl Into<String>) -> Self {
        self.specialist_id = Some(specialist_id.into());
        self
    }

    /// Whether `event` satisfies every set filter.
    pub fn matches(&self, event: &GradingEvent) -> bool {
        if let Some(decision) = self.decision {
            if event.decision != decision {
                return false;
            }
        }
        if let Some(min) = self.min_qscore {
            if event.qscore < min {
                return false;
            }
        }
        if let Some(specialist) = &self.specialist_id {
            if &event.specialist_id != specialist {
                return false;
            }
        }
        true
    }
}

/// Append-only grading event store.
///
/// Guarantees:
/// - `record` is a compare-and-insert on `idempotency_key`: of two concurrent
///   writes with the same key exactly one succeeds, the other observes
///   `StorageError::IdempotencyViolation`.
/// - `get_by_trace_id` returns events ordered by ascending `attempt_no`.
/// - Recorded events are immutable.
#[async_trait]
pub trait GradingEventStore: Send + Sync {
    /// Record an event. Fails if its idempotency key already exists.
    async fn record(&self, event: GradingEvent) -> StorageResult<()>;

    /// Check whether an idempotency key has already been recorded.
    async fn is_duplicate(&self, idempotency_key: &str) -> StorageResult<bool>;

    /// All events for a message, in insertion order.
    async fn get_by_message_id(&self, message_id: &str) -> StorageResult<Vec<GradingEvent>>;

    /// All events for a trace, ordered by ascending `attempt_no`.
    async fn get_by_trace_id(&self, trace_id: &str) -> StorageResult<Vec<GradingEvent>>;

    /// The event with the highest `attempt_no` for a trace, if any.
    async fn get_latest_by_trace_id(&self, trace_id: &str) -> StorageResult<Option<GradingEvent>>;

    /// Count events, optionally restricted to one decision.
    async fn count(&self, decision: Option<DecisionOutcome>) -> StorageResult<usize>;

    /// Events matching `query`, in insertion order.
    async fn query(&self, query: &EventQuery) -> StorageResult<Vec<GradingEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(decision: DecisionOutcome, qscore: f64, specialist: &str) -> GradingEvent {
        GradingEvent {
            message_id: "msg-1".to_string(),
            trace_id: "trace-1".to_string(),
            attempt_no: 0,
            decision,
            qscore,
            reasons: vec![],
            idempotency_key: "k".to_string(),
            created_at: Utc::now(),
            specialist_id: specialist.to_string(),
            context_result: None,
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let q = EventQuery::new();
        assert!(q.matches(&event(DecisionOutcome::Retry, 0.1, "specialist-default")));
    }

    #[test]
    fn test_query_filters_combine() {
        let q = EventQuery::new()
            .decision(DecisionOutcome::Accept)
            .min_qscore(0.8)
            .specialist("specialist-default");

        assert!(q.matches(&event(DecisionOutcome::Accept, 0.9, "specialist-default")));
        assert!(!q.matches(&event(DecisionOutcome::Accept, 0.7, "specialist-default")));
        assert!(!q.matches(&event(DecisionOutcome::Retry, 0.9, "specialist-default")));
        assert!(!q.matches(&event(DecisionOutcome::Accept, 0.9, "specialist-advanced")));
    }

    #[test]
    fn test_decision_outcome_wire_format() {
        let json = serde_json::to_string(&DecisionOutcome::Escalate).unwrap();
        assert_eq!(json, r#""ESCALATE""#);
        assert_eq!(DecisionOutcome::Accept.to_string(), "ACCEPT");
    }
}
