//! Structured observability hooks for the decision lifecycle.
//!
//! This module provides:
//! - A decision-scoped tracing span via the `DecisionSpan` RAII guard, or
//!   [`decision_span`] for instrumenting futures
//! - Emission functions for key events: decision start/finish, verifier
//!   timeouts, event recording and duplicate rejection
//!
//! Every event carries a stable `event = "..."` field for log pipelines.

use tracing::{info, warn};

use gradeloop_ledger::DecisionOutcome;

/// RAII guard that enters a decision-scoped span for a message.
///
/// # Example
///
/// ```ignore
/// let _span = DecisionSpan::enter("msg-123");
/// // tracing calls in this scope carry message_id = "msg-123"
/// ```
pub struct DecisionSpan {
    _span: tracing::span::EnteredSpan,
}

impl DecisionSpan {
    pub fn enter(message_id: &str) -> Self {
        Self {
            _span: decision_span(message_id).entered(),
        }
    }
}

/// Un-entered decision span, for instrumenting futures.
pub fn decision_span(message_id: &str) -> tracing::Span {
    tracing::info_span!("gradeloop.decision", message_id = %message_id)
}

pub fn emit_decision_started(message_id: &str, specialist_id: &str, retry_depth: u32) {
    info!(
        event = "decision.started",
        message_id = %message_id,
        specialist_id = %specialist_id,
        retry_depth = retry_depth,
    );
}

pub fn emit_decision_finished(
    message_id: &str,
    outcome: DecisionOutcome,
    calibrated: f64,
    category: Option<&str>,
) {
    info!(
        event = "decision.finished",
        message_id = %message_id,
        outcome = %outcome,
        qscore = calibrated,
        category = category.unwrap_or("-"),
    );
}

/// Warning level: a verifier missed its deadline and was replaced.
pub fn emit_verifier_timeout(message_id: &str, verifier: &str, timeout_ms: u64) {
    warn!(
        event = "verifier.timeout",
        message_id = %message_id,
        verifier = %verifier,
        timeout_ms = timeout_ms,
    );
}

pub fn emit_event_recorded(trace_id: &str, attempt_no: u32, idempotency_key: &str) {
    info!(
        event = "ledger.recorded",
        trace_id = %trace_id,
        attempt_no = attempt_no,
        idempotency_key = %idempotency_key,
    );
}

pub fn emit_idempotency_violation(trace_id: &str, idempotency_key: &str) {
    warn!(
        event = "ledger.idempotency_violation",
        trace_id = %trace_id,
        idempotency_key = %idempotency_key,
    );
}
