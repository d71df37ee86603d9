//! Glue between decisions and the grading event ledger.
//!
//! The loop never writes to a store itself. Callers turn a
//! [`DecisionResult`] into a [`GradingEvent`] and record it, and read the
//! latest event of a trace back as the next attempt's `previous_result`.

use tracing::instrument;

use gradeloop_ledger::{GradingEvent, GradingEventStore};

use crate::decision_loop::DecisionResult;
use crate::domain::{ContextResult, DecisionInput, Result};
use crate::idempotency::{generate_idempotency_key, IdempotencyKey, IdempotencyParams};
use crate::obs;

impl DecisionResult {
    /// Classification category code, then `verifier:<name>` per failed verifier.
    pub fn reason_codes(&self) -> Vec<String> {
        self.classification
            .iter()
            .map(|c| c.category.code().to_string())
            .chain(
                self.verification
                    .failed()
                    .map(|r| format!("verifier:{}", r.verifier)),
            )
            .collect()
    }

    /// The audit record this decision implies, keyed by its idempotency key.
    pub fn to_grading_event(
        &self,
        input: &DecisionInput,
        trace_id: &str,
        attempt_no: u32,
    ) -> Result<GradingEvent> {
        let reasons = self.reason_codes();
        let key = generate_idempotency_key(&IdempotencyParams {
            trace_id,
            task: &input.task,
            attempt_no,
            reason_codes: &reasons,
        })?;

        Ok(GradingEvent {
            message_id: input.metadata.message_id.clone(),
            trace_id: trace_id.to_string(),
            attempt_no,
            decision: self.outcome,
            qscore: self.qscore.calibrated,
            reasons,
            idempotency_key: key.key,
            created_at: self.timestamp,
            specialist_id: input.metadata.specialist_id.clone(),
            context_result: Some(serde_json::to_value(&input.context_result)?),
        })
    }
}

/// Snapshot of the result stored with an event, if it parses.
pub fn previous_result_from_event(event: &GradingEvent) -> Option<ContextResult> {
    event
        .context_result
        .clone()
        .and_then(|value| serde_json::from_value(value).ok())
}

/// Build the event for `result` and record it exactly once.
///
/// A second call for the same logical attempt fails with
/// `DecisionError::Storage(StorageError::IdempotencyViolation { .. })`.
#[instrument(skip(store, result, input), fields(message_id = %input.metadata.message_id))]
pub async fn record_decision(
    store: &dyn GradingEventStore,
    result: &DecisionResult,
    input: &DecisionInput,
    trace_id: &str,
    attempt_no: u32,
) -> Result<IdempotencyKey> {
    let event = result.to_grading_event(input, trace_id, attempt_no)?;
    let key = IdempotencyKey {
        key: event.idempotency_key.clone(),
        trace_id: trace_id.to_string(),
        attempt_no,
    };

    match store.record(event).await {
        Ok(()) => {
            obs::emit_event_recorded(trace_id, attempt_no, &key.key);
            Ok(key)
        }
        Err(e) => {
            if e.is_idempotency_violation() {
                obs::emit_idempotency_violation(trace_id, &key.key);
            }
            Err(e.into())
        }
    }
}
