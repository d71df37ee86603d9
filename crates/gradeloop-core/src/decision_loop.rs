//! Decision loop: score, verify, then accept, retry or escalate.
//!
//! `decide()` is a total function. Every well-typed [`DecisionInput`] yields
//! a [`DecisionResult`]; faults inside verifiers surface as failed
//! verification results, never as errors.
//!
//! `classification` and `retry_decision` are both present exactly when the
//! outcome is not `ACCEPT`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{instrument, Instrument};

use gradeloop_ledger::DecisionOutcome;

use crate::classifier::{ClassificationContext, ErrorClassification, ErrorClassifier};
use crate::config::DecisionConfig;
use crate::domain::{DecisionInput, ErrorCategory, Result, RetryAction};
use crate::metrics::METRICS;
use crate::obs::{self, DecisionSpan};
use crate::qscore::{QScoreResult, QualityScorer};
use crate::retry_policy::{RetryDecision, RetryPolicy, RetryRequest};
use crate::verification::{
    ReplayConsistencyVerifier, SchemaVerifier, SmokeVerifier, VerificationSuite,
    VerificationSuiteResult, Verifier,
};

pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub outcome: DecisionOutcome,
    pub qscore: QScoreResult,
    pub verification: VerificationSuiteResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ErrorClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_decision: Option<RetryDecision>,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl DecisionResult {
    pub fn category(&self) -> Option<ErrorCategory> {
        self.classification.as_ref().map(|c| c.category)
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == DecisionOutcome::Accept
    }
}

/// Build the standard verifier suite: schema, replay consistency, smoke.
pub fn standard_suite(config: &DecisionConfig) -> Result<VerificationSuite> {
    let verifiers: Vec<Arc<dyn Verifier>> = vec![
        Arc::new(SchemaVerifier::new(config.schema.clone())),
        Arc::new(ReplayConsistencyVerifier::new(config.replay.clone())),
        Arc::new(SmokeVerifier::new(config.smoke.clone())?),
    ];
    Ok(VerificationSuite::new(verifiers, config.suite.clone()))
}

/// Stateless orchestrator over the scorer, suite, classifier and policy.
///
/// Safe to share across tasks; nothing is mutated by `decide()`.
#[derive(Debug, Clone)]
pub struct DecisionLoop {
    scorer: QualityScorer,
    suite: VerificationSuite,
    classifier: ErrorClassifier,
    policy: RetryPolicy,
    accept_threshold: f64,
}

impl DecisionLoop {
    pub fn new(
        scorer: QualityScorer,
        suite: VerificationSuite,
        classifier: ErrorClassifier,
        policy: RetryPolicy,
        accept_threshold: f64,
    ) -> Self {
        Self {
            scorer,
            suite,
            classifier,
            policy,
            accept_threshold,
        }
    }

    /// Validate `config` and build a loop with the standard suite.
    pub fn from_config(config: &DecisionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            QualityScorer::new(config.qscore.clone()),
            standard_suite(config)?,
            ErrorClassifier::new(config.classifier.clone()),
            RetryPolicy::new(config.retry_policy.clone()),
            config.accept_threshold,
        ))
    }

    /// A loop with every default.
    pub fn standard() -> Result<Self> {
        Self::from_config(&DecisionConfig::default())
    }

    pub fn accept_threshold(&self) -> f64 {
        self.accept_threshold
    }

    pub fn suite(&self) -> &VerificationSuite {
        &self.suite
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Register an additional verifier, replacing one with the same name.
    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.suite.add_verifier(verifier);
        self
    }

    pub async fn decide(&self, input: &DecisionInput) -> DecisionResult {
        let meta = &input.metadata;
        obs::emit_decision_started(&meta.message_id, &meta.specialist_id, meta.retry_depth);

        let qscore = self.scorer.score(input);
        let verification = self
            .suite
            .verify(input)
            .instrument(obs::decision_span(&meta.message_id))
            .await;

        self.evaluate(input, qscore, verification)
    }

    /// Run `decide` concurrently over `inputs`; results keep input order.
    #[instrument(skip_all, fields(batch_size = inputs.len()))]
    pub async fn decide_batch(&self, inputs: &[DecisionInput]) -> Vec<DecisionResult> {
        join_all(inputs.iter().map(|input| self.decide(input))).await
    }

    /// Steps after scoring and verification, for callers that ran those
    /// themselves.
    pub fn evaluate(
        &self,
        input: &DecisionInput,
        qscore: QScoreResult,
        verification: VerificationSuiteResult,
    ) -> DecisionResult {
        let meta = &input.metadata;
        let _span = DecisionSpan::enter(&meta.message_id);

        let result = if qscore.calibrated >= self.accept_threshold && verification.passed {
            let summary = format!(
                "Result accepted (calibrated {:.1}% >= threshold {:.1}%)",
                qscore.calibrated * 100.0,
                self.accept_threshold * 100.0
            );
            accepted(qscore, verification, summary)
        } else {
            let classification = self.classifier.classify(&ClassificationContext {
                verification_results: &verification.results,
                qscore_signals: Some(qscore.signals),
                context_result: Some(&input.context_result),
                qscore_value: Some(qscore.calibrated),
            });
            let decision = self.policy.decide(&RetryRequest {
                category: classification.category,
                current_retry_depth: meta.retry_depth,
                current_specialist: &meta.specialist_id,
                category_confidence: classification.confidence,
            });
            self.route(qscore, verification, classification, decision)
        };

        METRICS.record_outcome(result.outcome);
        obs::emit_decision_finished(
            &meta.message_id,
            result.outcome,
            result.qscore.calibrated,
            result.category().map(|c| c.code()),
        );
        result
    }

    fn route(
        &self,
        qscore: QScoreResult,
        verification: VerificationSuiteResult,
        classification: ErrorClassification,
        decision: RetryDecision,
    ) -> DecisionResult {
        let category = classification.category;
        let (outcome, summary) = match decision.action {
            // escalation disabled: the policy's fallback is final
            RetryAction::Accept => {
                let summary = format!(
                    "Result accepted as fallback for {category}: {}",
                    decision.reason
                );
                return accepted(qscore, verification, summary);
            }
            RetryAction::Escalate => (
                DecisionOutcome::Escalate,
                format!(
                    "Escalating {category}: {}. {}",
                    classification.reason, decision.reason
                ),
            ),
            action => (
                DecisionOutcome::Retry,
                format!(
                    "Retrying with {action} for {category}: {}. {}",
                    classification.reason, decision.reason
                ),
            ),
        };

        DecisionResult {
            outcome,
            qscore,
            verification,
            classification: Some(classification),
            retry_decision: Some(decision),
            summary,
            timestamp: Utc::now(),
        }
    }
}

fn accepted(
    qscore: QScoreResult,
    verification: VerificationSuiteResult,
    summary: String,
) -> DecisionResult {
    DecisionResult {
        outcome: DecisionOutcome::Accept,
        qscore,
        verification,
        classification: None,
        retry_decision: None,
        summary,
        timestamp: Utc::now(),
    }
}
