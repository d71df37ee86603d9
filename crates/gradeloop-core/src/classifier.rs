//! Error classifier: assigns one taxonomy category to a non-accepted result.
//!
//! Classification is a strict priority cascade. Once a tier matches, lower
//! tiers are never consulted:
//!
//! 1. verifier failures (schema, replay, smoke)
//! 2. QScore signals (policy, confidence, latency, evidence)
//! 3. content heuristics over the summary text (flaky, selector)
//! 4. overall QScore fallback
//! 5. `UNKNOWN`
//!
//! Within a tier the first listed match wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{ContextResult, DecisionError, ErrorCategory, Result};
use crate::qscore::QScoreSignals;
use crate::verification::{
    SmokeCheck, SmokeFailure, VerificationResult, REPLAY_VERIFIER, SCHEMA_VERIFIER,
    SMOKE_VERIFIER,
};

static FLAKY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(flaky|flakiness|intermittent(ly)?|sporadic(ally)?|race condition|timing issue|non-?deterministic|sometimes (passes|fails))\b",
    )
    .expect("FLAKY_RE regex should compile")
});

static SELECTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\bselectors?\b|\blocators?\b|element not found|no such element|unable to locate element|\bxpath\b|stale element)",
    )
    .expect("SELECTOR_RE regex should compile")
});

/// Signal thresholds below which a tier-2 or tier-4 rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub policy_ok_threshold: f64,
    pub result_confidence_threshold: f64,
    pub latency_norm_threshold: f64,
    pub evidence_coverage_threshold: f64,
    pub qscore_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            policy_ok_threshold: 0.5,
            result_confidence_threshold: 0.5,
            latency_norm_threshold: 0.3,
            evidence_coverage_threshold: 0.5,
            qscore_threshold: 0.5,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("policy_ok_threshold", self.policy_ok_threshold),
            ("result_confidence_threshold", self.result_confidence_threshold),
            ("latency_norm_threshold", self.latency_norm_threshold),
            ("evidence_coverage_threshold", self.evidence_coverage_threshold),
            ("qscore_threshold", self.qscore_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(DecisionError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub category: ErrorCategory,
    pub confidence: f64,
    pub reason: String,
}

impl ErrorClassification {
    fn new(category: ErrorCategory, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            category,
            confidence,
            reason: reason.into(),
        }
    }
}

/// Any subset of the evidence available for one decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationContext<'a> {
    pub verification_results: &'a [VerificationResult],
    pub qscore_signals: Option<QScoreSignals>,
    pub context_result: Option<&'a ContextResult>,
    pub qscore_value: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    config: ClassifierConfig,
}

impl ErrorClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, ctx: &ClassificationContext<'_>) -> ErrorClassification {
        self.verifier_tier(ctx.verification_results)
            .or_else(|| ctx.qscore_signals.and_then(|s| self.signal_tier(&s)))
            .or_else(|| ctx.context_result.and_then(content_tier))
            .or_else(|| ctx.qscore_value.and_then(|q| self.qscore_tier(q)))
            .unwrap_or_else(|| {
                ErrorClassification::new(ErrorCategory::Unknown, 0.5, "Unable to classify")
            })
    }

    fn verifier_tier(&self, results: &[VerificationResult]) -> Option<ErrorClassification> {
        let failed = |name: &str| results.iter().find(|r| r.verifier == name && !r.passed);

        if let Some(r) = failed(SCHEMA_VERIFIER) {
            return Some(ErrorClassification::new(
                ErrorCategory::SchemaViolation,
                1.0,
                r.reason.clone(),
            ));
        }
        if let Some(r) = failed(REPLAY_VERIFIER) {
            return Some(ErrorClassification::new(
                ErrorCategory::Inconsistent,
                0.9,
                r.reason.clone(),
            ));
        }
        if let Some(r) = failed(SMOKE_VERIFIER) {
            let checks: Vec<SmokeCheck> =
                SmokeFailure::from_result(r).iter().map(|f| f.check).collect();
            if checks.iter().any(SmokeCheck::is_shortfall) {
                return Some(ErrorClassification::new(
                    ErrorCategory::MissingEvidence,
                    0.8,
                    format!("Insufficient evidence: {}", r.reason),
                ));
            }
            if checks.contains(&SmokeCheck::ForbiddenPattern) {
                return Some(ErrorClassification::new(
                    ErrorCategory::Unknown,
                    0.7,
                    format!("Smoke test flagged suspicious content: {}", r.reason),
                ));
            }
            return Some(ErrorClassification::new(
                ErrorCategory::MissingEvidence,
                0.8,
                format!("Incomplete result: {}", r.reason),
            ));
        }
        None
    }

    fn signal_tier(&self, s: &QScoreSignals) -> Option<ErrorClassification> {
        let c = &self.config;
        if s.policy_ok < c.policy_ok_threshold {
            return Some(ErrorClassification::new(
                ErrorCategory::PolicyDegraded,
                1.0,
                format!("Policy compliance degraded (policyOk={:.2})", s.policy_ok),
            ));
        }
        if s.result_confidence < c.result_confidence_threshold {
            return Some(ErrorClassification::new(
                ErrorCategory::LowConfidence,
                0.9,
                format!(
                    "Specialist reported low confidence ({:.2})",
                    s.result_confidence
                ),
            ));
        }
        if s.latency_norm < c.latency_norm_threshold {
            return Some(ErrorClassification::new(
                ErrorCategory::Timeout,
                0.8,
                format!("Latency exceeded budget (latencyNorm={:.2})", s.latency_norm),
            ));
        }
        if s.evidence_coverage < c.evidence_coverage_threshold {
            return Some(ErrorClassification::new(
                ErrorCategory::MissingEvidence,
                0.8,
                format!(
                    "Evidence coverage too low ({:.2})",
                    s.evidence_coverage
                ),
            ));
        }
        None
    }

    fn qscore_tier(&self, qscore: f64) -> Option<ErrorClassification> {
        (qscore < self.config.qscore_threshold).then(|| {
            ErrorClassification::new(
                ErrorCategory::LowConfidence,
                0.7,
                format!("Overall quality score too low ({:.1}%)", qscore * 100.0),
            )
        })
    }
}

fn content_tier(result: &ContextResult) -> Option<ErrorClassification> {
    let text = result.summary_text();
    if FLAKY_RE.is_match(&text) {
        return Some(ErrorClassification::new(
            ErrorCategory::FlakyPattern,
            0.7,
            "Summary describes flaky or intermittent behaviour",
        ));
    }
    if SELECTOR_RE.is_match(&text) {
        return Some(ErrorClassification::new(
            ErrorCategory::SelectorIssue,
            0.6,
            "Summary points at a selector or locator problem",
        ));
    }
    None
}
