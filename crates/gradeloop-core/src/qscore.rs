//! Quality scorer: reduces raw signals into one calibrated score.
//!
//! Pure and deterministic. The same [`DecisionInput`] always yields the same
//! `score` and `calibrated` values; there is no hidden state.

use serde::{Deserialize, Serialize};

use crate::domain::{DecisionError, DecisionInput, Result};

/// Weights and normalisation constants for the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QScoreConfig {
    pub policy_weight: f64,
    pub confidence_weight: f64,
    pub latency_weight: f64,
    pub evidence_weight: f64,
    /// Latency at or above this budget normalises to 0.
    pub latency_budget_ms: u64,
    /// Subtracted from `score` once per retry.
    pub retry_penalty: f64,
    /// Summary length that counts as full evidence.
    pub target_summary_items: usize,
    /// Affordance count that counts as full evidence.
    pub target_affordances: usize,
}

impl Default for QScoreConfig {
    fn default() -> Self {
        Self {
            policy_weight: 0.3,
            confidence_weight: 0.3,
            latency_weight: 0.2,
            evidence_weight: 0.2,
            latency_budget_ms: 30_000,
            retry_penalty: 0.05,
            target_summary_items: 3,
            target_affordances: 2,
        }
    }
}

impl QScoreConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.policy_weight,
            self.confidence_weight,
            self.latency_weight,
            self.evidence_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DecisionError::InvalidConfig(
                "qscore weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(DecisionError::InvalidConfig(
                "qscore weights must sum to a positive value".to_string(),
            ));
        }
        if !self.retry_penalty.is_finite() || self.retry_penalty < 0.0 {
            return Err(DecisionError::InvalidConfig(
                "retry_penalty must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Individual signals, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QScoreSignals {
    pub policy_ok: f64,
    pub result_confidence: f64,
    pub latency_norm: f64,
    pub evidence_coverage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QScoreResult {
    pub score: f64,
    /// `score` after the retry-depth penalty.
    pub calibrated: f64,
    pub signals: QScoreSignals,
}

#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: QScoreConfig,
}

impl QualityScorer {
    pub fn new(config: QScoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QScoreConfig {
        &self.config
    }

    pub fn score(&self, input: &DecisionInput) -> QScoreResult {
        let signals = self.signals(input);
        let c = &self.config;

        let total_weight =
            c.policy_weight + c.confidence_weight + c.latency_weight + c.evidence_weight;
        let weighted = c.policy_weight * signals.policy_ok
            + c.confidence_weight * signals.result_confidence
            + c.latency_weight * signals.latency_norm
            + c.evidence_weight * signals.evidence_coverage;
        let score = if total_weight > 0.0 {
            clamp01(weighted / total_weight)
        } else {
            0.0
        };

        let penalty = c.retry_penalty * f64::from(input.metadata.retry_depth);
        let calibrated = clamp01(score - penalty);

        QScoreResult {
            score,
            calibrated,
            signals,
        }
    }

    fn signals(&self, input: &DecisionInput) -> QScoreSignals {
        let task = &input.task;
        let result = &input.context_result;

        let schema_ok: f64 = if input.metadata.schema_valid { 1.0 } else { 0.0 };
        let policy_ok = match task.inputs.get("policy_ok") {
            Some(serde_json::Value::Bool(b)) => schema_ok.min(if *b { 1.0 } else { 0.0 }),
            Some(v) => v.as_f64().map_or(schema_ok, |n| schema_ok.min(clamp01(n))),
            None => schema_ok,
        };

        let result_confidence = match task.input_f64("confidence") {
            Some(n) => clamp01(n),
            None if !result.summary.is_empty() => 0.8,
            None => 0.3,
        };

        let latency_ms = task
            .input_f64("latency_ms")
            .filter(|n| n.is_finite())
            .map_or(input.metadata.total_latency_ms as f64, |n| {
                n.max(input.metadata.total_latency_ms as f64)
            });
        let latency_norm = if self.config.latency_budget_ms == 0 {
            1.0
        } else {
            1.0 - clamp01(latency_ms / self.config.latency_budget_ms as f64)
        };

        let evidence_coverage = match task.input_f64("evidence_coverage") {
            Some(n) => clamp01(n),
            None => {
                0.5 * ratio(result.summary.len(), self.config.target_summary_items)
                    + 0.5 * ratio(result.affordances.len(), self.config.target_affordances)
            }
        };

        QScoreSignals {
            policy_ok,
            result_confidence,
            latency_norm,
            evidence_coverage,
        }
    }
}

/// Score with the default configuration.
pub fn compute_qscore(input: &DecisionInput) -> QScoreResult {
    QualityScorer::default().score(input)
}

fn ratio(have: usize, target: usize) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (have as f64 / target as f64).min(1.0)
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
