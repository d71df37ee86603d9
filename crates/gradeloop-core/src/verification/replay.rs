//! Replay consistency: similarity of a result to the previous attempt.
//!
//! consistency = summary_weight · J(summary words) + action_weight · J(action tokens)
//!
//! where J is Jaccard overlap of lower-cased alphanumeric tokens. Two empty
//! token sets are considered identical.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{VerificationResult, Verifier};
use crate::domain::{ContextResult, DecisionError, DecisionInput, Result};

pub const REPLAY_VERIFIER: &str = "replay_consistency";

// Absorbs float rounding in consistency sums that land on the threshold.
const THRESHOLD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub min_consistency_threshold: f64,
    pub summary_weight: f64,
    pub action_weight: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            min_consistency_threshold: 0.7,
            summary_weight: 0.6,
            action_weight: 0.4,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_consistency_threshold) {
            return Err(DecisionError::InvalidConfig(format!(
                "min_consistency_threshold must be within [0, 1], got {}",
                self.min_consistency_threshold
            )));
        }
        if self.summary_weight < 0.0
            || self.action_weight < 0.0
            || self.summary_weight + self.action_weight <= 0.0
        {
            return Err(DecisionError::InvalidConfig(
                "replay weights must be non-negative and sum to a positive value".to_string(),
            ));
        }
        Ok(())
    }
}

fn tokens<'a>(items: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    items
        .into_iter()
        .flat_map(|s| s.split(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[derive(Debug, Clone, Default)]
pub struct ReplayConsistencyVerifier {
    config: ReplayConfig,
}

impl ReplayConsistencyVerifier {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Returns `(consistency, summary_similarity, action_similarity)`.
    pub fn consistency(
        &self,
        current: &ContextResult,
        previous: &ContextResult,
    ) -> (f64, f64, f64) {
        let summary_sim = jaccard(
            &tokens(current.summary.iter().map(String::as_str)),
            &tokens(previous.summary.iter().map(String::as_str)),
        );
        let action_sim = jaccard(
            &tokens(current.affordances.iter().map(|a| a.action.as_str())),
            &tokens(previous.affordances.iter().map(|a| a.action.as_str())),
        );
        let total = self.config.summary_weight + self.config.action_weight;
        let consistency = if total > 0.0 {
            (self.config.summary_weight * summary_sim + self.config.action_weight * action_sim)
                / total
        } else {
            0.0
        };
        (consistency, summary_sim, action_sim)
    }
}

#[async_trait]
impl Verifier for ReplayConsistencyVerifier {
    fn name(&self) -> &str {
        REPLAY_VERIFIER
    }

    async fn verify(&self, input: &DecisionInput, _timeout: Duration) -> VerificationResult {
        let threshold = self.config.min_consistency_threshold;
        let current = &input.context_result;

        let Some(previous) = input.previous_result.as_ref() else {
            return VerificationResult::pass(REPLAY_VERIFIER, 0.5, "No previous result")
                .with_evidence("consistency", serde_json::Value::Null)
                .with_evidence("threshold", json!(threshold))
                .with_evidence("current_summary_len", json!(current.summary.len()))
                .with_evidence("previous_summary_len", json!(0));
        };

        let (consistency, summary_sim, action_sim) = self.consistency(current, previous);
        let passed = consistency + THRESHOLD_EPSILON >= threshold;

        let result = if passed {
            VerificationResult::pass(
                REPLAY_VERIFIER,
                consistency,
                format!(
                    "Consistent with previous result ({:.1}% >= {:.1}%)",
                    consistency * 100.0,
                    threshold * 100.0
                ),
            )
        } else {
            VerificationResult::fail(
                REPLAY_VERIFIER,
                1.0 - consistency,
                format!(
                    "Inconsistent with previous result ({:.1}% < {:.1}%)",
                    consistency * 100.0,
                    threshold * 100.0
                ),
            )
        };

        result
            .with_evidence("consistency", json!(consistency))
            .with_evidence("threshold", json!(threshold))
            .with_evidence("summary_similarity", json!(summary_sim))
            .with_evidence("action_similarity", json!(action_sim))
            .with_evidence("current_summary_len", json!(current.summary.len()))
            .with_evidence("previous_summary_len", json!(previous.summary.len()))
    }
}
