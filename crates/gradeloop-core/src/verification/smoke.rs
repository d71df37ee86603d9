//! Smoke battery: cheap sanity checks over a result.
//!
//! Every enabled check runs; failures are collected rather than
//! short-circuited so the caller sees each violation.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{VerificationResult, Verifier};
use crate::domain::{DecisionError, DecisionInput, Result};

pub const SMOKE_VERIFIER: &str = "smoke";

/// Individual smoke checks. `None` in [`SmokeConfig`] disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokeCheck {
    MinSummaryItems,
    MaxSummaryItems,
    MinAffordances,
    MinItemLength,
    MaxItemLength,
    ForbiddenPattern,
    AffordanceFields,
    EmptySummaryItem,
}

impl SmokeCheck {
    /// Count or length shortfalls, as opposed to content problems.
    pub fn is_shortfall(&self) -> bool {
        matches!(
            self,
            SmokeCheck::MinSummaryItems
                | SmokeCheck::MaxSummaryItems
                | SmokeCheck::MinAffordances
                | SmokeCheck::MinItemLength
                | SmokeCheck::MaxItemLength
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeFailure {
    pub check: SmokeCheck,
    pub message: String,
}

impl SmokeFailure {
    /// Parse the structured failures out of a smoke verifier result.
    pub fn from_result(result: &VerificationResult) -> Vec<SmokeFailure> {
        result
            .evidence
            .get("failures")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    pub min_summary_items: Option<usize>,
    pub max_summary_items: Option<usize>,
    pub min_affordances: Option<usize>,
    /// Per summary item, in characters.
    pub min_item_length: Option<usize>,
    pub max_item_length: Option<usize>,
    /// Regular expressions matched against every summary item and affordance.
    pub forbidden_patterns: Vec<String>,
    pub check_affordance_fields: bool,
    pub check_empty_strings: bool,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            min_summary_items: Some(1),
            max_summary_items: Some(50),
            min_affordances: Some(0),
            min_item_length: Some(1),
            max_item_length: Some(2_000),
            forbidden_patterns: vec![
                r"(?i)<script\b".to_string(),
                r"(?i)ignore (all )?previous instructions".to_string(),
                r"(?i)\brm\s+-rf\b".to_string(),
            ],
            check_affordance_fields: true,
            check_empty_strings: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmokeVerifier {
    config: SmokeConfig,
    forbidden: Vec<Regex>,
}

impl SmokeVerifier {
    /// Fails if any forbidden pattern is not a valid regular expression.
    pub fn new(config: SmokeConfig) -> Result<Self> {
        let forbidden = config
            .forbidden_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| DecisionError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, forbidden })
    }

    pub fn config(&self) -> &SmokeConfig {
        &self.config
    }

    pub fn run_checks(&self, input: &DecisionInput) -> Vec<SmokeFailure> {
        let c = &self.config;
        let summary = &input.context_result.summary;
        let affordances = &input.context_result.affordances;
        let mut failures = Vec::new();
        let mut fail = |check, message: String| failures.push(SmokeFailure { check, message });

        if let Some(min) = c.min_summary_items {
            if summary.len() < min {
                fail(
                    SmokeCheck::MinSummaryItems,
                    format!("summary has {} item(s), minimum is {min}", summary.len()),
                );
            }
        }
        if let Some(max) = c.max_summary_items {
            if summary.len() > max {
                fail(
                    SmokeCheck::MaxSummaryItems,
                    format!("summary has {} item(s), maximum is {max}", summary.len()),
                );
            }
        }
        if let Some(min) = c.min_affordances {
            if affordances.len() < min {
                fail(
                    SmokeCheck::MinAffordances,
                    format!("{} affordance(s), minimum is {min}", affordances.len()),
                );
            }
        }

        for (i, item) in summary.iter().enumerate() {
            let len = item.chars().count();
            if let Some(min) = c.min_item_length {
                if len < min {
                    fail(
                        SmokeCheck::MinItemLength,
                        format!("summary[{i}] has {len} character(s), minimum is {min}"),
                    );
                }
            }
            if let Some(max) = c.max_item_length {
                if len > max {
                    fail(
                        SmokeCheck::MaxItemLength,
                        format!("summary[{i}] has {len} character(s), maximum is {max}"),
                    );
                }
            }
            if c.check_empty_strings && item.trim().is_empty() {
                fail(
                    SmokeCheck::EmptySummaryItem,
                    format!("summary[{i}] is empty"),
                );
            }
        }

        if c.check_affordance_fields {
            for (i, aff) in affordances.iter().enumerate() {
                if aff.action.trim().is_empty() {
                    fail(
                        SmokeCheck::AffordanceFields,
                        format!("affordances[{i}].action is empty"),
                    );
                }
                if aff.why.trim().is_empty() {
                    fail(
                        SmokeCheck::AffordanceFields,
                        format!("affordances[{i}].why is empty"),
                    );
                }
            }
        }

        let texts = summary.iter().map(String::as_str).chain(
            affordances
                .iter()
                .flat_map(|a| [a.action.as_str(), a.why.as_str()]),
        );
        for text in texts {
            for (pattern, re) in c.forbidden_patterns.iter().zip(&self.forbidden) {
                if re.is_match(text) {
                    fail(
                        SmokeCheck::ForbiddenPattern,
                        format!("forbidden pattern {pattern:?} matched"),
                    );
                }
            }
        }

        failures
    }
}

#[async_trait]
impl Verifier for SmokeVerifier {
    fn name(&self) -> &str {
        SMOKE_VERIFIER
    }

    async fn verify(&self, input: &DecisionInput, _timeout: Duration) -> VerificationResult {
        let failures = self.run_checks(input);
        let failures_json = serde_json::to_value(&failures).unwrap_or_default();

        let result = match failures.as_slice() {
            [] => VerificationResult::pass(SMOKE_VERIFIER, 1.0, "All smoke tests passed"),
            [only] => VerificationResult::fail(
                SMOKE_VERIFIER,
                1.0,
                format!("Smoke test failed: {}", only.message),
            ),
            [first, rest @ ..] => VerificationResult::fail(
                SMOKE_VERIFIER,
                1.0,
                format!(
                    "Smoke tests failed: {} (+{} more)",
                    first.message,
                    rest.len()
                ),
            ),
        };
        result.with_evidence("failures", failures_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Affordance, ContextResult, Metadata, Task};

    fn input(summary: &[&str], affordances: Vec<Affordance>) -> DecisionInput {
        DecisionInput::new(
            ContextResult::new(summary.iter().map(|s| s.to_string()).collect(), affordances),
            Task::new("triage"),
            Metadata::default(),
        )
    }

    fn checks(failures: &[SmokeFailure]) -> Vec<SmokeCheck> {
        failures.iter().map(|f| f.check).collect()
    }

    #[test]
    fn test_clean_result_passes_all_checks() {
        let v = SmokeVerifier::new(SmokeConfig::default()).unwrap();
        let i = input(&["test failed on login"], vec![Affordance::new("rerun", "flaky")]);
        assert!(v.run_checks(&i).is_empty());
    }

    #[test]
    fn test_all_failures_are_collected() {
        let v = SmokeVerifier::new(SmokeConfig::default()).unwrap();
        let i = input(&["", "please rm -rf /tmp"], vec![Affordance::new("", "why")]);
        let found = checks(&v.run_checks(&i));
        assert!(found.contains(&SmokeCheck::MinItemLength));
        assert!(found.contains(&SmokeCheck::EmptySummaryItem));
        assert!(found.contains(&SmokeCheck::AffordanceFields));
        assert!(found.contains(&SmokeCheck::ForbiddenPattern));
    }

    #[test]
    fn test_disabled_bounds_are_skipped() {
        let config = SmokeConfig {
            min_summary_items: None,
            min_item_length: None,
            check_empty_strings: false,
            ..SmokeConfig::default()
        };
        let v = SmokeVerifier::new(config).unwrap();
        assert!(v.run_checks(&input(&[], vec![])).is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = SmokeConfig {
            forbidden_patterns: vec!["(unclosed".to_string()],
            ..SmokeConfig::default()
        };
        assert!(matches!(
            SmokeVerifier::new(config),
            Err(DecisionError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_failures_round_trip_through_evidence() {
        let failure = SmokeFailure {
            check: SmokeCheck::MaxItemLength,
            message: "too long".to_string(),
        };
        let r = VerificationResult::fail(SMOKE_VERIFIER, 1.0, "x")
            .with_evidence("failures", serde_json::json!([failure.clone()]));
        assert_eq!(SmokeFailure::from_result(&r), vec![failure]);
    }
}
