//! Retry policy: maps a classified failure to a remediation action.
//!
//! Budgets are checked before the category strategy is applied:
//! `effective_limit = min(global_max_retries, category_max_retries[category])`
//! and a retry depth at or beyond it escalates regardless of category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ErrorCategory, RetryAction};

pub const SPECIALIST_DEFAULT: &str = "specialist-default";
pub const SPECIALIST_ADVANCED: &str = "specialist-advanced";
pub const SPECIALIST_STABILITY: &str = "specialist-stability";
pub const SPECIALIST_SELECTOR_HEAL: &str = "specialist-selector-heal";
pub const SPECIALIST_PERFORMANCE: &str = "specialist-performance";

/// Per-category retry budgets shared by [`RetryPolicy`] and
/// [`crate::retry_guard::RetryLimitGuard`]. Categories not listed use the
/// global limit.
pub fn default_category_limits() -> BTreeMap<ErrorCategory, u32> {
    BTreeMap::from([
        (ErrorCategory::SchemaViolation, 2),
        (ErrorCategory::MissingEvidence, 3),
        (ErrorCategory::PolicyDegraded, 0),
        (ErrorCategory::Timeout, 1),
        (ErrorCategory::Unknown, 1),
    ])
}

fn default_specialist_routing() -> BTreeMap<ErrorCategory, String> {
    BTreeMap::from([
        (ErrorCategory::FlakyPattern, SPECIALIST_STABILITY.to_string()),
        (ErrorCategory::SelectorIssue, SPECIALIST_SELECTOR_HEAL.to_string()),
        (ErrorCategory::Timeout, SPECIALIST_PERFORMANCE.to_string()),
    ])
}

/// Toggle between the two general-purpose specialists.
pub fn alternate_specialist(current: &str) -> &'static str {
    match current {
        SPECIALIST_DEFAULT => SPECIALIST_ADVANCED,
        SPECIALIST_ADVANCED => SPECIALIST_DEFAULT,
        _ => SPECIALIST_ADVANCED,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    pub global_max_retries: u32,
    pub category_max_retries: BTreeMap<ErrorCategory, u32>,
    /// Fixed target specialist per category; overrides the alternate toggle.
    pub specialist_routing: BTreeMap<ErrorCategory, String>,
    /// When false, a would-be escalation becomes a fallback `ACCEPT`.
    pub enable_escalation: bool,
    /// Token budget requested by `RETRY_EXPAND_CONTEXT` for missing evidence.
    pub expand_budget: u32,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            global_max_retries: 3,
            category_max_retries: default_category_limits(),
            specialist_routing: default_specialist_routing(),
            enable_escalation: true,
            expand_budget: 10_000,
        }
    }
}

/// Context adjustments the re-invocation layer must apply on retry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_schema: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_hints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_budget: Option<u32>,
}

impl ContextDelta {
    fn hint(hint: &str) -> Self {
        Self {
            add_hints: Some(vec![hint.to_string()]),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryDecision {
    pub action: RetryAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_specialist: Option<String>,
    /// Always `None` when `action` is `ESCALATE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_delta: Option<ContextDelta>,
    pub max_retries: u32,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryRequest<'a> {
    pub category: ErrorCategory,
    pub current_retry_depth: u32,
    pub current_specialist: &'a str,
    pub category_confidence: f64,
}

struct Strategy {
    action: RetryAction,
    target: Option<String>,
    delta: Option<ContextDelta>,
    reason: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryPolicyConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryPolicyConfig {
        &self.config
    }

    /// `min(global, category)`; categories without an override use the global limit.
    pub fn effective_limit(&self, category: ErrorCategory) -> u32 {
        let global = self.config.global_max_retries;
        self.config
            .category_max_retries
            .get(&category)
            .map_or(global, |&limit| limit.min(global))
    }

    pub fn decide(&self, req: &RetryRequest<'_>) -> RetryDecision {
        let limit = self.effective_limit(req.category);
        let depth = req.current_retry_depth;
        let global = self.config.global_max_retries;

        if depth >= global {
            return self.escalate(
                req,
                limit,
                format!(
                    "Global max retries reached ({depth}/{global}) for {}",
                    req.category
                ),
            );
        }
        if depth >= limit {
            let mut reason = format!(
                "Category max retries reached ({depth}/{limit}) for {}",
                req.category
            );
            if req.category == ErrorCategory::PolicyDegraded {
                reason.push_str("; policy degradation requires human review");
            }
            return self.escalate(req, limit, reason);
        }

        let strategy = self.strategy(req);
        debug!(
            category = %req.category,
            action = %strategy.action,
            depth,
            limit,
            "retry strategy selected"
        );
        RetryDecision {
            action: strategy.action,
            target_specialist: strategy.target,
            context_delta: strategy.delta,
            max_retries: limit,
            confidence: req.category_confidence,
            reason: format!("{} (attempt {}/{limit})", strategy.reason, depth + 1),
        }
    }

    fn strategy(&self, req: &RetryRequest<'_>) -> Strategy {
        let routed = self.config.specialist_routing.get(&req.category).cloned();
        let unchanged = || routed.clone().unwrap_or_else(|| req.current_specialist.to_string());
        let alternate = || {
            routed
                .clone()
                .unwrap_or_else(|| alternate_specialist(req.current_specialist).to_string())
        };

        match req.category {
            ErrorCategory::SchemaViolation => Strategy {
                action: RetryAction::RetryWithSchema,
                target: Some(unchanged()),
                delta: Some(ContextDelta {
                    include_schema: Some(true),
                    ..ContextDelta::hint("Output must match expected schema")
                }),
                reason: "Schema violation; retrying with the expected schema attached",
            },
            ErrorCategory::MissingEvidence => Strategy {
                action: RetryAction::RetryExpandContext,
                target: Some(unchanged()),
                delta: Some(ContextDelta {
                    expand_budget: Some(self.config.expand_budget),
                    ..ContextDelta::hint("Provide more detailed evidence for each finding")
                }),
                reason: "Missing evidence; retrying with an expanded context budget",
            },
            ErrorCategory::FlakyPattern => Strategy {
                action: RetryAction::RetryStability,
                target: Some(routed.clone().unwrap_or_else(|| SPECIALIST_STABILITY.to_string())),
                delta: Some(ContextDelta::hint(
                    "Prefer stable, deterministic patterns over timing-dependent ones",
                )),
                reason: "Flaky pattern; routing to stability specialist",
            },
            ErrorCategory::SelectorIssue => Strategy {
                action: RetryAction::RetrySelectorHeal,
                target: Some(
                    routed
                        .clone()
                        .unwrap_or_else(|| SPECIALIST_SELECTOR_HEAL.to_string()),
                ),
                delta: Some(ContextDelta::hint("Use robust selectors (roles, test ids, labels)")),
                reason: "Selector issue; routing to selector-heal specialist",
            },
            ErrorCategory::LowConfidence => Strategy {
                action: RetryAction::RetryDifferentSpecialist,
                target: Some(alternate()),
                delta: Some(ContextDelta::hint("Produce a higher confidence analysis")),
                reason: "Low confidence; retrying on a different specialist",
            },
            ErrorCategory::Timeout => Strategy {
                action: RetryAction::RetryDifferentSpecialist,
                target: Some(
                    routed
                        .clone()
                        .unwrap_or_else(|| SPECIALIST_PERFORMANCE.to_string()),
                ),
                delta: Some(ContextDelta::hint("Reduce latency; keep the analysis focused")),
                reason: "Timeout; routing to performance specialist",
            },
            ErrorCategory::Inconsistent => Strategy {
                action: RetryAction::RetryExpandContext,
                target: Some(unchanged()),
                delta: Some(ContextDelta::hint(
                    "Maintain consistency with previous results or explain the difference",
                )),
                reason: "Inconsistent with previous result; retrying with expanded context",
            },
            ErrorCategory::Unknown => Strategy {
                action: RetryAction::RetryDifferentSpecialist,
                target: Some(alternate()),
                delta: None,
                reason: "Unclassified failure; retrying on a different specialist",
            },
            // limit 0 by default, so this only runs under a custom budget
            ErrorCategory::PolicyDegraded => Strategy {
                action: RetryAction::RetryDifferentSpecialist,
                target: Some(alternate()),
                delta: Some(ContextDelta::hint("Comply with the active policy")),
                reason: "Policy degraded; retrying on a different specialist",
            },
        }
    }

    fn escalate(&self, req: &RetryRequest<'_>, limit: u32, reason: String) -> RetryDecision {
        if !self.config.enable_escalation {
            return RetryDecision {
                action: RetryAction::Accept,
                target_specialist: None,
                context_delta: None,
                max_retries: limit,
                confidence: req.category_confidence,
                reason: format!("Escalation disabled; accepting as fallback. {reason}"),
            };
        }
        RetryDecision {
            action: RetryAction::Escalate,
            target_specialist: None,
            context_delta: None,
            max_retries: limit,
            confidence: req.category_confidence,
            reason,
        }
    }
}
