//! Retry routing table, budget overrides, and agreement with the guard.

use gradeloop_core::{
    alternate_specialist, DecisionConfig, DecisionError, ErrorCategory, RetryAction,
    RetryLimitGuard, RetryPolicy, RetryPolicyConfig, RetryRequest,
};

fn request(category: ErrorCategory, depth: u32, specialist: &str) -> RetryRequest<'_> {
    RetryRequest {
        category,
        current_retry_depth: depth,
        current_specialist: specialist,
        category_confidence: 0.8,
    }
}

#[test]
fn first_attempt_follows_strategy_table() {
    let policy = RetryPolicy::default();
    let cases = [
        (ErrorCategory::SchemaViolation, RetryAction::RetryWithSchema, "specialist-default"),
        (ErrorCategory::MissingEvidence, RetryAction::RetryExpandContext, "specialist-default"),
        (ErrorCategory::FlakyPattern, RetryAction::RetryStability, "specialist-stability"),
        (ErrorCategory::SelectorIssue, RetryAction::RetrySelectorHeal, "specialist-selector-heal"),
        (
            ErrorCategory::LowConfidence,
            RetryAction::RetryDifferentSpecialist,
            "specialist-advanced",
        ),
        (ErrorCategory::Timeout, RetryAction::RetryDifferentSpecialist, "specialist-performance"),
        (ErrorCategory::Inconsistent, RetryAction::RetryExpandContext, "specialist-default"),
        (ErrorCategory::Unknown, RetryAction::RetryDifferentSpecialist, "specialist-advanced"),
    ];

    for (category, action, target) in cases {
        let decision = policy.decide(&request(category, 0, "specialist-default"));
        assert_eq!(decision.action, action, "{category}");
        assert_eq!(decision.target_specialist.as_deref(), Some(target), "{category}");
        assert_eq!(decision.confidence, 0.8);
    }
}

#[test]
fn context_deltas_match_category() {
    let policy = RetryPolicy::default();

    let missing = policy.decide(&request(ErrorCategory::MissingEvidence, 0, "specialist-default"));
    assert_eq!(missing.context_delta.unwrap().expand_budget, Some(10_000));

    let flaky = policy.decide(&request(ErrorCategory::FlakyPattern, 0, "specialist-default"));
    let hints = flaky.context_delta.unwrap().add_hints.unwrap();
    assert!(hints[0].contains("stable, deterministic patterns"));

    let unknown = policy.decide(&request(ErrorCategory::Unknown, 0, "specialist-default"));
    assert!(unknown.context_delta.is_none());
}

#[test]
fn policy_degraded_always_escalates() {
    let policy = RetryPolicy::default();
    let decision = policy.decide(&request(ErrorCategory::PolicyDegraded, 0, "specialist-default"));
    assert_eq!(decision.action, RetryAction::Escalate);
    assert!(decision.reason.contains("Category max retries reached (0/0)"));
    assert!(decision.context_delta.is_none());
    assert!(decision.target_specialist.is_none());
}

#[test]
fn category_limit_escalates_before_global() {
    let policy = RetryPolicy::default();
    let timeout = policy.decide(&request(ErrorCategory::Timeout, 1, "specialist-default"));
    assert_eq!(timeout.action, RetryAction::Escalate);
    assert!(timeout.reason.contains("Category max retries reached (1/1)"));

    let schema = policy.decide(&request(ErrorCategory::SchemaViolation, 1, "specialist-default"));
    assert_eq!(schema.action, RetryAction::RetryWithSchema);
    assert!(schema.reason.contains("attempt 2/2"));
}

#[test]
fn global_limit_message_wins_when_both_exhausted() {
    let policy = RetryPolicy::default();
    let decision = policy.decide(&request(ErrorCategory::SchemaViolation, 5, "specialist-default"));
    assert_eq!(decision.action, RetryAction::Escalate);
    assert!(decision.reason.contains("Global max retries reached (5/3)"));
}

#[test]
fn alternate_specialist_toggles() {
    assert_eq!(alternate_specialist("specialist-default"), "specialist-advanced");
    assert_eq!(alternate_specialist("specialist-advanced"), "specialist-default");
    assert_eq!(alternate_specialist("someone-else"), "specialist-advanced");

    let decision = RetryPolicy::default().decide(&request(
        ErrorCategory::LowConfidence,
        0,
        "specialist-advanced",
    ));
    assert_eq!(decision.target_specialist.as_deref(), Some("specialist-default"));
}

#[test]
fn disabled_escalation_yields_accept_fallback() {
    let policy = RetryPolicy::new(RetryPolicyConfig {
        enable_escalation: false,
        ..RetryPolicyConfig::default()
    });
    let decision = policy.decide(&request(ErrorCategory::PolicyDegraded, 0, "specialist-default"));
    assert_eq!(decision.action, RetryAction::Accept);
    assert!(decision.context_delta.is_none());
}

#[test]
fn custom_routing_overrides_targets() {
    let mut config = RetryPolicyConfig::default();
    config
        .specialist_routing
        .insert(ErrorCategory::LowConfidence, "specialist-expert".to_string());
    let decision = RetryPolicy::new(config).decide(&request(
        ErrorCategory::LowConfidence,
        0,
        "specialist-default",
    ));
    assert_eq!(decision.target_specialist.as_deref(), Some("specialist-expert"));
}

#[test]
fn guard_and_policy_agree_on_budgets() {
    let policy = RetryPolicy::default();
    let guard = RetryLimitGuard::default();
    for category in ErrorCategory::ALL {
        assert_eq!(
            policy.effective_limit(category),
            guard.max_attempts(category),
            "{category}"
        );
        for attempt in 0..5 {
            let retries = policy
                .decide(&request(category, attempt, "specialist-default"))
                .action
                .is_retry();
            assert_eq!(retries, guard.is_retry_allowed(attempt, category), "{category}@{attempt}");
        }
    }
}

#[test]
fn guard_rejects_exhausted_budget() {
    let guard = RetryLimitGuard::default();
    assert_eq!(guard.remaining_attempts(0, ErrorCategory::Timeout), 1);
    let err = guard
        .ensure_retry_allowed(1, ErrorCategory::Timeout)
        .unwrap_err();
    assert!(matches!(err, DecisionError::RetryLimitExceeded { max_attempts: 1, .. }));
}

#[test]
fn guard_follows_configured_policy_budgets() {
    let config = DecisionConfig::from_toml_str(
        r#"
        [retry_policy]
        global_max_retries = 2

        [retry_policy.category_max_retries]
        TIMEOUT = 2
        "#,
    )
    .unwrap();
    let policy = RetryPolicy::new(config.retry_policy.clone());
    let guard = RetryLimitGuard::from_config(&config);

    assert_eq!(guard.max_attempts(ErrorCategory::MissingEvidence), 2);
    assert_eq!(guard.max_attempts(ErrorCategory::Timeout), 2);
    // replacing the table drops the other default overrides
    assert_eq!(guard.max_attempts(ErrorCategory::PolicyDegraded), 2);
    for category in ErrorCategory::ALL {
        assert_eq!(
            policy.effective_limit(category),
            guard.max_attempts(category),
            "{category}"
        );
    }
}
