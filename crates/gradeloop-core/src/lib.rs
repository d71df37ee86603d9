//! Gradeloop Core Library
//!
//! Deterministic decision core for specialist results: score, verify,
//! classify, then accept, retry or escalate.

pub mod classifier;
pub mod config;
pub mod decision_loop;
pub mod domain;
pub mod events;
pub mod idempotency;
pub mod metrics;
pub mod obs;
pub mod qscore;
pub mod retry_guard;
pub mod retry_policy;
pub mod telemetry;
pub mod verification;

pub use classifier::{
    ClassificationContext, ClassifierConfig, ErrorClassification, ErrorClassifier,
};

pub use config::DecisionConfig;

pub use decision_loop::{standard_suite, DecisionLoop, DecisionResult, DEFAULT_ACCEPT_THRESHOLD};

pub use domain::{
    Affordance, ContextResult, DecisionError, DecisionInput, ErrorCategory, Metadata, Result,
    RetryAction, Task,
};

pub use events::{previous_result_from_event, record_decision};

pub use idempotency::{canonical_json, generate_idempotency_key, IdempotencyKey, IdempotencyParams};

pub use qscore::{compute_qscore, QScoreConfig, QScoreResult, QScoreSignals, QualityScorer};

pub use retry_guard::{RetryLimitConfig, RetryLimitGuard};

pub use retry_policy::{
    alternate_specialist, ContextDelta, RetryDecision, RetryPolicy, RetryPolicyConfig,
    RetryRequest,
};

pub use verification::{
    validate_context_value, ExpectedSchema, ReplayConfig, ReplayConsistencyVerifier,
    SchemaVerifier, SmokeCheck, SmokeConfig, SmokeFailure, SmokeVerifier, SuiteConfig,
    VerificationResult, VerificationSuite, VerificationSuiteResult, Verifier,
};

pub use gradeloop_ledger::{
    DecisionOutcome, EventQuery, GradingEvent, GradingEventStore, MemoryGradingEventStore,
    StorageError,
};

/// Gradeloop version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
