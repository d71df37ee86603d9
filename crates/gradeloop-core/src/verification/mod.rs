//! Verification: independent pass/fail checks over a specialist result.
//!
//! Each verifier implements [`Verifier`]; a [`VerificationSuite`] runs them
//! concurrently, each under its own timeout, and aggregates the results.
//!
//! # Modules
//!
//! - [`suite`]: `VerificationSuite`, `SuiteConfig`, `VerificationSuiteResult`
//! - [`schema`]: structural contract check (`SchemaVerifier`, `ExpectedSchema`)
//! - [`replay`]: similarity against the previous attempt (`ReplayConsistencyVerifier`)
//! - [`smoke`]: configurable sanity battery (`SmokeVerifier`, `SmokeCheck`)

pub mod replay;
pub mod schema;
pub mod smoke;
pub mod suite;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DecisionInput;

pub use replay::{ReplayConfig, ReplayConsistencyVerifier, REPLAY_VERIFIER};
pub use schema::{validate_context_value, ExpectedSchema, SchemaVerifier, SCHEMA_VERIFIER};
pub use smoke::{SmokeCheck, SmokeConfig, SmokeFailure, SmokeVerifier, SMOKE_VERIFIER};
pub use suite::{SuiteConfig, VerificationSuite, VerificationSuiteResult};

/// Outcome of one verifier for one call. Never mutated once returned by the suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verifier: String,
    pub passed: bool,
    /// In [0, 1].
    pub confidence: f64,
    pub reason: String,
    pub evidence: serde_json::Map<String, serde_json::Value>,
    pub duration_ms: f64,
}

impl VerificationResult {
    pub fn pass(verifier: impl Into<String>, confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(verifier, true, confidence, reason)
    }

    pub fn fail(verifier: impl Into<String>, confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(verifier, false, confidence, reason)
    }

    fn new(
        verifier: impl Into<String>,
        passed: bool,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            verifier: verifier.into(),
            passed,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            evidence: serde_json::Map::new(),
            duration_ms: 0.0,
        }
    }

    /// Result synthesized for a verifier that missed its deadline.
    pub fn timed_out(verifier: impl Into<String>, timeout_ms: u64) -> Self {
        let mut result = Self::fail(verifier, 0.0, "verifier timeout");
        result.duration_ms = timeout_ms as f64;
        result
            .evidence
            .insert("timeout_ms".to_string(), serde_json::json!(timeout_ms));
        result
    }

    pub fn with_evidence(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.evidence.insert(key.into(), value);
        self
    }
}

/// A single independent check.
///
/// Implementations must not panic on malformed input: any internal fault is
/// reported as a failed [`VerificationResult`] with an explanatory reason.
/// The suite runs each call in its own task and aborts it at `timeout`;
/// work that blocks the thread still completes, but its result is discarded.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Stable identifier, used for allow-lists and classification.
    fn name(&self) -> &str;

    async fn verify(&self, input: &DecisionInput, timeout: Duration) -> VerificationResult;
}
