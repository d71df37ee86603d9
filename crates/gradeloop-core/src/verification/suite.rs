//! Concurrent, timeout-bounded verifier execution.
//!
//! Each verifier runs in its own spawned task, so one that blocks its thread
//! cannot hold up its siblings. The caller waits on every task under
//! `tokio::time::timeout`. A verifier that misses its deadline, or finishes
//! after it, is replaced by a synthesized failure and its task is aborted.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

use super::{VerificationResult, Verifier};
use crate::domain::{DecisionError, DecisionInput, Result};
use crate::metrics::METRICS;
use crate::obs;

/// Suite execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Per-verifier deadline when the call does not override it.
    pub default_timeout_ms: u64,
    /// When set, only verifiers with these names run.
    pub enabled_verifiers: Option<Vec<String>>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5_000,
            enabled_verifiers: None,
        }
    }
}

impl SuiteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            return Err(DecisionError::InvalidConfig(
                "default_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Aggregate over every verifier that ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSuiteResult {
    /// AND over `results`; an empty run passes.
    pub passed: bool,
    /// In verifier registration order.
    pub results: Vec<VerificationResult>,
    pub average_confidence: f64,
}

impl VerificationSuiteResult {
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let passed = results.iter().all(|r| r.passed);
        let average_confidence = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
        };
        Self {
            passed,
            results,
            average_confidence,
        }
    }

    pub fn result_for(&self, verifier: &str) -> Option<&VerificationResult> {
        self.results.iter().find(|r| r.verifier == verifier)
    }

    pub fn failed(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Ordered registry of verifiers.
#[derive(Clone, Default)]
pub struct VerificationSuite {
    verifiers: Vec<Arc<dyn Verifier>>,
    config: SuiteConfig,
}

impl std::fmt::Debug for VerificationSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationSuite")
            .field("verifiers", &self.verifier_names())
            .field("config", &self.config)
            .finish()
    }
}

impl VerificationSuite {
    pub fn new(verifiers: Vec<Arc<dyn Verifier>>, config: SuiteConfig) -> Self {
        Self { verifiers, config }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Register a verifier. A verifier with the same name is replaced in place.
    pub fn add_verifier(&mut self, verifier: Arc<dyn Verifier>) {
        match self
            .verifiers
            .iter_mut()
            .find(|v| v.name() == verifier.name())
        {
            Some(slot) => *slot = verifier,
            None => self.verifiers.push(verifier),
        }
    }

    /// Remove a verifier by name. Returns whether one was removed.
    pub fn remove_verifier(&mut self, name: &str) -> bool {
        let before = self.verifiers.len();
        self.verifiers.retain(|v| v.name() != name);
        self.verifiers.len() != before
    }

    pub fn verifier_names(&self) -> Vec<String> {
        self.verifiers.iter().map(|v| v.name().to_string()).collect()
    }

    pub async fn verify(&self, input: &DecisionInput) -> VerificationSuiteResult {
        self.verify_with_timeout(input, self.config.default_timeout_ms)
            .await
    }

    /// Run the enabled verifiers with a per-call deadline override.
    pub async fn verify_with_timeout(
        &self,
        input: &DecisionInput,
        timeout_ms: u64,
    ) -> VerificationSuiteResult {
        let enabled = self.config.enabled_verifiers.as_ref();
        let shared = Arc::new(input.clone());

        let runs = self
            .verifiers
            .iter()
            .filter(|v| enabled.map_or(true, |names| names.iter().any(|n| n == v.name())))
            .map(|verifier| run_verifier(Arc::clone(verifier), Arc::clone(&shared), timeout_ms));

        let results = join_all(runs).await;
        let aggregate = VerificationSuiteResult::from_results(results);
        debug!(
            message_id = %input.metadata.message_id,
            passed = aggregate.passed,
            verifiers = aggregate.results.len(),
            average_confidence = aggregate.average_confidence,
            "verification suite finished"
        );
        aggregate
    }
}

async fn run_verifier(
    verifier: Arc<dyn Verifier>,
    input: Arc<DecisionInput>,
    timeout_ms: u64,
) -> VerificationResult {
    let timeout = Duration::from_millis(timeout_ms);
    let name = verifier.name().to_string();
    let started = Instant::now();

    let task_input = Arc::clone(&input);
    let handle =
        tokio::spawn(async move { verifier.verify(&task_input, timeout).await }.in_current_span());
    let abort = handle.abort_handle();

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(mut result)) => {
            let elapsed = started.elapsed();
            // a verifier that blocked its thread can complete past the deadline
            if elapsed > timeout {
                return timed_out(&input, &name, timeout_ms);
            }
            result.duration_ms = elapsed.as_secs_f64() * 1000.0;
            result
        }
        Ok(Err(join_error)) => {
            warn!(
                message_id = %input.metadata.message_id,
                verifier = %name,
                error = %join_error,
                "verifier task failed"
            );
            let mut result =
                VerificationResult::fail(name, 0.0, format!("verifier failed: {join_error}"));
            result.duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            result
        }
        Err(_elapsed) => {
            abort.abort();
            timed_out(&input, &name, timeout_ms)
        }
    }
}

fn timed_out(input: &DecisionInput, verifier: &str, timeout_ms: u64) -> VerificationResult {
    METRICS.inc_verifier_timeouts();
    obs::emit_verifier_timeout(&input.metadata.message_id, verifier, timeout_ms);
    VerificationResult::timed_out(verifier, timeout_ms)
}
