//! Aggregate configuration for a [`crate::DecisionLoop`].
//!
//! Loaded once at construction. Every section is optional in TOML and falls
//! back to its defaults:
//!
//! ```toml
//! accept_threshold = 0.8
//!
//! [qscore]
//! latency_budget_ms = 20000
//!
//! [suite]
//! default_timeout_ms = 2000
//!
//! [retry_policy]
//! global_max_retries = 2
//!
//! [telemetry]
//! format = "json"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierConfig;
use crate::decision_loop::DEFAULT_ACCEPT_THRESHOLD;
use crate::domain::{DecisionError, Result};
use crate::qscore::QScoreConfig;
use crate::retry_policy::RetryPolicyConfig;
use crate::telemetry::TelemetryConfig;
use crate::verification::{ExpectedSchema, ReplayConfig, SmokeConfig, SmokeVerifier, SuiteConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub accept_threshold: f64,
    pub qscore: QScoreConfig,
    pub suite: SuiteConfig,
    /// Default contract for the schema verifier.
    pub schema: ExpectedSchema,
    pub replay: ReplayConfig,
    pub smoke: SmokeConfig,
    pub classifier: ClassifierConfig,
    /// Also the source of [`crate::RetryLimitGuard::from_config`] budgets.
    pub retry_policy: RetryPolicyConfig,
    /// Read by hosts via [`crate::telemetry::init_from_config`].
    pub telemetry: TelemetryConfig,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            qscore: QScoreConfig::default(),
            suite: SuiteConfig::default(),
            schema: ExpectedSchema::default(),
            replay: ReplayConfig::default(),
            smoke: SmokeConfig::default(),
            classifier: ClassifierConfig::default(),
            retry_policy: RetryPolicyConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl DecisionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Reject out-of-range thresholds, zero timeouts, degenerate weights
    /// and forbidden patterns that do not compile.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.accept_threshold) {
            return Err(DecisionError::InvalidConfig(format!(
                "accept_threshold must be within [0, 1], got {}",
                self.accept_threshold
            )));
        }
        self.qscore.validate()?;
        self.suite.validate()?;
        self.replay.validate()?;
        self.classifier.validate()?;
        self.telemetry.parsed_level()?;
        SmokeVerifier::new(self.smoke.clone())?;
        Ok(())
    }
}
