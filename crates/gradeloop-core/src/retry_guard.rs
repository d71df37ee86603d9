//! Retry-limit guard: a cheap yes/no budget check.
//!
//! Independent of [`crate::retry_policy::RetryPolicy`]'s routing. Built from a
//! [`DecisionConfig`] it reads the policy's budgets, so both agree on limits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::DecisionConfig;
use crate::domain::{DecisionError, ErrorCategory, Result};
use crate::retry_policy::{default_category_limits, RetryPolicyConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryLimitConfig {
    pub global_max_attempts: u32,
    pub category_overrides: BTreeMap<ErrorCategory, u32>,
}

impl Default for RetryLimitConfig {
    fn default() -> Self {
        Self {
            global_max_attempts: 3,
            category_overrides: default_category_limits(),
        }
    }
}

impl From<&RetryPolicyConfig> for RetryLimitConfig {
    fn from(policy: &RetryPolicyConfig) -> Self {
        Self {
            global_max_attempts: policy.global_max_retries,
            category_overrides: policy.category_max_retries.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryLimitGuard {
    config: RetryLimitConfig,
}

impl RetryLimitGuard {
    pub fn new(config: RetryLimitConfig) -> Self {
        Self { config }
    }

    /// Guard over the same budgets as the loop's retry policy.
    pub fn from_config(config: &DecisionConfig) -> Self {
        Self::new(RetryLimitConfig::from(&config.retry_policy))
    }

    /// `min(global, category override)`.
    pub fn max_attempts(&self, category: ErrorCategory) -> u32 {
        let global = self.config.global_max_attempts;
        self.config
            .category_overrides
            .get(&category)
            .map_or(global, |&limit| limit.min(global))
    }

    pub fn is_retry_allowed(&self, current_attempt: u32, category: ErrorCategory) -> bool {
        current_attempt < self.max_attempts(category)
    }

    /// Non-increasing in `current_attempt`, floors at 0.
    pub fn remaining_attempts(&self, current_attempt: u32, category: ErrorCategory) -> u32 {
        self.max_attempts(category).saturating_sub(current_attempt)
    }

    pub fn ensure_retry_allowed(
        &self,
        current_attempt: u32,
        category: ErrorCategory,
    ) -> Result<()> {
        if self.is_retry_allowed(current_attempt, category) {
            return Ok(());
        }
        Err(DecisionError::RetryLimitExceeded {
            category,
            attempt: current_attempt,
            max_attempts: self.max_attempts(category),
        })
    }
}
