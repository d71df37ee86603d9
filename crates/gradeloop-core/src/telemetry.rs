//! Tracing subscriber set-up for hosts embedding the decision loop.
//!
//! The library itself never installs a subscriber. Only the first successful
//! installation per process takes effect.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{DecisionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    /// Newline-delimited JSON.
    Json,
}

/// `[telemetry]` section of [`crate::DecisionConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub level: String,
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "info".to_string(),
            with_target: false,
        }
    }
}

impl TelemetryConfig {
    pub fn parsed_level(&self) -> Result<Level> {
        Level::from_str(&self.level).map_err(|_| {
            DecisionError::InvalidConfig(format!("unknown log level {:?}", self.level))
        })
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let format = if json { LogFormat::Json } else { LogFormat::Text };
    install(format, level, false)
}

pub fn init_from_config(config: &TelemetryConfig) -> Result<bool> {
    let level = config.parsed_level()?;
    Ok(install(config.format, level, config.with_target))
}

fn install(format: LogFormat, level: Level, with_target: bool) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let json = (format == LogFormat::Json).then(|| fmt::layer().with_target(with_target).json());
    let text = (format == LogFormat::Text).then(|| fmt::layer().with_target(with_target));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(text)
        .try_init()
        .is_ok()
}
