//! Runtime tunables.
//!
//! Loaded from an optional TOML file, then overridden field by field from the
//! environment. Every field has a default, so an empty file (or no file) is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::env;
use crate::error::ConfigError;
use liquidator_api::PriorityLevel;
use liquidator_chain::DEFAULT_COMMITMENT;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Bot tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Seconds between polling cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// RPC commitment level (processed, confirmed, finalized)
    #[serde(default)]
    pub commitment: Option<String>,

    /// Urgency passed to the priority fee estimator
    #[serde(default)]
    pub priority_level: PriorityLevel,

    /// Send attempts per liquidation transaction
    #[serde(default = "default_max_send_attempts")]
    pub max_send_attempts: u32,

    /// Index of the exchange to watch
    #[serde(default)]
    pub exchange_index: u64,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_interval_secs() -> u64 {
    300
}
fn default_max_send_attempts() -> u32 {
    5
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            commitment: None,
            priority_level: PriorityLevel::default(),
            max_send_attempts: default_max_send_attempts(),
            exchange_index: 0,
            log_format: LogFormat::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let file_error = |reason: String| ConfigError::File {
            path: path.to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let config: Self = toml::from_str(&content).map_err(|e| file_error(e.to_string()))?;
        config.validate()
    }

    /// Load from `LIQUIDATOR_CONFIG` (if set) and apply environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`BotConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base = match non_empty(&lookup, env::CONFIG_PATH) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        base.with_overrides(lookup)
    }

    /// Override fields from environment-style variables.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = non_empty(&lookup, env::INTERVAL) {
            self.interval_secs = parse_var(env::INTERVAL, &value)?;
        }
        if let Some(value) = non_empty(&lookup, env::COMMITMENT) {
            self.commitment = Some(value);
        }
        if let Some(value) = non_empty(&lookup, env::PRIORITY_LEVEL) {
            self.priority_level = parse_var(env::PRIORITY_LEVEL, &value)?;
        }
        if let Some(value) = non_empty(&lookup, env::MAX_SEND_ATTEMPTS) {
            self.max_send_attempts = parse_var(env::MAX_SEND_ATTEMPTS, &value)?;
        }
        if let Some(value) = non_empty(&lookup, env::EXCHANGE_INDEX) {
            self.exchange_index = parse_var(env::EXCHANGE_INDEX, &value)?;
        }
        if let Some(value) = non_empty(&lookup, env::LOG_FORMAT) {
            self.log_format = parse_var(env::LOG_FORMAT, &value)?;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_send_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: env::MAX_SEND_ATTEMPTS,
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Commitment level, falling back to `confirmed`.
    pub fn commitment(&self) -> &str {
        self.commitment.as_deref().unwrap_or(DEFAULT_COMMITMENT)
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(
            interval_secs = self.interval_secs,
            commitment = self.commitment(),
            exchange_index = self.exchange_index,
            "Scanner configuration"
        );
        tracing::info!(
            priority_level = %self.priority_level,
            max_send_attempts = self.max_send_attempts,
            "Liquidation parameters"
        );
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
