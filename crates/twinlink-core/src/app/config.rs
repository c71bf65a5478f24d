//! Configuration for the correlator and per-call options.
//!
//! Durations are written as milliseconds in JSON (`default_timeout_ms`,
//! `base_delay_ms`) so a config file stays readable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;
use crate::domain::ValidationError;

/// Correlator-wide defaults.
///
/// # JSON 例
/// ```json
/// { "default_timeout_ms": 5000, "response_required": true,
///   "retry": { "max_attempts": 3, "base_delay_ms": 200, "multiplier": 2.0 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Applied when a call does not carry its own timeout.
    #[serde(rename = "default_timeout_ms", with = "duration_ms")]
    pub default_timeout: Duration,

    /// Applied when a call does not say whether it expects a response.
    pub response_required: bool,

    /// Used by the management client; the correlator itself never retries.
    pub retry: RetryPolicy,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
            response_required: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl CorrelatorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        self.retry.validate()
    }
}

/// Recognized per-call options. Unset fields fall back to [`CorrelatorConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub response_required: Option<bool>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fire-and-forget: the handle completes once the transport accepted the command.
    pub fn without_response(mut self) -> Self {
        self.response_required = Some(false);
        self
    }

    pub(crate) fn resolve(
        &self,
        config: &CorrelatorConfig,
    ) -> Result<(Duration, bool), ValidationError> {
        let timeout = self.timeout.unwrap_or(config.default_timeout);
        if timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        let response_required = self.response_required.unwrap_or(config.response_required);
        Ok((timeout, response_required))
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config = CorrelatorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CorrelatorConfig::default());
        assert_eq!(config.default_timeout, Duration::from_secs(10));
        assert!(config.response_required);
    }

    #[test]
    fn parses_millisecond_fields() {
        let config = CorrelatorConfig::from_json_str(
            r#"{"default_timeout_ms": 250, "retry": {"max_attempts": 3, "base_delay_ms": 50}}"#,
        )
        .unwrap();

        assert_eq!(config.default_timeout, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(50));
    }

    #[test]
    fn zero_default_timeout_is_invalid() {
        let config = CorrelatorConfig {
            default_timeout: Duration::ZERO,
            ..CorrelatorConfig::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::ZeroTimeout));
    }

    #[test]
    fn call_options_fall_back_to_config() {
        let config = CorrelatorConfig::default();

        let (timeout, required) = CallOptions::new().resolve(&config).unwrap();
        assert_eq!(timeout, config.default_timeout);
        assert!(required);

        let (timeout, required) = CallOptions::new()
            .with_timeout(Duration::from_millis(100))
            .without_response()
            .resolve(&config)
            .unwrap();
        assert_eq!(timeout, Duration::from_millis(100));
        assert!(!required);

        assert_eq!(
            CallOptions::new().with_timeout(Duration::ZERO).resolve(&config),
            Err(ValidationError::ZeroTimeout)
        );
    }

    #[test]
    fn negative_retry_multiplier_is_invalid() {
        let config = CorrelatorConfig::from_json_str(
            r#"{"retry": {"max_attempts": 3, "base_delay_ms": 200, "multiplier": -1.0}}"#,
        )
        .unwrap();
        assert_eq!(config.validate(), Err(ValidationError::InvalidRetryMultiplier));
    }
}
