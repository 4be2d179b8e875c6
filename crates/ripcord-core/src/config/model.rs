//! Configuration data model

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::interrupt_key::InterruptKey;
use super::logging_config::LoggingConfig;
use crate::error::{RipcordError, RipcordResult};

/// Renderer refresh period for the live output panel
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 100;

/// How often executors poll the cancellation token
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

pub const MIN_INTERVAL_MS: u64 = 10;
pub const MAX_INTERVAL_MS: u64 = 2000;

/// Top-level runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub interrupt_key: InterruptKey,
    pub refresh_interval_ms: u64,
    pub poll_interval_ms: u64,
    /// Model turns allowed for one query
    pub max_steps: u32,
    /// Shell used by the shell tool (`<shell> -c <command>`)
    pub shell: String,
    pub logging: LoggingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interrupt_key: InterruptKey::Esc,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_steps: 20,
            shell: "bash".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject values that would make the runtime unresponsive or spin
    pub fn validate(&self) -> RipcordResult<()> {
        for (field, value) in [
            ("refresh_interval_ms", self.refresh_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&value) {
                return Err(RipcordError::invalid_field(
                    field,
                    format!("{value} is outside {MIN_INTERVAL_MS}..={MAX_INTERVAL_MS} ms"),
                ));
            }
        }
        if self.max_steps == 0 {
            return Err(RipcordError::invalid_field("max_steps", "must be at least 1"));
        }
        if self.shell.trim().is_empty() {
            return Err(RipcordError::invalid_field("shell", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.interrupt_key, InterruptKey::Esc);
        assert_eq!(config.refresh_interval(), Duration::from_millis(100));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_intervals() {
        let config = RuntimeConfig {
            poll_interval_ms: 5,
            ..RuntimeConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("5 is outside"));

        let config = RuntimeConfig {
            refresh_interval_ms: 10_000,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_steps() {
        let config = RuntimeConfig {
            max_steps: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
