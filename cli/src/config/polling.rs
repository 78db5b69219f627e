//! Deployment status polling configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

use crate::domain::tracking::{
    PollSchedule, DEFAULT_ATTEMPTS, DEFAULT_INITIAL_WAIT, DEFAULT_INTERVAL,
};
use crate::error::ConfigError;

/// Polling configuration (`polling:` block)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Number of status fetches before giving up
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Wait before the first status fetch (e.g. "4s")
    #[serde(default = "default_initial_wait", with = "human_duration")]
    pub initial_wait: Duration,

    /// Wait between later status fetches (e.g. "8s")
    #[serde(default = "default_interval", with = "human_duration")]
    pub interval: Duration,
}

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_initial_wait() -> Duration {
    DEFAULT_INITIAL_WAIT
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_wait: default_initial_wait(),
            interval: default_interval(),
        }
    }
}

impl PollingConfig {
    /// Validate polling configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.attempts".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            attempts: self.attempts,
            initial_wait: self.initial_wait,
            interval: self.interval,
        }
    }
}

/// Durations written the humantime way ("4s", "1m 30s")
mod human_duration {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_schedule() {
        let config = PollingConfig::default();
        assert_eq!(config.schedule(), PollSchedule::default());
    }

    #[test]
    fn test_parse_human_durations() {
        let config: PollingConfig =
            serde_yaml::from_str("attempts: 5\ninitial_wait: 500ms\ninterval: 1m 30s\n").unwrap();
        assert_eq!(config.attempts, 5);
        assert_eq!(config.initial_wait, Duration::from_millis(500));
        assert_eq!(config.interval, Duration::from_secs(90));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = PollingConfig {
            attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
