use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Controls what receivers do with records still pending in the record channel once the
/// completion signal has fired.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Stop at the next wake-up, leaving pending records unprocessed.
    #[default]
    Discard,
    /// Keep taking records that were already handed off until the channel is empty.
    Drain,
}

/// Runtime configuration of a single pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Number of receivers consuming the record channel.
    ///
    /// A value of zero is normalized to a single receiver.
    #[serde(default = "default_receivers")]
    pub receivers: u16,
    /// Maximum wall-clock time, in milliseconds, a run is allowed to take.
    #[serde(default = "default_max_run_time_ms")]
    pub max_run_time_ms: u64,
    /// Behavior of receivers after the completion signal fires.
    #[serde(default)]
    pub drain_policy: DrainPolicy,
    /// Maximum number of idle decoded entities kept for reuse across receivers.
    #[serde(default = "default_entity_pool_capacity")]
    pub entity_pool_capacity: usize,
}

impl PipelineConfig {
    /// Default number of receivers.
    pub const DEFAULT_RECEIVERS: u16 = 1;

    /// Default maximum run time: 2 seconds.
    pub const DEFAULT_MAX_RUN_TIME_MS: u64 = 2_000;

    /// Default capacity of the entity reuse pool.
    pub const DEFAULT_ENTITY_POOL_CAPACITY: usize = 64;

    /// Returns the number of receivers to spawn, never less than one.
    pub fn effective_receivers(&self) -> usize {
        usize::from(self.receivers.max(1))
    }

    /// Converts a signed receiver count, as accepted on the command line, into a valid one.
    ///
    /// Non-positive values fall back to a single receiver.
    pub fn normalize_receivers(requested: i64) -> u16 {
        if requested <= 0 {
            return 1;
        }

        u16::try_from(requested).unwrap_or(u16::MAX)
    }

    /// Returns the maximum run time as a [`Duration`].
    pub fn max_run_time(&self) -> Duration {
        Duration::from_millis(self.max_run_time_ms)
    }

    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_run_time_ms == 0 {
            return Err(ValidationError::MaxRunTimeZero);
        }

        if self.entity_pool_capacity == 0 {
            return Err(ValidationError::EntityPoolCapacityZero);
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receivers: default_receivers(),
            max_run_time_ms: default_max_run_time_ms(),
            drain_policy: DrainPolicy::default(),
            entity_pool_capacity: default_entity_pool_capacity(),
        }
    }
}

fn default_receivers() -> u16 {
    PipelineConfig::DEFAULT_RECEIVERS
}

fn default_max_run_time_ms() -> u64 {
    PipelineConfig::DEFAULT_MAX_RUN_TIME_MS
}

fn default_entity_pool_capacity() -> usize {
    PipelineConfig::DEFAULT_ENTITY_POOL_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_receivers_are_normalized_to_one() {
        let config = PipelineConfig {
            receivers: 0,
            ..PipelineConfig::default()
        };

        assert_eq!(config.effective_receivers(), 1);
        assert_eq!(PipelineConfig::normalize_receivers(-3), 1);
        assert_eq!(PipelineConfig::normalize_receivers(0), 1);
        assert_eq!(PipelineConfig::normalize_receivers(8), 8);
        assert_eq!(PipelineConfig::normalize_receivers(i64::MAX), u16::MAX);
    }

    #[test]
    fn validate_rejects_zero_run_time() {
        let config = PipelineConfig {
            max_run_time_ms: 0,
            ..PipelineConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::MaxRunTimeZero)
        ));
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "receivers": 4, "drain_policy": "drain" }"#).unwrap();

        assert_eq!(config.receivers, 4);
        assert_eq!(config.drain_policy, DrainPolicy::Drain);
        assert_eq!(config.max_run_time(), Duration::from_secs(2));
        assert_eq!(
            config.entity_pool_capacity,
            PipelineConfig::DEFAULT_ENTITY_POOL_CAPACITY
        );
    }
}
