//! Configuration for the model cache.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Limits and timers of one cache instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Hard limit in bytes; never exceeded at quiescent points.
    pub hard_limit_bytes: u64,

    /// Soft limit in bytes; admissions above it trigger preemptive eviction.
    pub soft_limit_bytes: u64,

    /// Seconds an unreferenced model may stay idle (`None` disables expiry).
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// How often the maintenance sweep runs in seconds (default: 60).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Errors that can occur during cache configuration validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    /// Invalid hard limit (must be > 0).
    #[error("Invalid hard limit: must be greater than 0")]
    InvalidHardLimit,

    /// Soft limit above the hard limit.
    #[error("Invalid soft limit: {soft} bytes exceeds hard limit of {hard} bytes")]
    SoftLimitAboveHardLimit {
        /// Configured soft limit.
        soft: u64,
        /// Configured hard limit.
        hard: u64,
    },

    /// Invalid TTL (must be > 0 when set).
    #[error("Invalid TTL: must be greater than 0")]
    InvalidTtl,

    /// Invalid sweep interval (must be > 0).
    #[error("Invalid sweep interval: must be greater than 0")]
    InvalidSweepInterval,
}

impl CacheConfig {
    /// Creates a configuration with TTL disabled and the default sweep interval.
    #[must_use]
    pub fn new(soft_limit_bytes: u64, hard_limit_bytes: u64) -> Self {
        Self {
            hard_limit_bytes,
            soft_limit_bytes,
            ttl_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }

    /// Enables idle expiry after `ttl_secs` seconds.
    #[must_use]
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    /// Sets the maintenance sweep interval.
    #[must_use]
    pub fn with_sweep_interval_secs(mut self, sweep_interval_secs: u64) -> Self {
        self.sweep_interval_secs = sweep_interval_secs;
        self
    }

    /// Validate the cache configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.hard_limit_bytes == 0 {
            return Err(CacheConfigError::InvalidHardLimit);
        }

        if self.soft_limit_bytes > self.hard_limit_bytes {
            return Err(CacheConfigError::SoftLimitAboveHardLimit {
                soft: self.soft_limit_bytes,
                hard: self.hard_limit_bytes,
            });
        }

        if self.ttl_secs == Some(0) {
            return Err(CacheConfigError::InvalidTtl);
        }

        if self.sweep_interval_secs == 0 {
            return Err(CacheConfigError::InvalidSweepInterval);
        }

        Ok(())
    }

    /// Get the TTL as a Duration.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }

    /// Get the sweep interval as a Duration.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_new() {
        let config = CacheConfig::new(800, 1000);
        assert_eq!(config.soft_limit_bytes, 800);
        assert_eq!(config.hard_limit_bytes, 1000);
        assert_eq!(config.ttl(), None);
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_validation_invalid_hard_limit() {
        let config = CacheConfig::new(0, 0);
        assert_eq!(config.validate(), Err(CacheConfigError::InvalidHardLimit));
    }

    #[test]
    fn test_cache_config_validation_soft_above_hard() {
        let config = CacheConfig::new(1001, 1000);
        assert_eq!(
            config.validate(),
            Err(CacheConfigError::SoftLimitAboveHardLimit { soft: 1001, hard: 1000 })
        );
    }

    #[test]
    fn test_cache_config_validation_invalid_ttl() {
        let config = CacheConfig::new(800, 1000).with_ttl_secs(0);
        assert_eq!(config.validate(), Err(CacheConfigError::InvalidTtl));
    }

    #[test]
    fn test_cache_config_validation_invalid_sweep_interval() {
        let config = CacheConfig::new(800, 1000).with_sweep_interval_secs(0);
        assert_eq!(config.validate(), Err(CacheConfigError::InvalidSweepInterval));
    }

    #[test]
    fn test_cache_config_durations() {
        let config = CacheConfig::new(800, 1000).with_ttl_secs(1800).with_sweep_interval_secs(300);

        assert_eq!(config.ttl(), Some(Duration::from_secs(1800)));
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
    }
}
