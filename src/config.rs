//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{DEFAULT_EVICTION_FAIL_FACTOR, DEFAULT_MOVE_FRONT_WINDOW};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of live entries, 0 = unbounded
    pub max_entries: usize,
    /// Expiration applied on insert in milliseconds, 0 = entries never expire
    pub expiration_ms: u64,
    /// Non-reclaimable entries an eviction scan tolerates per requested slot
    pub eviction_fail_factor: usize,
    /// Keys within this many head positions are not moved by `move_front`
    pub move_front_window: usize,
    /// Background cleanup task interval in milliseconds
    pub cleanup_interval_ms: u64,
    /// Consecutive live entries the cleanup sweep passes before stopping
    pub cleanup_max_failures: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum live entries (default: 1000)
    /// - `EXPIRATION_MS` - Entry expiration in milliseconds (default: 0, disabled)
    /// - `EVICTION_FAIL_FACTOR` - Eviction scan fail budget multiplier (default: 3)
    /// - `MOVE_FRONT_WINDOW` - Head positions left alone by move-front (default: 2)
    /// - `CLEANUP_INTERVAL_MS` - Cleanup frequency in milliseconds (default: 1000)
    /// - `CLEANUP_MAX_FAILURES` - Cleanup sweep live-entry budget (default: 16)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            expiration_ms: env_or("EXPIRATION_MS", defaults.expiration_ms),
            eviction_fail_factor: env_or("EVICTION_FAIL_FACTOR", defaults.eviction_fail_factor),
            move_front_window: env_or("MOVE_FRONT_WINDOW", defaults.move_front_window),
            cleanup_interval_ms: env_or("CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            cleanup_max_failures: env_or("CLEANUP_MAX_FAILURES", defaults.cleanup_max_failures),
        }
    }

    /// Expiration as a duration, `None` when disabled.
    pub fn expiration(&self) -> Option<Duration> {
        (self.expiration_ms > 0).then(|| Duration::from_millis(self.expiration_ms))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            expiration_ms: 0,
            eviction_fail_factor: DEFAULT_EVICTION_FAIL_FACTOR,
            move_front_window: DEFAULT_MOVE_FRONT_WINDOW,
            cleanup_interval_ms: 1000,
            cleanup_max_failures: 16,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.expiration_ms, 0);
        assert_eq!(config.eviction_fail_factor, 3);
        assert_eq!(config.move_front_window, 2);
        assert_eq!(config.cleanup_interval_ms, 1000);
        assert_eq!(config.cleanup_max_failures, 16);
        assert!(config.expiration().is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("MAX_ENTRIES");
        env::remove_var("EXPIRATION_MS");
        env::remove_var("EVICTION_FAIL_FACTOR");
        env::remove_var("MOVE_FRONT_WINDOW");
        env::remove_var("CLEANUP_INTERVAL_MS");
        env::remove_var("CLEANUP_MAX_FAILURES");

        let config = Config::from_env();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.expiration_ms, 0);
        assert_eq!(config.eviction_fail_factor, 3);
        assert_eq!(config.move_front_window, 2);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_expiration_duration() {
        let config = Config {
            expiration_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.expiration(), Some(Duration::from_millis(250)));
    }
}
