//! Scheduler configuration
//!
//! All fields carry serde defaults so a partial `[scheduler]` table in the
//! application config deserializes cleanly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the orchestrator loop behaves when `start()` is called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// Start once at least one job is registered (or the caller forces it)
    #[default]
    Normal,
    /// Always start, even with an empty registry
    Forced,
    /// Start the loop, but begin paused
    Halted,
}

/// Intensity cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of an entry holding empty data, in seconds
    #[serde(default = "default_empty_value_ttl_secs")]
    pub empty_value_ttl_secs: u64,
}

fn default_empty_value_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            empty_value_ttl_secs: default_empty_value_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Lifetime of an empty entry as a chrono duration
    #[must_use]
    pub fn empty_value_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.empty_value_ttl_secs as i64)
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Period of the trigger check loop in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Maximum concurrent job executions (worker pool size)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Grace period for in-flight jobs at shutdown, in seconds
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Start behaviour
    #[serde(default)]
    pub start_mode: StartMode,
    /// Capacity of the broadcast event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Intensity cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_max_concurrent() -> usize {
    10
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_concurrent: default_max_concurrent(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            start_mode: StartMode::default(),
            event_capacity: default_event_capacity(),
            cache: CacheConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick interval
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set max concurrent executions
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the shutdown grace period
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_secs = grace.as_secs();
        self
    }

    /// Set the start mode
    #[must_use]
    pub fn with_start_mode(mut self, mode: StartMode) -> Self {
        self.start_mode = mode;
        self
    }

    /// Set the lifetime of empty cache entries
    #[must_use]
    pub fn with_empty_value_ttl(mut self, ttl: Duration) -> Self {
        self.cache.empty_value_ttl_secs = ttl.as_secs();
        self
    }

    /// Tick interval as a std duration
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Shutdown grace period as a std duration
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.start_mode, StartMode::Normal);
        assert_eq!(config.cache.empty_value_ttl(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"max_concurrent": 2, "start_mode": "halted"}"#).unwrap();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.start_mode, StartMode::Halted);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.cache.empty_value_ttl_secs, 3600);
    }

    #[test]
    fn test_builder_methods() {
        let config = SchedulerConfig::new()
            .with_max_concurrent(3)
            .with_shutdown_grace(Duration::from_secs(5))
            .with_start_mode(StartMode::Forced)
            .with_empty_value_ttl(Duration::from_secs(60));
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.start_mode, StartMode::Forced);
        assert_eq!(config.cache.empty_value_ttl_secs, 60);
    }
}
