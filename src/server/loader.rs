//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let environment = std::env::var("GREENWAVE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = Config::builder()
        // 1. Embedded defaults
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", environment)).required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables, e.g. GREENWAVE_SCHEDULER__MAX_CONCURRENT
        .add_source(
            Environment::with_prefix("GREENWAVE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert!(config.api.base_url.is_none());
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_jobs_table_deserializes() {
        let toml = r#"
            [[jobs]]
            identity = "nightly-report"
            fixed_window = "01:00 05:00"
            zone = "nl"
            duration = "1h"
            time_zone = "Europe/Amsterdam"
            skip_overlapping = true
            command = "echo report"
        "#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.jobs.len(), 1);
        let job = &config.jobs[0];
        assert_eq!(job.identity, "nightly-report");
        assert_eq!(job.fixed_window.as_deref(), Some("01:00 05:00"));
        assert!(job.skip_overlapping);
        assert!(job.skip_predicate.is_none());
    }
}
