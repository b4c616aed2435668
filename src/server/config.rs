//! Application configuration types
//!
//! Contains the configuration structures for the greenwave daemon.

use greenwave_api::{FileConfig, ForecastConfig};
use greenwave_core::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Primary forecast service
    #[serde(default)]
    pub api: ForecastConfig,
    /// Fallback intensity file
    #[serde(default)]
    pub fallback: FileConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// One configured job, run as a shell command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    pub identity: String,
    /// `"HH:MM HH:MM"`
    #[serde(default)]
    pub fixed_window: Option<String>,
    /// `"<initial max delay> <min gap> <max gap>"`
    #[serde(default)]
    pub successive: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub overdue_grace_period: Option<String>,
    #[serde(default)]
    pub skip_overlapping: bool,
    /// Name of a built-in skip predicate
    #[serde(default)]
    pub skip_predicate: Option<String>,
    pub command: String,
}
