//! Daemon wiring
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `jobs`: Configured jobs to job descriptors
//! - `predicates`: Named skip predicates
//! - `shutdown`: Signal handling

pub mod config;
mod jobs;
mod loader;
mod predicates;
mod shutdown;

use anyhow::{Context, Result};
use greenwave_api::{ForecastClient, JsonFileProvider};
use greenwave_core::{
    CarbonAwareScheduler, CarbonIntensityApi, CarbonIntensityCache, CarbonIntensityFetcher,
    Clock, JobDescriptor, SchedulerEvent, SystemClock, TracingInstrumenter,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use self::config::AppConfig;
pub use loader::load_config;

/// Build the intensity fetcher from the primary and fallback settings
pub async fn build_fetcher(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<CarbonIntensityFetcher>> {
    let primary: Arc<dyn CarbonIntensityApi> = Arc::new(
        ForecastClient::new(config.api.clone()).context("Failed to create forecast client")?,
    );

    let fallback: Option<Arc<dyn CarbonIntensityApi>> = match &config.fallback.path {
        Some(path) => Some(Arc::new(
            JsonFileProvider::open(path)
                .await
                .with_context(|| format!("Failed to load intensity file {}", path.display()))?,
        )),
        None => None,
    };

    if !primary.is_enabled() && fallback.is_none() {
        warn!("No carbon intensity source configured, jobs will run on their fallback schedules");
    }

    let cache = Arc::new(CarbonIntensityCache::new(&config.scheduler.cache, clock));
    Ok(Arc::new(CarbonIntensityFetcher::new(primary, fallback, cache)))
}

/// Descriptors for every configured job
pub fn job_descriptors(config: &AppConfig) -> Result<Vec<JobDescriptor>> {
    config.jobs.iter().map(jobs::descriptor).collect()
}

/// Run the scheduler until a shutdown signal arrives
pub async fn run() -> Result<()> {
    let config = load_config()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher = build_fetcher(&config, clock.clone()).await?;

    let scheduler = CarbonAwareScheduler::new(config.scheduler.clone(), fetcher, clock)
        .with_instrumenter(Arc::new(TracingInstrumenter));

    scheduler.add_listener(Arc::new(|event: &SchedulerEvent| {
        if let SchedulerEvent::ExecutionFailed { job_id, error, .. } = event {
            error!(job_id = %job_id, error = %error, "Job failed");
        }
    }));

    for descriptor in job_descriptors(&config)? {
        scheduler
            .register(descriptor)
            .context("Failed to register job")?;
    }
    info!(jobs = scheduler.job_count(), "Jobs registered");

    scheduler.start();

    shutdown::wait_for_shutdown_signal().await;
    scheduler.shutdown().await;
    Ok(())
}
