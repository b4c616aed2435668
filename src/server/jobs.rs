//! Turns configured jobs into job descriptors with shell-command bodies

use anyhow::{bail, Context, Result};
use greenwave_core::{job_fn, ConcurrencyPolicy, JobDescriptor, JobFn};
use tokio::process::Command;
use tracing::debug;

use super::config::JobConfig;
use super::predicates;

/// Job body running `command` through `sh -c`
///
/// A non-zero exit status fails the execution. The child is killed if the
/// execution is interrupted at shutdown.
pub fn shell_task(identity: &str, command: &str) -> JobFn {
    let identity = identity.to_string();
    let command = command.to_string();
    job_fn(move || {
        let identity = identity.clone();
        let command = command.clone();
        async move {
            debug!(job_id = %identity, command = %command, "Spawning job command");
            let status = Command::new("sh")
                .arg("-c")
                .arg(&command)
                .kill_on_drop(true)
                .status()
                .await
                .with_context(|| format!("failed to spawn `{}`", command))?;

            if !status.success() {
                bail!("`{}` exited with {}", command, status);
            }
            Ok(())
        }
    })
}

/// Build the descriptor for one configured job
pub fn descriptor(job: &JobConfig) -> Result<JobDescriptor> {
    if job.command.trim().is_empty() {
        bail!("job '{}': command is empty", job.identity);
    }

    let mut descriptor = JobDescriptor::new(&job.identity, shell_task(&job.identity, &job.command));
    if let Some(window) = &job.fixed_window {
        descriptor = descriptor.with_fixed_window(window);
    }
    if let Some(successive) = &job.successive {
        descriptor = descriptor.with_successive(successive);
    }
    if let Some(zone) = &job.zone {
        descriptor = descriptor.with_zone(zone);
    }
    if let Some(duration) = &job.duration {
        descriptor = descriptor.with_duration(duration);
    }
    if let Some(cron) = &job.cron {
        descriptor = descriptor.with_cron(cron);
    }
    if let Some(tz) = &job.time_zone {
        descriptor = descriptor.with_time_zone(tz);
    }
    if let Some(grace) = &job.overdue_grace_period {
        descriptor = descriptor.with_overdue_grace_period(grace);
    }
    if job.skip_overlapping {
        descriptor = descriptor.with_concurrency(ConcurrencyPolicy::Skip);
    }
    if let Some(name) = &job.skip_predicate {
        let predicate =
            predicates::by_name(name).with_context(|| format!("job '{}'", job.identity))?;
        descriptor = descriptor.with_skip_predicate(predicate);
    }
    Ok(descriptor)
}
