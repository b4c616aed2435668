//! Job descriptors and definition-time validation
//!
//! A [`JobDescriptor`] is the raw, string-typed input produced by whatever
//! layer discovers jobs (configuration, code). [`JobDescriptor::validate`]
//! turns it into a typed [`JobDefinition`] or fails with a single
//! [`SchedulerError::InvalidJob`] listing every violation.

pub mod expression;

use chrono::{Duration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SchedulerError};
use crate::invoker::ScheduledExecution;
use expression::{parse_cron, parse_duration, FixedWindowExpr, SuccessiveExpr};

/// Slot length used by successive jobs that do not declare a duration
pub const DEFAULT_SUCCESSIVE_DURATION_MINUTES: i64 = 30;

/// Future returned by a job body
pub type JobFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A job body; called once per execution
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Wrap an async closure as a [`JobFn`]
pub fn job_fn<F, Fut>(f: F) -> JobFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as JobFuture)
}

/// What to do when a job fires while its previous run is still going
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Let runs overlap
    #[default]
    Allow,
    /// Skip a run while another is in flight
    Skip,
}

/// Decides, right before execution, whether a run should be skipped
pub trait SkipPredicate: Send + Sync {
    /// Return `true` to skip this execution
    fn should_skip(&self, execution: &ScheduledExecution) -> bool;
}

impl<F> SkipPredicate for F
where
    F: Fn(&ScheduledExecution) -> bool + Send + Sync,
{
    fn should_skip(&self, execution: &ScheduledExecution) -> bool {
        self(execution)
    }
}

/// Raw job definition
#[derive(Clone)]
pub struct JobDescriptor {
    /// Unique job identity
    pub identity: String,
    /// Fixed window expression (`"05:15 08:15"`)
    pub fixed_window: Option<String>,
    /// Successive expression (`"PT1H 6h 12h"`)
    pub successive: Option<String>,
    /// Grid zone used for intensity lookups
    pub zone: Option<String>,
    /// Expected job duration (duration token)
    pub duration: Option<String>,
    /// Cron expression selecting the days a fixed window exists on
    pub cron: Option<String>,
    /// IANA time zone for the window and cron (UTC when absent)
    pub time_zone: Option<String>,
    /// Grace period before the job is reported overdue (duration token)
    pub overdue_grace_period: Option<String>,
    /// Overlapping-run policy
    pub concurrency: ConcurrencyPolicy,
    /// Optional skip predicate
    pub skip_predicate: Option<Arc<dyn SkipPredicate>>,
    /// The job body
    pub task: JobFn,
}

impl JobDescriptor {
    /// Create a descriptor with only an identity and a body
    pub fn new(identity: impl Into<String>, task: JobFn) -> Self {
        Self {
            identity: identity.into(),
            fixed_window: None,
            successive: None,
            zone: None,
            duration: None,
            cron: None,
            time_zone: None,
            overdue_grace_period: None,
            concurrency: ConcurrencyPolicy::default(),
            skip_predicate: None,
            task,
        }
    }

    /// Set the fixed window expression
    #[must_use]
    pub fn with_fixed_window(mut self, expr: impl Into<String>) -> Self {
        self.fixed_window = Some(expr.into());
        self
    }

    /// Set the successive expression
    #[must_use]
    pub fn with_successive(mut self, expr: impl Into<String>) -> Self {
        self.successive = Some(expr.into());
        self
    }

    /// Set the grid zone
    #[must_use]
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Set the job duration
    #[must_use]
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Set the cron expression
    #[must_use]
    pub fn with_cron(mut self, cron: impl Into<String>) -> Self {
        self.cron = Some(cron.into());
        self
    }

    /// Set the time zone
    #[must_use]
    pub fn with_time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = Some(tz.into());
        self
    }

    /// Set the overdue grace period
    #[must_use]
    pub fn with_overdue_grace_period(mut self, grace: impl Into<String>) -> Self {
        self.overdue_grace_period = Some(grace.into());
        self
    }

    /// Set the concurrency policy
    #[must_use]
    pub fn with_concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.concurrency = policy;
        self
    }

    /// Set the skip predicate
    #[must_use]
    pub fn with_skip_predicate(mut self, predicate: Arc<dyn SkipPredicate>) -> Self {
        self.skip_predicate = Some(predicate);
        self
    }

    /// Validate and type the descriptor
    ///
    /// Every problem is collected before failing, so the error lists them all.
    pub fn validate(self) -> Result<JobDefinition> {
        let mut violations = Vec::new();
        let mut note = |e: SchedulerError| violations.push(e.to_string());

        let zone = match self.zone.as_deref().map(str::trim) {
            Some(zone) if !zone.is_empty() => Some(zone.to_string()),
            _ => {
                note(SchedulerError::InvalidConfig("zone is missing".to_string()));
                None
            }
        };

        let duration = match self.duration.as_deref().map(parse_duration).transpose() {
            Ok(d) => d,
            Err(e) => {
                note(e);
                None
            }
        };

        let time_zone = match self.time_zone.as_deref().map(str::trim) {
            None | Some("") => Some(Tz::UTC),
            Some(name) => match name.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    note(SchedulerError::expression(name, "unknown time zone"));
                    None
                }
            },
        };

        let overdue_grace_period = match self
            .overdue_grace_period
            .as_deref()
            .map(parse_duration)
            .transpose()
        {
            Ok(d) => d.unwrap_or_else(Duration::zero),
            Err(e) => {
                note(e);
                Duration::zero()
            }
        };

        let cron_ok = match self.cron.as_deref().map(parse_cron).transpose() {
            Ok(_) => true,
            Err(e) => {
                note(e);
                false
            }
        };

        let schedule = match (&self.fixed_window, &self.successive) {
            (None, None) => {
                note(SchedulerError::InvalidConfig(
                    "one of fixed window or successive must be set".to_string(),
                ));
                None
            }
            (Some(_), Some(_)) => {
                note(SchedulerError::InvalidConfig(
                    "fixed window and successive are mutually exclusive".to_string(),
                ));
                None
            }
            (Some(window), None) => {
                if self.duration.is_none() {
                    note(SchedulerError::InvalidConfig(
                        "fixed window requires a duration".to_string(),
                    ));
                }
                match window.parse::<FixedWindowExpr>() {
                    Ok(window) => Some(ScheduleKind::FixedWindow {
                        window,
                        cron: cron_ok.then(|| self.cron.clone()).flatten(),
                    }),
                    Err(e) => {
                        note(e);
                        None
                    }
                }
            }
            (None, Some(successive)) => match successive.parse::<SuccessiveExpr>() {
                Ok(expr) => {
                    if expr.minimum_gap >= expr.maximum_gap {
                        note(SchedulerError::InvalidConfig(format!(
                            "minimum gap ({}) must be less than maximum gap ({})",
                            expr.minimum_gap, expr.maximum_gap
                        )));
                        None
                    } else {
                        Some(ScheduleKind::Successive(expr))
                    }
                }
                Err(e) => {
                    note(e);
                    None
                }
            },
        };

        let gaps = match &schedule {
            Some(ScheduleKind::Successive(expr)) => Some(expr),
            _ => None,
        };
        violations.extend(out_of_range(&[
            ("duration", duration),
            ("overdue grace period", Some(overdue_grace_period)),
            ("initial maximum delay", gaps.map(|e| e.initial_maximum_delay)),
            ("minimum gap", gaps.map(|e| e.minimum_gap)),
            ("maximum gap", gaps.map(|e| e.maximum_gap)),
        ]));

        match (zone, time_zone, schedule) {
            (Some(zone), Some(time_zone), Some(schedule)) if violations.is_empty() => {
                let duration = duration.unwrap_or_else(|| {
                    Duration::minutes(DEFAULT_SUCCESSIVE_DURATION_MINUTES)
                });
                Ok(JobDefinition {
                    identity: self.identity,
                    zone,
                    time_zone,
                    duration,
                    overdue_grace_period,
                    concurrency: self.concurrency,
                    skip_predicate: self.skip_predicate,
                    task: self.task,
                    schedule,
                })
            }
            _ => Err(SchedulerError::InvalidJob {
                identity: self.identity,
                violations,
            }),
        }
    }
}

/// Describe every duration that cannot be added to the current instant
pub(crate) fn out_of_range(durations: &[(&str, Option<Duration>)]) -> Vec<String> {
    let now = Utc::now();
    durations
        .iter()
        .filter_map(|&(label, value)| {
            let value = value?;
            now.checked_add_signed(value)
                .is_none()
                .then(|| format!("{} ({}) is out of range", label, value))
        })
        .collect()
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("identity", &self.identity)
            .field("fixed_window", &self.fixed_window)
            .field("successive", &self.successive)
            .field("zone", &self.zone)
            .field("duration", &self.duration)
            .field("cron", &self.cron)
            .field("time_zone", &self.time_zone)
            .field("concurrency", &self.concurrency)
            .field("has_skip_predicate", &self.skip_predicate.is_some())
            .finish()
    }
}

/// How a validated job is scheduled
#[derive(Debug, Clone)]
pub enum ScheduleKind {
    /// Once per daily window
    FixedWindow {
        /// Local window
        window: FixedWindowExpr,
        /// Cron expression selecting the days the window exists on
        cron: Option<String>,
    },
    /// Within a sliding gap after the previous run
    Successive(SuccessiveExpr),
}

/// A validated job
#[derive(Clone)]
pub struct JobDefinition {
    /// Unique job identity
    pub identity: String,
    /// Grid zone
    pub zone: String,
    /// Time zone for window and cron evaluation
    pub time_zone: Tz,
    /// Expected duration, used as the timeslot length
    pub duration: Duration,
    /// Overdue grace period
    pub overdue_grace_period: Duration,
    /// Overlapping-run policy
    pub concurrency: ConcurrencyPolicy,
    /// Optional skip predicate
    pub skip_predicate: Option<Arc<dyn SkipPredicate>>,
    /// Job body
    pub task: JobFn,
    /// Scheduling policy
    pub schedule: ScheduleKind,
}

impl fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDefinition")
            .field("identity", &self.identity)
            .field("zone", &self.zone)
            .field("time_zone", &self.time_zone)
            .field("duration", &self.duration)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// Cron firing daily at `time`
pub(crate) fn daily_cron_at(time: NaiveTime) -> String {
    format!("{} {} {} * * *", time.second(), time.minute(), time.hour())
}
