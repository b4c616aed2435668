//! Programmatic job registration

use chrono::Duration;
use chrono_tz::Tz;
use std::sync::Arc;

use super::engine::CarbonAwareScheduler;
use crate::error::{Result, SchedulerError};
use crate::job::expression::SuccessiveExpr;
use crate::job::{
    out_of_range, ConcurrencyPolicy, JobDefinition, JobFn, ScheduleKind, SkipPredicate,
    DEFAULT_SUCCESSIVE_DURATION_MINUTES,
};

/// Builds a successive job from code; see [`CarbonAwareScheduler::job`]
///
/// ```ignore
/// scheduler
///     .job("compact")
///     .minimum_gap(Duration::hours(6))
///     .maximum_gap(Duration::hours(12))
///     .zone("de")
///     .task(job_fn(|| async { compact().await }))
///     .schedule()?;
/// ```
#[must_use = "a job is only registered once `schedule()` is called"]
pub struct JobBuilder<'a> {
    scheduler: &'a CarbonAwareScheduler,
    identity: String,
    minimum_gap: Option<Duration>,
    maximum_gap: Option<Duration>,
    initial_maximum_delay: Option<Duration>,
    duration: Option<Duration>,
    zone: Option<String>,
    time_zone: Tz,
    concurrency: ConcurrencyPolicy,
    skip_predicate: Option<Arc<dyn SkipPredicate>>,
    overdue_grace_period: Duration,
    task: Option<JobFn>,
}

impl<'a> JobBuilder<'a> {
    pub(super) fn new(scheduler: &'a CarbonAwareScheduler, identity: String) -> Self {
        Self {
            scheduler,
            identity,
            minimum_gap: None,
            maximum_gap: None,
            initial_maximum_delay: None,
            duration: None,
            zone: None,
            time_zone: Tz::UTC,
            concurrency: ConcurrencyPolicy::default(),
            skip_predicate: None,
            overdue_grace_period: Duration::zero(),
            task: None,
        }
    }

    /// Minimum gap between runs
    pub fn minimum_gap(mut self, gap: Duration) -> Self {
        self.minimum_gap = Some(gap);
        self
    }

    /// Maximum gap between runs
    pub fn maximum_gap(mut self, gap: Duration) -> Self {
        self.maximum_gap = Some(gap);
        self
    }

    /// Window for the first run; defaults to the maximum gap
    pub fn initial_maximum_delay(mut self, delay: Duration) -> Self {
        self.initial_maximum_delay = Some(delay);
        self
    }

    /// Expected duration, used as the timeslot length
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Grid zone
    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Time zone for reporting
    pub fn time_zone(mut self, tz: Tz) -> Self {
        self.time_zone = tz;
        self
    }

    /// Overlapping-run policy
    pub fn concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.concurrency = policy;
        self
    }

    /// Skip predicate checked before each run
    pub fn skip_predicate(mut self, predicate: Arc<dyn SkipPredicate>) -> Self {
        self.skip_predicate = Some(predicate);
        self
    }

    /// Grace period before the job is reported overdue
    pub fn overdue_grace_period(mut self, grace: Duration) -> Self {
        self.overdue_grace_period = grace;
        self
    }

    /// Job body
    pub fn task(mut self, task: JobFn) -> Self {
        self.task = Some(task);
        self
    }

    /// Validate and register the job
    ///
    /// Fails if the identity is already scheduled or the definition is invalid.
    pub fn schedule(self) -> Result<()> {
        let scheduler = self.scheduler;
        let definition = self.into_definition()?;
        scheduler.insert(definition, true)
    }

    fn into_definition(self) -> Result<JobDefinition> {
        let mut violations = Vec::new();

        let zone = self
            .zone
            .map(|z| z.trim().to_string())
            .filter(|z| !z.is_empty());
        if zone.is_none() {
            violations.push("zone is missing".to_string());
        }
        if self.task.is_none() {
            violations.push("task is missing".to_string());
        }
        match (self.minimum_gap, self.maximum_gap) {
            (Some(min), Some(max)) if min >= max => violations.push(format!(
                "minimum gap ({}) must be less than maximum gap ({})",
                min, max
            )),
            (Some(_), Some(_)) => {}
            _ => violations.push("minimum and maximum gap are required".to_string()),
        }
        violations.extend(out_of_range(&[
            ("duration", self.duration),
            ("overdue grace period", Some(self.overdue_grace_period)),
            ("initial maximum delay", self.initial_maximum_delay),
            ("minimum gap", self.minimum_gap),
            ("maximum gap", self.maximum_gap),
        ]));

        match (zone, self.task, self.minimum_gap, self.maximum_gap) {
            (Some(zone), Some(task), Some(minimum_gap), Some(maximum_gap))
                if violations.is_empty() =>
            {
                Ok(JobDefinition {
                    identity: self.identity,
                    zone,
                    time_zone: self.time_zone,
                    duration: self
                        .duration
                        .unwrap_or_else(|| Duration::minutes(DEFAULT_SUCCESSIVE_DURATION_MINUTES)),
                    overdue_grace_period: self.overdue_grace_period,
                    concurrency: self.concurrency,
                    skip_predicate: self.skip_predicate,
                    task,
                    schedule: ScheduleKind::Successive(SuccessiveExpr {
                        initial_maximum_delay: self.initial_maximum_delay.unwrap_or(maximum_gap),
                        minimum_gap,
                        maximum_gap,
                    }),
                })
            }
            _ => Err(SchedulerError::InvalidJob {
                identity: self.identity,
                violations,
            }),
        }
    }
}
