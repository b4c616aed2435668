//! Cron trigger evaluated in a job's time zone

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::planner::saturating_add;

/// Fires once `now` passes an occurrence strictly after the last fire
#[derive(Debug, Clone)]
pub struct CronTrigger {
    start: DateTime<Utc>,
    schedule: Schedule,
    time_zone: Tz,
    grace: Duration,
    last_fire: Option<DateTime<Utc>>,
}

impl CronTrigger {
    /// Create a cron trigger; occurrences before `start` are never fired
    #[must_use]
    pub fn new(start: DateTime<Utc>, schedule: Schedule, time_zone: Tz) -> Self {
        Self {
            start,
            schedule,
            time_zone,
            grace: Duration::zero(),
            last_fire: None,
        }
    }

    /// Set the overdue grace period
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Decide whether to fire at `now`
    ///
    /// Returns the occurrence that fired. Occurrences missed while the
    /// scheduler was busy or paused collapse into a single fire.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = self.next_fire_time()?;
        if now < next {
            return None;
        }
        self.record_fire(now);
        Some(next)
    }

    pub(crate) fn record_fire(&mut self, at: DateTime<Utc>) {
        if self.last_fire.map_or(true, |last| at > last) {
            self.last_fire = Some(at);
        }
    }

    /// Move the start forward; occurrences before `start` are no longer fired
    ///
    /// The last fire is kept for reporting.
    pub(crate) fn rebase(&mut self, start: DateTime<Utc>) {
        self.start = self.start.max(start);
    }

    /// When the trigger became active
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Last fire instant
    #[must_use]
    pub fn last_fire_time(&self) -> Option<DateTime<Utc>> {
        self.last_fire
    }

    /// First occurrence strictly after the later of the last fire and the start
    #[must_use]
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        let reference = self
            .last_fire
            .map_or(self.start, |last| last.max(self.start));
        self.schedule
            .after(&reference.with_timezone(&self.time_zone))
            .next()
            .map(|next| next.with_timezone(&Utc))
    }

    /// Whether the next occurrence is later than its grace period allows
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.next_fire_time()
            .is_some_and(|next| saturating_add(next, self.grace) < now)
    }
}
