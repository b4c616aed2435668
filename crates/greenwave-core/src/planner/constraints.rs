//! Planning constraints built from validated job definitions

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;

use crate::error::{Result, SchedulerError};
use crate::job::expression::{parse_cron, FixedWindowExpr, SuccessiveExpr};
use crate::job::daily_cron_at;

/// Constraints for a job that runs once inside a daily window
#[derive(Debug, Clone)]
pub struct FixedWindowConstraints {
    /// Job identity
    pub identity: String,
    /// Timeslot length
    pub duration: Duration,
    /// Grid zone
    pub zone: String,
    /// Start of the current window
    pub start: DateTime<Utc>,
    /// End of the current window
    pub end: DateTime<Utc>,
    /// Cron selecting the days the window exists on
    pub primary_cron: Schedule,
    /// Cron firing at the window start on those days; used when planning fails
    pub fallback_cron: Schedule,
    /// Zone the window and crons are evaluated in
    pub time_zone: Tz,
    /// Local window times
    pub window: FixedWindowExpr,
}

impl FixedWindowConstraints {
    /// Build constraints whose window is the first one not yet ended at `now`
    pub fn new(
        identity: impl Into<String>,
        zone: impl Into<String>,
        duration: Duration,
        window: FixedWindowExpr,
        cron: Option<&str>,
        time_zone: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let primary = match cron {
            Some(cron) => cron.trim().to_string(),
            None => daily_cron_at(window.start),
        };
        let primary_cron = parse_cron(&primary)?;
        let fallback_cron = fallback_cron_for(&primary, window)?;

        let mut constraints = Self {
            identity: identity.into(),
            duration,
            zone: zone.into(),
            start: now,
            end: now,
            primary_cron,
            fallback_cron,
            time_zone,
            window,
        };

        let (start, end) = constraints.window_after(now - window.length())?;
        constraints.start = start;
        constraints.end = end;
        Ok(constraints)
    }

    /// Move to the next window after the current one
    pub fn roll(&mut self) -> Result<()> {
        let (start, end) = self.window_after(self.start)?;
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// Roll until the current window is still open at `now`
    ///
    /// Returns the number of windows skipped.
    pub fn roll_until_open(&mut self, now: DateTime<Utc>, grace: Duration) -> Result<usize> {
        let mut rolled = 0;
        while now > self.end + grace {
            self.roll()?;
            rolled += 1;
        }
        Ok(rolled)
    }

    /// The latest slot start that still finishes inside the window
    #[must_use]
    pub fn last_slot_start(&self) -> DateTime<Utc> {
        (self.end - self.duration).max(self.start)
    }

    /// First window starting strictly after `after`
    fn window_after(&self, after: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let local_start = self
            .fallback_cron
            .after(&after.with_timezone(&self.time_zone))
            .next()
            .ok_or_else(|| {
                SchedulerError::InvalidConfig(format!(
                    "cron for job '{}' has no future occurrence",
                    self.identity
                ))
            })?;

        let mut end_date = local_start.date_naive();
        if self.window.is_overnight() {
            end_date = end_date.succ_opt().unwrap_or(end_date);
        }
        let start = local_start.with_timezone(&Utc);
        let end = resolve_local(self.time_zone, end_date.and_time(self.window.end))
            .unwrap_or(start + self.window.length());
        Ok((start, end))
    }
}

/// Cron firing at the window start on the days `primary` selects
fn fallback_cron_for(primary: &str, window: FixedWindowExpr) -> Result<Schedule> {
    let fields: Vec<&str> = primary.split_whitespace().collect();
    let days = fields.get(3..).map(|rest| rest.join(" ")).unwrap_or_default();
    let daily = daily_cron_at(window.start);
    let time_fields: Vec<&str> = daily.split_whitespace().take(3).collect();
    let expression = format!("{} {}", time_fields.join(" "), days);
    Schedule::from_str(&expression)
        .map_err(|e| SchedulerError::expression(expression.clone(), e.to_string()))
}

/// Map a local wall-clock time to UTC, taking the earlier instant in a fold
fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(early, _) => Some(early.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Constraints for a job that runs within a gap after its previous run
#[derive(Debug, Clone)]
pub struct SuccessiveConstraints {
    /// Job identity
    pub identity: String,
    /// Timeslot length
    pub duration: Duration,
    /// Grid zone
    pub zone: String,
    /// Last time the job fired; `None` before the first run
    pub last_execution_time: Option<DateTime<Utc>>,
    /// Earliest start of the very first run
    pub initial_start_time: DateTime<Utc>,
    /// Window length for the very first run
    pub initial_maximum_delay: Duration,
    /// Minimum gap between runs
    pub minimum_gap: Duration,
    /// Maximum gap between runs
    pub maximum_gap: Duration,
}

impl SuccessiveConstraints {
    /// Build constraints with no previous run
    pub fn new(
        identity: impl Into<String>,
        zone: impl Into<String>,
        duration: Duration,
        expr: SuccessiveExpr,
        initial_start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: identity.into(),
            duration,
            zone: zone.into(),
            last_execution_time: None,
            initial_start_time,
            initial_maximum_delay: expr.initial_maximum_delay,
            minimum_gap: expr.minimum_gap,
            maximum_gap: expr.maximum_gap,
        }
    }

    /// Gap actually kept between runs; never zero
    #[must_use]
    pub fn effective_minimum_gap(&self) -> Duration {
        self.minimum_gap.max(minimum_spacing())
    }

    /// Instant the intensity data request is anchored at
    #[must_use]
    pub fn reference(&self) -> DateTime<Utc> {
        match self.last_execution_time {
            Some(last) => saturating_add(last, self.effective_minimum_gap()),
            None => self.initial_start_time,
        }
    }

    /// Window in which the next run must start
    ///
    /// The window opens strictly after the previous run, even for a zero minimum gap.
    #[must_use]
    pub fn search_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match self.last_execution_time {
            Some(last) => {
                let earliest = saturating_add(last, self.effective_minimum_gap());
                (earliest, saturating_add(last, self.maximum_gap).max(earliest))
            }
            None => (
                self.initial_start_time,
                saturating_add(self.initial_start_time, self.initial_maximum_delay),
            ),
        }
    }

    /// Fallback interval used when planning is not possible
    #[must_use]
    pub fn fallback_interval(&self) -> Duration {
        self.minimum_gap
            .checked_add(&self.maximum_gap)
            .map_or(self.maximum_gap, |sum| sum / 2)
            .max(minimum_spacing())
    }
}

/// Smallest spacing between two runs of the same successive job
#[must_use]
pub(crate) fn minimum_spacing() -> Duration {
    Duration::seconds(1)
}

/// `at + delta`, clamped to the latest representable instant
#[must_use]
pub(crate) fn saturating_add(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests;
