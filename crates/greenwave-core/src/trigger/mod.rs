//! Per-job trigger state machines
//!
//! Every variant answers the same question each tick: given `now`, should
//! the job fire, and for which instant? Carbon-aware variants embed the
//! plain trigger they fall back to.

mod crontab;
mod fixed_window;
mod interval;
mod successive;

pub use crontab::CronTrigger;
pub use fixed_window::{FixedWindowPlannerRef, FixedWindowTrigger};
pub use interval::IntervalTrigger;
pub use successive::{SuccessivePlannerRef, SuccessiveTrigger};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::{JobDefinition, ScheduleKind};
use crate::planner::{FixedWindowConstraints, SuccessiveConstraints};

/// Trigger variant name, used in snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fixed interval
    Interval,
    /// Cron expression
    Cron,
    /// Once per daily window
    FixedWindow,
    /// Within the gap after the previous run
    Successive,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval => write!(f, "interval"),
            Self::Cron => write!(f, "cron"),
            Self::FixedWindow => write!(f, "fixed_window"),
            Self::Successive => write!(f, "successive"),
        }
    }
}

/// A job's trigger
#[derive(Debug)]
pub enum Trigger {
    /// Fixed interval
    Interval(IntervalTrigger),
    /// Cron expression
    Cron(CronTrigger),
    /// Once per daily window
    FixedWindow(FixedWindowTrigger),
    /// Within the gap after the previous run
    Successive(SuccessiveTrigger),
}

impl Trigger {
    /// Build the carbon-aware trigger for a validated job
    pub fn for_definition(
        definition: &JobDefinition,
        fixed_window: &FixedWindowPlannerRef,
        successive: &SuccessivePlannerRef,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        match &definition.schedule {
            ScheduleKind::FixedWindow { window, cron } => {
                let constraints = FixedWindowConstraints::new(
                    definition.identity.clone(),
                    definition.zone.clone(),
                    definition.duration,
                    *window,
                    cron.as_deref(),
                    definition.time_zone,
                    now,
                )?;
                Ok(Self::FixedWindow(FixedWindowTrigger::new(
                    constraints,
                    fixed_window.clone(),
                    definition.overdue_grace_period,
                )))
            }
            ScheduleKind::Successive(expr) => {
                let constraints = SuccessiveConstraints::new(
                    definition.identity.clone(),
                    definition.zone.clone(),
                    definition.duration,
                    *expr,
                    now,
                );
                Ok(Self::Successive(SuccessiveTrigger::new(
                    constraints,
                    successive.clone(),
                    definition.overdue_grace_period,
                )))
            }
        }
    }

    /// Decide whether to fire at `now`; returns the instant fired for
    pub async fn evaluate(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Interval(t) => t.evaluate(now),
            Self::Cron(t) => t.evaluate(now),
            Self::FixedWindow(t) => t.evaluate(now).await,
            Self::Successive(t) => t.evaluate(now).await,
        }
    }

    /// Variant name
    #[must_use]
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::Interval(_) => TriggerKind::Interval,
            Self::Cron(_) => TriggerKind::Cron,
            Self::FixedWindow(_) => TriggerKind::FixedWindow,
            Self::Successive(_) => TriggerKind::Successive,
        }
    }

    /// Start of the trigger, or of the current window
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Self::Interval(t) => t.start(),
            Self::Cron(t) => t.start(),
            Self::FixedWindow(t) => t.start(),
            Self::Successive(t) => t.start(),
        }
    }

    /// Last fire instant
    #[must_use]
    pub fn last_fire_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Interval(t) => t.last_fire_time(),
            Self::Cron(t) => t.last_fire_time(),
            Self::FixedWindow(t) => t.last_fire_time(),
            Self::Successive(t) => t.last_fire_time(),
        }
    }

    /// Next expected fire instant
    #[must_use]
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Interval(t) => t.next_fire_time(),
            Self::Cron(t) => t.next_fire_time(),
            Self::FixedWindow(t) => t.next_fire_time(),
            Self::Successive(t) => t.next_fire_time(),
        }
    }

    /// Whether the next fire is past its grace period; never for fixed windows
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Interval(t) => t.is_overdue(now),
            Self::Cron(t) => t.is_overdue(now),
            Self::FixedWindow(_) => false,
            Self::Successive(t) => t.is_overdue(now),
        }
    }

    /// Whether a carbon-aware trigger is running on its plain fallback
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::FixedWindow(t) => t.is_degraded(),
            Self::Successive(t) => t.is_degraded(),
            Self::Interval(_) | Self::Cron(_) => false,
        }
    }
}

#[cfg(test)]
mod tests;
