//! Trigger firing once per daily window at the planned greenest instant

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::crontab::CronTrigger;
use crate::planner::{FixedWindowConstraints, Planner};

/// Planner type used by fixed-window triggers
pub type FixedWindowPlannerRef = Arc<dyn Planner<Constraints = FixedWindowConstraints>>;

/// Fires once inside `[start, end + grace]` of each window
///
/// When the planner cannot produce an instant the trigger degrades to its
/// fallback cron, which fires at the window start. Either way the window
/// rolls forward after the fire.
pub struct FixedWindowTrigger {
    cron: CronTrigger,
    constraints: FixedWindowConstraints,
    planner: FixedWindowPlannerRef,
    planned: Option<DateTime<Utc>>,
    degraded: bool,
    grace: Duration,
}

impl FixedWindowTrigger {
    /// Create a trigger for the window held by `constraints`
    pub fn new(
        constraints: FixedWindowConstraints,
        planner: FixedWindowPlannerRef,
        grace: Duration,
    ) -> Self {
        let cron = CronTrigger::new(
            constraints.start - Duration::seconds(1),
            constraints.fallback_cron.clone(),
            constraints.time_zone,
        );
        Self {
            cron,
            constraints,
            planner,
            planned: None,
            degraded: false,
            grace,
        }
    }

    /// Decide whether to fire at `now`
    pub async fn evaluate(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.constraints.roll_until_open(now, self.grace) {
            Ok(0) => {}
            Ok(missed) => {
                info!(
                    job_id = %self.constraints.identity,
                    missed,
                    next_start = %self.constraints.start,
                    "Fixed window missed, rolled forward"
                );
                self.reset_window();
            }
            Err(e) => {
                warn!(job_id = %self.constraints.identity, error = %e, "Cannot roll window");
                return None;
            }
        }

        if now < self.constraints.start {
            return None;
        }

        if self.planned.is_none() && !self.degraded {
            self.plan().await;
        }

        let fired = if self.degraded {
            self.cron.evaluate(now)
        } else {
            match self.planned {
                Some(at) if now >= at && self.cron.last_fire_time().map_or(true, |l| at > l) => {
                    self.cron.record_fire(now);
                    Some(at)
                }
                _ => None,
            }
        };

        if fired.is_some() {
            self.advance_window();
        }
        fired
    }

    async fn plan(&mut self) {
        if !self.planner.can_schedule(Some(&self.constraints)) {
            self.degraded = true;
            return;
        }
        match self.planner.next_execution_time(&self.constraints).await {
            Ok(at) => {
                debug!(
                    job_id = %self.constraints.identity,
                    planned = %at,
                    "Fixed window execution planned"
                );
                self.planned = Some(at);
            }
            Err(e) => {
                warn!(
                    job_id = %self.constraints.identity,
                    error = %e,
                    "Planning failed, falling back to cron"
                );
                self.degraded = true;
            }
        }
    }

    fn advance_window(&mut self) {
        if let Err(e) = self.constraints.roll() {
            warn!(job_id = %self.constraints.identity, error = %e, "Cannot roll window");
            return;
        }
        self.reset_window();
    }

    fn reset_window(&mut self) {
        self.planned = None;
        self.degraded = false;
        self.cron.rebase(self.constraints.start - Duration::seconds(1));
    }

    /// Current window constraints
    #[must_use]
    pub fn constraints(&self) -> &FixedWindowConstraints {
        &self.constraints
    }

    /// Start of the current window
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.constraints.start
    }

    /// Whether the current window runs on the fallback cron
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Last fire instant
    #[must_use]
    pub fn last_fire_time(&self) -> Option<DateTime<Utc>> {
        self.cron.last_fire_time()
    }

    /// Planned instant, the fallback occurrence, or the window start
    #[must_use]
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        if self.degraded {
            return self.cron.next_fire_time();
        }
        self.planned.or(Some(self.constraints.start))
    }
}

impl std::fmt::Debug for FixedWindowTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowTrigger")
            .field("start", &self.constraints.start)
            .field("end", &self.constraints.end)
            .field("planned", &self.planned)
            .field("degraded", &self.degraded)
            .field("last_fire", &self.cron.last_fire_time())
            .finish()
    }
}
