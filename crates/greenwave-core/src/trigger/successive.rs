//! Trigger firing at the greenest instant inside the gap after the last run

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::interval::IntervalTrigger;
use crate::planner::{saturating_add, Planner, SuccessiveConstraints};

/// Planner type used by successive triggers
pub type SuccessivePlannerRef = Arc<dyn Planner<Constraints = SuccessiveConstraints>>;

/// Fires once per gap at a planned instant
///
/// Falls back to a plain interval of `(minimum_gap + maximum_gap) / 2` when
/// planning fails, until the next fire.
pub struct SuccessiveTrigger {
    interval: IntervalTrigger,
    constraints: SuccessiveConstraints,
    planner: SuccessivePlannerRef,
    candidate: Option<DateTime<Utc>>,
    degraded: bool,
}

impl SuccessiveTrigger {
    /// Create a trigger that has never fired
    pub fn new(
        constraints: SuccessiveConstraints,
        planner: SuccessivePlannerRef,
        grace: Duration,
    ) -> Self {
        let interval =
            IntervalTrigger::new(constraints.initial_start_time, constraints.fallback_interval())
                .with_grace(grace);
        Self {
            interval,
            constraints,
            planner,
            candidate: None,
            degraded: false,
        }
    }

    /// Decide whether to fire at `now`
    pub async fn evaluate(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.degraded && self.candidate.is_none() && self.planning_due(now) {
            self.plan().await;
        }

        if self.degraded {
            let fired = self.interval.evaluate(now);
            if fired.is_some() {
                self.constraints.last_execution_time = self.interval.last_fire_time();
                self.degraded = false;
            }
            return fired;
        }

        let candidate = self.candidate?.trunc_subsecs(0);
        if now < candidate {
            return None;
        }
        if self
            .interval
            .last_fire_time()
            .is_some_and(|last| candidate <= last)
        {
            self.candidate = None;
            return None;
        }

        self.interval.record_fire(now);
        self.constraints.last_execution_time = Some(now);
        self.candidate = None;
        Some(candidate)
    }

    fn planning_due(&self, now: DateTime<Utc>) -> bool {
        match self.interval.last_fire_time() {
            None => true,
            Some(last) => {
                let earliest = saturating_add(last, self.constraints.effective_minimum_gap());
                now >= earliest - Duration::seconds(1)
            }
        }
    }

    async fn plan(&mut self) {
        self.constraints.last_execution_time = self.interval.last_fire_time();
        if !self.planner.can_schedule(Some(&self.constraints)) {
            self.degraded = true;
            return;
        }
        match self.planner.next_execution_time(&self.constraints).await {
            Ok(at) => {
                debug!(
                    job_id = %self.constraints.identity,
                    candidate = %at,
                    "Successive execution planned"
                );
                self.candidate = Some(at);
            }
            Err(e) => {
                warn!(
                    job_id = %self.constraints.identity,
                    error = %e,
                    interval = %self.interval.interval(),
                    "Planning failed, falling back to interval"
                );
                self.degraded = true;
            }
        }
    }

    /// Current constraints
    #[must_use]
    pub fn constraints(&self) -> &SuccessiveConstraints {
        &self.constraints
    }

    /// When the trigger became active
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.interval.start()
    }

    /// Whether the trigger currently runs on its interval fallback
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Last fire instant
    #[must_use]
    pub fn last_fire_time(&self) -> Option<DateTime<Utc>> {
        self.interval.last_fire_time()
    }

    /// Candidate instant, or the earliest instant the next run may start
    #[must_use]
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        if self.degraded {
            return self.interval.next_fire_time();
        }
        self.candidate.or_else(|| {
            Some(match self.interval.last_fire_time() {
                Some(last) => saturating_add(last, self.constraints.effective_minimum_gap()),
                None => self.constraints.initial_start_time,
            })
        })
    }

    /// Whether the next fire is later than its grace period allows
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.next_fire_time()
            .is_some_and(|next| saturating_add(next, self.interval.grace()) < now)
    }
}

impl std::fmt::Debug for SuccessiveTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessiveTrigger")
            .field("candidate", &self.candidate)
            .field("degraded", &self.degraded)
            .field("last_fire", &self.interval.last_fire_time())
            .finish()
    }
}
