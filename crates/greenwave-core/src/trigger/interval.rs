//! Fixed-interval trigger

use chrono::{DateTime, Duration, Utc};

use crate::planner::saturating_add;

/// Fires immediately once `start` is reached, then every `interval`
#[derive(Debug, Clone)]
pub struct IntervalTrigger {
    start: DateTime<Utc>,
    interval: Duration,
    grace: Duration,
    last_fire: Option<DateTime<Utc>>,
}

impl IntervalTrigger {
    /// Create an interval trigger
    #[must_use]
    pub fn new(start: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            start,
            interval,
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
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if now < self.start {
            return None;
        }
        let due = match self.last_fire {
            None => true,
            Some(last) => now - last >= self.interval,
        };
        if !due {
            return None;
        }
        self.record_fire(now);
        Some(now)
    }

    /// Record a fire at `at`; earlier instants are ignored
    pub(crate) fn record_fire(&mut self, at: DateTime<Utc>) {
        if self.last_fire.map_or(true, |last| at > last) {
            self.last_fire = Some(at);
        }
    }

    /// When the trigger became active
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// The interval between fires
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn grace(&self) -> Duration {
        self.grace
    }

    /// Last fire instant
    #[must_use]
    pub fn last_fire_time(&self) -> Option<DateTime<Utc>> {
        self.last_fire
    }

    /// Next expected fire instant
    #[must_use]
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        Some(match self.last_fire {
            Some(last) => saturating_add(last, self.interval),
            None => self.start,
        })
    }

    /// Whether the next fire is later than its grace period allows
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.next_fire_time()
            .is_some_and(|next| saturating_add(next, self.grace) < now)
    }
}
