//! Planners turn constraints plus intensity data into the next best instant
//!
//! Both planners share the same shape: fetch data for a window, score
//! timeslots of the job's duration, return the start of the greenest one.

mod constraints;

pub use constraints::{FixedWindowConstraints, SuccessiveConstraints};
pub(crate) use constraints::{minimum_spacing, saturating_add};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SchedulerError};
use crate::intensity::{CarbonIntensityFetcher, SingleJobStrategy, ZonedPeriod};

/// Step between fixed-window slot starts
pub const FIXED_WINDOW_STEP_MINUTES: i64 = 60;

/// Step between successive slot starts
pub const SUCCESSIVE_STEP_MINUTES: i64 = 30;

/// Computes the next execution instant for a kind of constraints
#[async_trait]
pub trait Planner: Send + Sync {
    /// Constraints this planner understands
    type Constraints: Send + Sync;

    /// Whether planning can be attempted at all
    ///
    /// A capability check, not a promise that planning succeeds.
    fn can_schedule(&self, constraints: Option<&Self::Constraints>) -> bool {
        constraints.is_some()
    }

    /// Start of the greenest timeslot allowed by `constraints`
    async fn next_execution_time(&self, constraints: &Self::Constraints)
        -> Result<DateTime<Utc>>;
}

/// Plans one run inside a daily window
#[derive(Debug)]
pub struct FixedWindowPlanner {
    fetcher: Arc<CarbonIntensityFetcher>,
    strategy: SingleJobStrategy,
}

impl FixedWindowPlanner {
    /// Create a planner backed by `fetcher`
    pub fn new(fetcher: Arc<CarbonIntensityFetcher>) -> Self {
        Self {
            fetcher,
            strategy: SingleJobStrategy::new(),
        }
    }
}

#[async_trait]
impl Planner for FixedWindowPlanner {
    type Constraints = FixedWindowConstraints;

    async fn next_execution_time(&self, c: &FixedWindowConstraints) -> Result<DateTime<Utc>> {
        let period = ZonedPeriod::new(c.start, c.end, c.zone.clone());
        let data = self.fetcher.fetch(&period).await?;

        let best = self
            .strategy
            .best_timeslot(
                c.start,
                c.last_slot_start(),
                c.duration,
                Duration::minutes(FIXED_WINDOW_STEP_MINUTES),
                &data,
            )
            .ok_or_else(|| SchedulerError::NoData {
                zone: c.zone.clone(),
                start: c.start,
                end: c.end,
            })?;

        debug!(
            job_id = %c.identity,
            start = %best.start,
            score = best.score,
            "Planned fixed window execution"
        );
        Ok(best.start)
    }
}

/// Plans the next run inside the gap after the previous one
#[derive(Debug)]
pub struct SuccessivePlanner {
    fetcher: Arc<CarbonIntensityFetcher>,
    strategy: SingleJobStrategy,
}

impl SuccessivePlanner {
    /// Create a planner backed by `fetcher`
    pub fn new(fetcher: Arc<CarbonIntensityFetcher>) -> Self {
        Self {
            fetcher,
            strategy: SingleJobStrategy::new(),
        }
    }
}

#[async_trait]
impl Planner for SuccessivePlanner {
    type Constraints = SuccessiveConstraints;

    async fn next_execution_time(&self, c: &SuccessiveConstraints) -> Result<DateTime<Utc>> {
        let reference = c.reference();
        let period = ZonedPeriod::new(
            reference,
            saturating_add(reference, Duration::days(1)),
            c.zone.clone(),
        );
        let data = self.fetcher.fetch(&period).await?;

        // Slots starting after the data ends cannot carry a score.
        let (window_start, window_end) = c.search_window();
        let window_end = window_end.min(data.end).max(window_start);
        let best = self
            .strategy
            .best_timeslot(
                window_start,
                window_end,
                c.duration,
                Duration::minutes(SUCCESSIVE_STEP_MINUTES),
                &data,
            )
            .ok_or_else(|| SchedulerError::NoData {
                zone: c.zone.clone(),
                start: window_start,
                end: window_end,
            })?;

        debug!(
            job_id = %c.identity,
            start = %best.start,
            score = best.score,
            "Planned successive execution"
        );
        Ok(best.start)
    }
}
