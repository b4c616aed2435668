//! Timeslot generation and selection
//!
//! Scoring rule for a slot, summed over every data period:
//! - a period the slot fully contains adds its raw value, unscaled;
//! - a period holding one of the slot's boundaries adds its value prorated
//!   by the overlapping seconds;
//! - any other period adds nothing.
//!
//! Mixing unscaled and prorated contributions means the score is a ranking
//! signal for slots of equal length, not an average intensity.

use chrono::{DateTime, Duration, Utc};

use super::model::{CarbonIntensity, CarbonIntensityPeriod, Timeslot};

/// Picks the greenest slot for a single job
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleJobStrategy;

impl SingleJobStrategy {
    /// Create a new strategy
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generate scored slots starting at `window_start`, then every `step`,
    /// while the start is not after `window_end`
    ///
    /// A zero-length window yields exactly one slot. A non-positive `step`
    /// also yields only the first slot.
    pub fn timeslots(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        slot_duration: Duration,
        step: Duration,
        data: &CarbonIntensity,
    ) -> Vec<Timeslot> {
        let periods: Vec<CarbonIntensityPeriod> = data.periods().collect();
        let mut slots = Vec::new();
        let mut start = window_start;

        loop {
            let end = start
                .checked_add_signed(slot_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            slots.push(score_slot(start, end, &periods));
            if step <= Duration::zero() {
                break;
            }
            match start.checked_add_signed(step) {
                Some(next) if next <= window_end => start = next,
                _ => break,
            }
        }

        slots
    }

    /// The lowest-scoring data-bearing slot; ties keep the earliest
    pub fn best_timeslot(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        slot_duration: Duration,
        step: Duration,
        data: &CarbonIntensity,
    ) -> Option<Timeslot> {
        let slots = self.timeslots(window_start, window_end, slot_duration, step, data);
        lowest(&slots)
    }
}

/// First slot with a strictly lower score than every earlier data-bearing slot
pub(crate) fn lowest(slots: &[Timeslot]) -> Option<Timeslot> {
    let mut best: Option<Timeslot> = None;
    for slot in slots.iter().filter(|s| s.has_data()) {
        match best {
            Some(current) if slot.score >= current.score => {}
            _ => best = Some(*slot),
        }
    }
    best
}

/// Score one slot against a list of periods
pub(crate) fn score_slot(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    periods: &[CarbonIntensityPeriod],
) -> Timeslot {
    let mut score = 0.0;
    let mut overlapping = 0;

    for period in periods {
        if let Some(contribution) = contribution(start, end, period) {
            score += contribution;
            overlapping += 1;
        }
    }

    Timeslot {
        start,
        end,
        score,
        overlapping,
    }
}

/// Contribution of one period to the slot `[start, end]`
///
/// `None` when the period does not overlap the slot by a positive amount.
pub(crate) fn contribution(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    period: &CarbonIntensityPeriod,
) -> Option<f64> {
    let overlap = overlap_seconds(start, end, period);
    if overlap <= 0 {
        return None;
    }

    if start <= period.instant && period.end() <= end {
        return Some(period.value);
    }

    if period.contains(start) || period.contains(end) {
        let resolution = period.resolution.num_seconds();
        if resolution <= 0 {
            return None;
        }
        return Some(period.value / resolution as f64 * overlap as f64);
    }

    None
}

fn overlap_seconds(start: DateTime<Utc>, end: DateTime<Utc>, period: &CarbonIntensityPeriod) -> i64 {
    let from = start.max(period.instant);
    let to = end.min(period.end());
    (to - from).num_seconds()
}
