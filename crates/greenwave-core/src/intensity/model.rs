//! Carbon intensity data model
//!
//! A [`CarbonIntensity`] is a regular time series: `values[i]` covers
//! `[start + i * resolution, start + (i + 1) * resolution)`. A [`Timeslot`] is
//! a candidate execution window scored against that series.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A time window in a grid zone, used to request intensity data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZonedPeriod {
    /// Window start (inclusive)
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
    /// Grid zone identifier (e.g. `de`, `nl`)
    pub zone: String,
}

impl ZonedPeriod {
    /// Create a new zoned period
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, zone: impl Into<String>) -> Self {
        Self {
            start,
            end,
            zone: zone.into(),
        }
    }
}

/// One measured bucket of a carbon intensity series
///
/// Equality and ordering only look at `(instant, resolution)`.
#[derive(Debug, Clone, Copy)]
pub struct CarbonIntensityPeriod {
    /// Start of the bucket
    pub instant: DateTime<Utc>,
    /// Length of the bucket
    pub resolution: Duration,
    /// Relative intensity value for the bucket
    pub value: f64,
}

impl CarbonIntensityPeriod {
    /// Create a new period
    #[must_use]
    pub fn new(instant: DateTime<Utc>, resolution: Duration, value: f64) -> Self {
        Self {
            instant,
            resolution,
            value,
        }
    }

    /// End of the bucket
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.instant
            .checked_add_signed(self.resolution)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether `point` lies within the bucket, both ends inclusive
    #[must_use]
    pub fn contains(&self, point: DateTime<Utc>) -> bool {
        self.instant <= point && point <= self.end()
    }
}

impl PartialEq for CarbonIntensityPeriod {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant && self.resolution == other.resolution
    }
}

impl Eq for CarbonIntensityPeriod {}

impl PartialOrd for CarbonIntensityPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CarbonIntensityPeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.resolution.cmp(&other.resolution))
    }
}

/// A carbon intensity time series for one zone
#[derive(Debug, Clone, PartialEq)]
pub struct CarbonIntensity {
    /// Start of the first bucket
    pub start: DateTime<Utc>,
    /// End of the covered window
    pub end: DateTime<Utc>,
    /// Bucket length
    pub resolution: Duration,
    /// Grid zone identifier
    pub zone: String,
    /// One value per bucket, in time order
    pub values: Vec<f64>,
}

impl CarbonIntensity {
    /// Create a series starting at `start`; `end` is derived from the value count
    pub fn new(
        zone: impl Into<String>,
        start: DateTime<Utc>,
        resolution: Duration,
        values: Vec<f64>,
    ) -> Self {
        let end = bucket_start(start, resolution, values.len()).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            start,
            end,
            resolution,
            zone: zone.into(),
            values,
        }
    }

    /// An empty series, meaning no data is available for the window
    pub fn empty(zone: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            resolution: Duration::zero(),
            zone: zone.into(),
            values: Vec::new(),
        }
    }

    /// Whether the series holds no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// The series expanded into individual periods
    ///
    /// Stops at the first bucket whose start is not representable.
    pub fn periods(&self) -> impl Iterator<Item = CarbonIntensityPeriod> + '_ {
        self.values.iter().enumerate().map_while(move |(i, value)| {
            let instant = bucket_start(self.start, self.resolution, i)?;
            Some(CarbonIntensityPeriod::new(instant, self.resolution, *value))
        })
    }

    /// The buckets overlapping `[from, to)`, as a new series
    ///
    /// Returns an empty series when nothing overlaps.
    #[must_use]
    pub fn slice(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CarbonIntensity {
        let kept: Vec<CarbonIntensityPeriod> = self
            .periods()
            .filter(|p| p.instant < to && p.end() > from)
            .collect();

        match kept.first() {
            Some(first) => CarbonIntensity::new(
                self.zone.clone(),
                first.instant,
                self.resolution,
                kept.iter().map(|p| p.value).collect(),
            ),
            None => CarbonIntensity::empty(self.zone.clone(), from, to),
        }
    }
}

/// `start + index * resolution`, or `None` on overflow
fn bucket_start(start: DateTime<Utc>, resolution: Duration, index: usize) -> Option<DateTime<Utc>> {
    let offset = resolution.checked_mul(i32::try_from(index).ok()?)?;
    start.checked_add_signed(offset)
}

/// A candidate execution window with its aggregated score
///
/// The score is only meaningful relative to other slots of the same length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeslot {
    /// Slot start
    pub start: DateTime<Utc>,
    /// Slot end
    pub end: DateTime<Utc>,
    /// Aggregated intensity score (lower is greener)
    pub score: f64,
    /// Number of data periods with a positive overlap
    pub overlapping: usize,
}

impl Timeslot {
    /// Whether any data period contributed to the score
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.overlapping > 0
    }
}
