//! Intensity cache with content-aware expiry
//!
//! Entries are keyed by `(hour, zone)`. The expiry is fixed when an entry is
//! first inserted: empty data lives for a short configurable retry window,
//! non-empty data lives until one second past the end of its coverage.
//! Reads and updates never extend it.

use chrono::{DateTime, Duration, DurationRound, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::model::CarbonIntensity;
use crate::clock::Clock;
use crate::config::CacheConfig;

/// Cache key: hour-truncated instant plus normalized zone
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hour: DateTime<Utc>,
    zone: String,
}

impl CacheKey {
    /// Build a key; minutes and seconds of `instant` are dropped and the zone
    /// is trimmed and lower-cased
    pub fn new(instant: DateTime<Utc>, zone: &str) -> Self {
        Self {
            hour: instant
                .duration_trunc(Duration::hours(1))
                .unwrap_or(instant),
            zone: zone.trim().to_lowercase(),
        }
    }

    /// The hour this key covers
    #[must_use]
    pub fn hour(&self) -> DateTime<Utc> {
        self.hour
    }

    /// The normalized zone
    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.zone, self.hour.to_rfc3339())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Arc<CarbonIntensity>,
    expires_at: DateTime<Utc>,
}

/// Concurrent intensity cache
pub struct CarbonIntensityCache {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
    empty_value_ttl: Duration,
}

impl CarbonIntensityCache {
    /// Create a cache using the given clock for expiry decisions
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            empty_value_ttl: config.empty_value_ttl(),
        }
    }

    /// Look up a live entry; expired entries are evicted on the way
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CarbonIntensity>> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if now < entry.expires_at {
            return Some(entry.data.clone());
        }
        drop(entry);

        self.entries.remove_if(key, |_, e| now >= e.expires_at);
        debug!(key = %key, "Intensity cache entry expired");
        None
    }

    /// Store data under `key`
    ///
    /// Replacing a live entry keeps its original expiry.
    pub fn put(&self, key: CacheKey, data: CarbonIntensity) -> Arc<CarbonIntensity> {
        let now = self.clock.now();
        let data = Arc::new(data);
        let expires_at = self.expiry_for(&data, now);

        self.entries
            .entry(key)
            .and_modify(|entry| {
                entry.data = data.clone();
                if now >= entry.expires_at {
                    entry.expires_at = expires_at;
                }
            })
            .or_insert_with(|| CacheEntry {
                data: data.clone(),
                expires_at,
            });

        data
    }

    /// When an entry for `data` inserted at `now` expires
    fn expiry_for(&self, data: &CarbonIntensity, now: DateTime<Utc>) -> DateTime<Utc> {
        if data.is_empty() {
            now + self.empty_value_ttl
        } else {
            data.end + Duration::seconds(1)
        }
    }

    /// Number of stored entries, including ones not yet evicted
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }
}

impl fmt::Debug for CarbonIntensityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarbonIntensityCache")
            .field("entries", &self.entries.len())
            .field("empty_value_ttl", &self.empty_value_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests;
