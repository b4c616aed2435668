//! Resolves intensity requests through cache, primary API and fallback API

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::api::CarbonIntensityApi;
use super::cache::{CacheKey, CarbonIntensityCache};
use super::model::{CarbonIntensity, ZonedPeriod};
use crate::error::{Result, SchedulerError};

/// Fetches intensity data, caching whatever it obtains
pub struct CarbonIntensityFetcher {
    cache: Arc<CarbonIntensityCache>,
    primary: Arc<dyn CarbonIntensityApi>,
    fallback: Option<Arc<dyn CarbonIntensityApi>>,
}

impl CarbonIntensityFetcher {
    /// Create a fetcher
    ///
    /// A primary source that reports itself disabled is replaced by the
    /// fallback for the lifetime of the fetcher.
    pub fn new(
        primary: Arc<dyn CarbonIntensityApi>,
        fallback: Option<Arc<dyn CarbonIntensityApi>>,
        cache: Arc<CarbonIntensityCache>,
    ) -> Self {
        let (primary, fallback) = match fallback {
            Some(fallback) if !primary.is_enabled() => {
                info!("Primary carbon intensity api disabled, using fallback only");
                (fallback, None)
            }
            other => (primary, other),
        };

        Self {
            cache,
            primary,
            fallback,
        }
    }

    /// The cache backing this fetcher
    #[must_use]
    pub fn cache(&self) -> &Arc<CarbonIntensityCache> {
        &self.cache
    }

    /// Intensity data for `period`
    ///
    /// The lookup key is the requested start, but the result is stored under
    /// the start the source reported. A source that answers with data
    /// anchored elsewhere therefore never produces a hit for the original
    /// request instant.
    pub async fn fetch(&self, period: &ZonedPeriod) -> Result<Arc<CarbonIntensity>> {
        let key = CacheKey::new(period.start, &period.zone);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "Intensity cache hit");
            return Ok(hit);
        }

        let data = match self.primary.carbon_intensity(period).await {
            Ok(data) => data,
            Err(primary_error) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        zone = %period.zone,
                        error = %primary_error,
                        "Primary carbon intensity api failed, using fallback"
                    );
                    fallback.carbon_intensity(period).await.map_err(|e| {
                        SchedulerError::Api(format!(
                            "primary failed ({}), fallback failed ({})",
                            primary_error, e
                        ))
                    })?
                }
                None => return Err(primary_error),
            },
        };

        let stored_under = CacheKey::new(data.start, &period.zone);
        debug!(
            key = %stored_under,
            values = data.len(),
            "Caching carbon intensity data"
        );
        Ok(self.cache.put(stored_under, data))
    }
}

impl std::fmt::Debug for CarbonIntensityFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarbonIntensityFetcher")
            .field("cache", &self.cache)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests;
