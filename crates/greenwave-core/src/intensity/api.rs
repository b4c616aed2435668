//! Carbon intensity data source abstraction

use async_trait::async_trait;

use super::model::{CarbonIntensity, ZonedPeriod};
use crate::error::Result;

/// A source of carbon intensity data
///
/// The scheduler is given a primary source (usually remote) and a fallback
/// (usually local). Implementations live outside the core.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarbonIntensityApi: Send + Sync {
    /// Whether this source is configured and usable
    fn is_enabled(&self) -> bool;

    /// Intensity data covering the requested period
    ///
    /// An empty series means the source has no data for the period; an
    /// error means the source could not be queried.
    async fn carbon_intensity(&self, period: &ZonedPeriod) -> Result<CarbonIntensity>;
}
