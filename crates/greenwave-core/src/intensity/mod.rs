//! Carbon intensity data: model, scoring, caching and fetching
//!
//! ```text
//! ZonedPeriod ──▶ CarbonIntensityFetcher ──▶ CarbonIntensityCache
//!                        │  miss
//!                        ▼
//!              primary api ─(error)─▶ fallback api
//!
//! CarbonIntensity ──▶ SingleJobStrategy ──▶ best Timeslot
//! ```

mod api;
mod cache;
mod fetcher;
mod model;
mod strategy;

#[cfg(test)]
pub use api::MockCarbonIntensityApi;
pub use api::CarbonIntensityApi;
pub use cache::{CacheKey, CarbonIntensityCache};
pub use fetcher::CarbonIntensityFetcher;
pub use model::{CarbonIntensity, CarbonIntensityPeriod, Timeslot, ZonedPeriod};
pub use strategy::SingleJobStrategy;
