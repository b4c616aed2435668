//! Greenwave API - Carbon Intensity Providers
//!
//! Concrete [`CarbonIntensityApi`](greenwave_core::CarbonIntensityApi)
//! implementations:
//! - [`ForecastClient`]: remote forecast service over HTTP (primary)
//! - [`JsonFileProvider`]: series loaded from a local JSON file (fallback)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod file;
pub mod forecast;

pub use error::{Error, Result};
pub use file::{FileConfig, JsonFileProvider};
pub use forecast::{ForecastClient, ForecastConfig};
