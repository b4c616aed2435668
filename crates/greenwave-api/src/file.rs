//! Carbon intensity series served from a local JSON file
//!
//! ```json
//! { "de": { "start": "2024-08-27T00:00:00Z", "resolution_minutes": 60, "values": [310.0, 290.5] } }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use greenwave_core::{CarbonIntensity, CarbonIntensityApi, ZonedPeriod};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// File provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Path of the JSON data file; no fallback provider when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct ZoneSeries {
    start: DateTime<Utc>,
    resolution_minutes: i64,
    values: Vec<f64>,
}

/// Serves slices of per-zone series loaded once from disk
#[derive(Debug, Clone, Default)]
pub struct JsonFileProvider {
    zones: HashMap<String, CarbonIntensity>,
}

impl JsonFileProvider {
    /// Load the series in `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let provider = Self::from_json(&raw)?;
        info!(path = %path.display(), zones = provider.zones.len(), "Loaded intensity file");
        Ok(provider)
    }

    /// Parse series from a JSON document
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, ZoneSeries> =
            serde_json::from_str(raw).map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let mut zones = HashMap::with_capacity(parsed.len());
        for (zone, series) in parsed {
            let resolution = Some(series.resolution_minutes)
                .filter(|minutes| *minutes > 0)
                .and_then(Duration::try_minutes)
                .ok_or_else(|| {
                    Error::InvalidResponse(format!(
                        "zone '{}': resolution_minutes must be positive and in range",
                        zone
                    ))
                })?;
            let intensity =
                CarbonIntensity::new(zone.clone(), series.start, resolution, series.values);
            zones.insert(zone.to_ascii_lowercase(), intensity);
        }
        Ok(Self { zones })
    }

    /// Zones with data
    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }
}

#[async_trait]
impl CarbonIntensityApi for JsonFileProvider {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn carbon_intensity(
        &self,
        period: &ZonedPeriod,
    ) -> greenwave_core::Result<CarbonIntensity> {
        match self.zones.get(&period.zone.to_ascii_lowercase()) {
            Some(series) => Ok(series.slice(period.start, period.end)),
            None => {
                debug!(zone = %period.zone, "Zone not in intensity file");
                Ok(CarbonIntensity::empty(&period.zone, period.start, period.end))
            }
        }
    }
}

#[cfg(test)]
mod tests;
