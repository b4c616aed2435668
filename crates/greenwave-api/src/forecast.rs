//! HTTP client for a carbon-aware forecast service
//!
//! Queries `GET {base_url}/emissions/forecasts/current` with the zone as
//! `location` and the requested window as `dataStartAt`/`dataEndAt`. The
//! service answers with one entry per location, each carrying forecast
//! points of `{ timestamp, duration, value }` where `duration` is in minutes.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use greenwave_core::{CarbonIntensity, CarbonIntensityApi, ZonedPeriod};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const FORECAST_PATH: &str = "/emissions/forecasts/current";

fn default_timeout_secs() -> u64 {
    30
}

/// Forecast service settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Service base URL; the client is disabled when empty
    pub base_url: Option<String>,
    /// Sent as `x-api-key` when set
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for ForecastConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ForecastConfig {
    /// Settings for the service at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Sets the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ForecastResponse {
    pub(crate) location: String,
    #[serde(default)]
    pub(crate) forecast_data: Vec<ForecastPoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastPoint {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) duration: i64,
    pub(crate) value: f64,
}

/// Builds a series from the entry for `zone`, or the first entry
///
/// Resolution is the first point's duration; points are assumed contiguous.
pub(crate) fn to_intensity(
    period: &ZonedPeriod,
    responses: Vec<ForecastResponse>,
) -> Result<CarbonIntensity> {
    let index = responses
        .iter()
        .position(|r| r.location.eq_ignore_ascii_case(&period.zone))
        .unwrap_or(0);
    let Some(response) = responses.into_iter().nth(index) else {
        return Ok(CarbonIntensity::empty(&period.zone, period.start, period.end));
    };

    let Some(first) = response.forecast_data.first() else {
        return Ok(CarbonIntensity::empty(&period.zone, period.start, period.end));
    };
    if first.duration <= 0 {
        return Err(Error::InvalidResponse(format!(
            "non-positive forecast duration: {}",
            first.duration
        )));
    }

    let start = first.timestamp;
    let resolution = Duration::try_minutes(first.duration).ok_or_else(|| {
        Error::InvalidResponse(format!("forecast duration out of range: {}", first.duration))
    })?;
    let values = response.forecast_data.iter().map(|p| p.value).collect();
    Ok(CarbonIntensity::new(&period.zone, start, resolution, values))
}

/// Remote forecast provider
pub struct ForecastClient {
    client: Client,
    config: ForecastConfig,
}

impl ForecastClient {
    /// Create a client
    pub fn new(config: ForecastConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn request(&self, period: &ZonedPeriod) -> Result<Vec<ForecastResponse>> {
        let base = self
            .config
            .base_url()
            .ok_or_else(|| Error::NotConfigured("forecast base_url".to_string()))?;
        let url = format!("{}{}", base, FORECAST_PATH);

        debug!(zone = %period.zone, start = %period.start, end = %period.end, "Requesting forecast");

        let mut request = self.client.get(&url).query(&[
            ("location", period.zone.clone()),
            (
                "dataStartAt",
                period.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "dataEndAt",
                period.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ]);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.config.timeout_secs * 1000)
            } else {
                Error::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(status = %status, zone = %period.zone, "Forecast request failed");
            return Err(Error::Api(format!("HTTP {}", status)));
        }

        serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CarbonIntensityApi for ForecastClient {
    fn is_enabled(&self) -> bool {
        self.config.base_url().is_some()
    }

    async fn carbon_intensity(
        &self,
        period: &ZonedPeriod,
    ) -> greenwave_core::Result<CarbonIntensity> {
        let responses = self.request(period).await?;
        Ok(to_intensity(period, responses)?)
    }
}

impl fmt::Debug for ForecastClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
