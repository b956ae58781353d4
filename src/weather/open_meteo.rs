//! Open-Meteo hourly forecast client
//!
//! Requests cloud layers and wind for the configured coordinates and turns the
//! parallel hourly arrays into [`Sample`]s in the location's local time.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::ForecastSource;
use crate::config::{LocationConfig, WeatherConfig};
use crate::models::Sample;
use crate::{NoCloudsError, Result};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Forecast response from `OpenMeteo`
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub utc_offset_seconds: i32,
    #[serde(default)]
    pub timezone: String,
    pub hourly: HourlyData,
}

/// Hourly arrays, one entry per forecast hour. Trailing hours may be `null`.
#[derive(Debug, Deserialize)]
pub struct HourlyData {
    pub time: Vec<String>,
    pub cloud_cover_low: Vec<Option<u8>>,
    pub cloud_cover_mid: Vec<Option<u8>>,
    pub cloud_cover_high: Vec<Option<u8>>,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: Vec<Option<f64>>,
    #[serde(rename = "wind_gusts_10m")]
    pub wind_gusts: Vec<Option<f64>>,
}

impl ForecastResponse {
    /// Convert the hourly arrays into samples, skipping hours with missing values
    pub fn into_samples(self) -> Result<Vec<Sample>> {
        let hourly = self.hourly;
        let len = hourly.time.len();

        let lengths = [
            ("cloud_cover_low", hourly.cloud_cover_low.len()),
            ("cloud_cover_mid", hourly.cloud_cover_mid.len()),
            ("cloud_cover_high", hourly.cloud_cover_high.len()),
            ("wind_speed_10m", hourly.wind_speed.len()),
            ("wind_gusts_10m", hourly.wind_gusts.len()),
        ];
        for (name, field_len) in lengths {
            if field_len != len {
                return Err(NoCloudsError::parse(format!(
                    "hourly.{name} has {field_len} entries, expected {len}"
                )));
            }
        }

        let zone = match self.timezone.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                if !self.timezone.is_empty() {
                    warn!(
                        "Unknown timezone '{}', using fixed offset {}s",
                        self.timezone, self.utc_offset_seconds
                    );
                }
                None
            }
        };
        let fallback = FixedOffset::east_opt(self.utc_offset_seconds).ok_or_else(|| {
            NoCloudsError::parse(format!("invalid utc_offset_seconds {}", self.utc_offset_seconds))
        })?;

        let mut samples = Vec::with_capacity(len);
        for (i, raw_time) in hourly.time.iter().enumerate() {
            let naive = NaiveDateTime::parse_from_str(raw_time, TIME_FORMAT).map_err(|e| {
                NoCloudsError::parse(format!("invalid timestamp '{raw_time}': {e}"))
            })?;

            let Some(time) = resolve_local(naive, zone, fallback) else {
                debug!("Skipping non-existent local time {}", raw_time);
                continue;
            };

            let values = (
                hourly.cloud_cover_low[i],
                hourly.cloud_cover_mid[i],
                hourly.cloud_cover_high[i],
                hourly.wind_speed[i],
                hourly.wind_gusts[i],
            );
            match values {
                (Some(low), Some(mid), Some(high), Some(speed), Some(gusts)) => {
                    samples.push(Sample::new(time, (low, mid, high), speed, gusts));
                }
                _ => debug!("Skipping {} with missing values", raw_time),
            }
        }

        Ok(samples)
    }
}

/// Attach the provider's offset to a local wall-clock time
fn resolve_local(
    naive: NaiveDateTime,
    zone: Option<Tz>,
    fallback: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    match zone {
        Some(tz) => tz.from_local_datetime(&naive).earliest().map(|local| {
            let offset = local.offset().fix();
            local.with_timezone(&offset)
        }),
        None => fallback.from_local_datetime(&naive).single(),
    }
}

/// Build the forecast request URL
#[must_use]
pub fn forecast_url(weather: &WeatherConfig, latitude: f64, longitude: f64) -> String {
    let base = weather.base_url.trim_end_matches(['?', '&']);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{base}{separator}latitude={latitude}&longitude={longitude}&hourly={}&timezone=auto&forecast_days={}",
        urlencoding::encode(&weather.hourly_params),
        weather.forecast_days
    )
}

/// Open-Meteo client with retrying transport
pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    url: String,
}

impl OpenMeteoClient {
    /// Create a new client for one location
    pub fn new(weather: &WeatherConfig, location: &LocationConfig) -> Result<Self> {
        let (latitude, longitude) = location.coordinates()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(weather.timeout_seconds.into()))
            .user_agent(concat!("noclouds/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NoCloudsError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(weather.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            url: forecast_url(weather, latitude, longitude),
        })
    }

    #[instrument(name = "open_meteo_fetch", skip(self))]
    async fn fetch(&self) -> Result<ForecastResponse> {
        info!("Making request to Open-Meteo API");
        debug!("Open-Meteo request URL: {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.text().await));
        }

        info!("Got Open-Meteo response {}", status);
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| NoCloudsError::parse(format!("Failed to parse Open-Meteo response: {e}")))
    }
}

/// Fetch error for a non-success response, keeping the body or the reason it could not be read
fn status_error<E: std::fmt::Display>(
    status: reqwest::StatusCode,
    body: std::result::Result<String, E>,
) -> NoCloudsError {
    match body {
        Ok(body) => NoCloudsError::fetch(format!("Open-Meteo responded with {status}: {body}")),
        Err(e) => {
            debug!(error = %e, "Failed to read Open-Meteo error body");
            NoCloudsError::fetch(format!(
                "Open-Meteo responded with {status} (body unreadable: {e})"
            ))
        }
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    async fn hourly_samples(&self) -> Result<Vec<Sample>> {
        let response = self.fetch().await?;
        let samples = response.into_samples()?;
        debug!("Parsed {} hourly samples", samples.len());
        Ok(samples)
    }
}
