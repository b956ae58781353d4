//! Clear-sky forecast service
//!
//! Combines a forecast source with the configured thresholds to answer the
//! two questions the bot asks: which clear windows start in the next 24 hours,
//! and what the whole 7-day outlook looks like.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::Result;
use crate::models::Sample;
use crate::stargazing::{self, ALERT_HORIZON_HOURS, Thresholds};
use crate::weather::ForecastSource;

/// Window queries over a forecast source
#[derive(Clone)]
pub struct ForecastService {
    source: Arc<dyn ForecastSource>,
    thresholds: Thresholds,
}

impl ForecastService {
    pub fn new(source: Arc<dyn ForecastSource>, thresholds: Thresholds) -> Self {
        Self { source, thresholds }
    }

    /// Start samples of every clear window in the fetched forecast
    #[tracing::instrument(name = "window_starts", level = "debug", skip(self))]
    pub async fn window_starts(&self, now: DateTime<Utc>) -> Result<Vec<Sample>> {
        let samples = self.source.hourly_samples().await?;
        let starts = stargazing::window_starts(&samples, now, &self.thresholds);
        debug!(
            samples = samples.len(),
            windows = starts.len(),
            "Evaluated forecast"
        );
        Ok(starts)
    }

    /// Window starts within the alert horizon, moon-annotated
    pub async fn next_24h(&self, now: DateTime<Utc>) -> Result<Vec<Sample>> {
        let starts = self.window_starts(now).await?;
        let upcoming = stargazing::within_next_hours(&starts, now, ALERT_HORIZON_HOURS);
        Ok(stargazing::annotate_moon(upcoming))
    }

    /// Rendered report of all window starts, `None` when there are none
    pub async fn seven_day_report(&self, now: DateTime<Utc>) -> Result<Option<String>> {
        let starts = self.window_starts(now).await?;
        if starts.is_empty() {
            info!("No clear windows in the forecast");
            return Ok(None);
        }
        Ok(Some(stargazing::render_report(&stargazing::annotate_moon(starts))))
    }
}
