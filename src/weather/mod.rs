use async_trait::async_trait;

use crate::models::Sample;
use crate::{NoCloudsError, Result};

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Anything that can produce an hourly, chronologically ordered forecast
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn hourly_samples(&self) -> Result<Vec<Sample>>;
}

/// Fixed forecast held in memory, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticForecastSource {
    samples: Option<Vec<Sample>>,
}

impl StaticForecastSource {
    #[must_use]
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: Some(samples),
        }
    }

    /// A source whose every fetch fails like an unreachable provider
    #[must_use]
    pub fn unavailable() -> Self {
        Self { samples: None }
    }
}

#[async_trait]
impl ForecastSource for StaticForecastSource {
    async fn hourly_samples(&self) -> Result<Vec<Sample>> {
        self.samples
            .clone()
            .ok_or_else(|| NoCloudsError::fetch("forecast provider unavailable"))
    }
}
