//! Threshold and night filtering of forecast samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Sample;

/// Good-weather thresholds, read once per evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    /// Ceiling applied to each cloud layer (percent)
    #[serde(default = "default_max_cloud_cover")]
    pub max_cloud_cover: u8,
    /// Ceiling applied to wind speed and gusts (km/h)
    #[serde(default = "default_max_wind")]
    pub max_wind: f64,
    /// First night hour (0-23)
    #[serde(default = "default_night_start_hour")]
    pub night_start_hour: u32,
    /// Last night hour (0-23), may be smaller than the start to wrap past midnight
    #[serde(default = "default_night_end_hour")]
    pub night_end_hour: u32,
    /// Consecutive hourly candidates required for a window
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

pub(crate) fn default_max_cloud_cover() -> u8 {
    25
}

pub(crate) fn default_max_wind() -> f64 {
    15.0
}

pub(crate) fn default_night_start_hour() -> u32 {
    22
}

pub(crate) fn default_night_end_hour() -> u32 {
    5
}

pub(crate) fn default_window_size() -> usize {
    4
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_cloud_cover: default_max_cloud_cover(),
            max_wind: default_max_wind(),
            night_start_hour: default_night_start_hour(),
            night_end_hour: default_night_end_hour(),
            window_size: default_window_size(),
        }
    }
}

impl Thresholds {
    /// A sample is a candidate when it is in the future, good and at night
    #[must_use]
    pub fn is_candidate(&self, sample: &Sample, now: DateTime<Utc>) -> bool {
        sample.time > now
            && sample.is_good(self.max_cloud_cover, self.max_wind)
            && sample.at_night(self.night_start_hour, self.night_end_hour)
    }
}

/// Keep future, good, night samples in their original order
#[must_use]
pub fn select_candidates(samples: &[Sample], now: DateTime<Utc>, thresholds: &Thresholds) -> Vec<Sample> {
    samples
        .iter()
        .filter(|sample| thresholds.is_candidate(sample, now))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn hourly(start: DateTime<FixedOffset>, count: usize) -> Vec<Sample> {
        (0..count)
            .map(|i| Sample::new(start + Duration::hours(i as i64), (0, 0, 0), 3.0, 5.0))
            .collect()
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.max_cloud_cover, 25);
        assert_eq!(thresholds.max_wind, 15.0);
        assert_eq!(thresholds.night_start_hour, 22);
        assert_eq!(thresholds.night_end_hour, 5);
        assert_eq!(thresholds.window_size, 4);
    }

    #[test]
    fn test_select_candidates_drops_past_day_and_bad() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let start = offset.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();
        let mut samples = hourly(start, 12); // 18:00 .. 05:00
        samples[6].cloud_mid = 80; // 00:00 cloudy

        // now = 22:30 local
        let now = (start + Duration::minutes(4 * 60 + 30)).with_timezone(&Utc);
        let candidates = select_candidates(&samples, now, &Thresholds::default());

        let hours: Vec<String> = candidates
            .iter()
            .map(|s| s.time.format("%H").to_string())
            .collect();
        assert_eq!(hours, vec!["23", "01", "02", "03", "04", "05"]);
    }

    #[test]
    fn test_select_candidates_excludes_now_exactly() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let start = offset.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();
        let samples = hourly(start, 2);
        let now = start.with_timezone(&Utc);

        let candidates = select_candidates(&samples, now, &Thresholds::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].time, start + Duration::hours(1));
    }

    #[test]
    fn test_select_candidates_empty_input() {
        let candidates = select_candidates(&[], Utc::now(), &Thresholds::default());
        assert!(candidates.is_empty());
    }
}
