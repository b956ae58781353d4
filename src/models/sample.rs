//! Hourly weather sample and display methods

use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use crate::stargazing::moon;

/// One hourly observation from the forecast provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Sample {
    /// Forecast hour in the provider's local offset
    pub time: DateTime<FixedOffset>,
    /// Low cloud cover percentage (0-100)
    pub cloud_low: u8,
    /// Mid cloud cover percentage (0-100)
    pub cloud_mid: u8,
    /// High cloud cover percentage (0-100)
    pub cloud_high: u8,
    /// Wind speed at 10m in km/h
    pub wind_speed: f64,
    /// Wind gusts at 10m in km/h
    pub wind_gusts: f64,
    /// Moon illumination percentage, absent until annotated
    pub moon_illumination: Option<u8>,
}

impl Sample {
    /// Create a sample without moon annotation
    #[must_use]
    pub fn new(
        time: DateTime<FixedOffset>,
        clouds: (u8, u8, u8),
        wind_speed: f64,
        wind_gusts: f64,
    ) -> Self {
        Self {
            time,
            cloud_low: clouds.0,
            cloud_mid: clouds.1,
            cloud_high: clouds.2,
            wind_speed,
            wind_gusts,
            moon_illumination: None,
        }
    }

    /// All three cloud layers and both wind figures are within the ceilings (inclusive)
    #[must_use]
    pub fn is_good(&self, max_cloud_cover: u8, max_wind: f64) -> bool {
        self.cloud_low <= max_cloud_cover
            && self.cloud_mid <= max_cloud_cover
            && self.cloud_high <= max_cloud_cover
            && self.wind_speed <= max_wind
            && self.wind_gusts <= max_wind
    }

    /// Night window that wraps around midnight, e.g. 22..=5.
    ///
    /// The predicate is `hour >= start || hour <= end`. For a non-wrapping
    /// configuration (`start <= end`) this matches nearly every hour; see the
    /// tests for the exact behaviour.
    #[must_use]
    pub fn at_night(&self, night_start_hour: u32, night_end_hour: u32) -> bool {
        let hour = self.time.hour();
        hour >= night_start_hour || hour <= night_end_hour
    }

    /// Fill in the moon illumination for this sample's time
    #[must_use]
    pub fn with_moon_illumination(mut self) -> Self {
        // truncation, not rounding
        let illumination = moon::moon_illumination(self.time).clamp(0.0, 100.0) as u8;
        self.moon_illumination = Some(illumination);
        self
    }

    /// Format as one monospaced report row: `moon% | gusts | Day - dd HHh | low mid high`
    #[must_use]
    pub fn report_line(&self) -> String {
        format!(
            "{:>3}% | {:>4.1} | {} |{:>2} {:>2} {:>2}",
            self.moon_illumination.unwrap_or(0),
            self.wind_gusts,
            self.time.format("%a - %d %Hh"),
            self.cloud_low,
            self.cloud_mid,
            self.cloud_high
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn sample_at(hour: u32) -> Sample {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let time = offset.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap();
        Sample::new(time, (10, 5, 0), 8.0, 12.5)
    }

    #[test]
    fn test_is_good_inclusive_bounds() {
        let mut sample = sample_at(23);
        sample.cloud_high = 25;
        sample.wind_gusts = 15.0;
        assert!(sample.is_good(25, 15.0));

        sample.cloud_mid = 26;
        assert!(!sample.is_good(25, 15.0));
    }

    #[test]
    fn test_is_good_checks_every_field() {
        let base = sample_at(23);
        assert!(base.is_good(25, 15.0));

        let mut low = base.clone();
        low.cloud_low = 90;
        assert!(!low.is_good(25, 15.0));

        let mut speed = base.clone();
        speed.wind_speed = 15.1;
        assert!(!speed.is_good(25, 15.0));

        let mut gusts = base;
        gusts.wind_gusts = 40.0;
        assert!(!gusts.is_good(25, 15.0));
    }

    #[test]
    fn test_is_good_monotonic_in_thresholds() {
        let sample = sample_at(1);
        for cloud in 0..=100u8 {
            for wind in [0.0, 5.0, 12.5, 20.0, 100.0] {
                if sample.is_good(cloud, wind) {
                    assert!(sample.is_good(cloud.saturating_add(10).min(100), wind));
                    assert!(sample.is_good(cloud, wind + 10.0));
                }
            }
        }
    }

    #[rstest]
    #[case(22, true)]
    #[case(23, true)]
    #[case(0, true)]
    #[case(1, true)]
    #[case(2, true)]
    #[case(3, true)]
    #[case(4, true)]
    #[case(5, true)]
    #[case(6, false)]
    #[case(12, false)]
    #[case(18, false)]
    #[case(21, false)]
    fn test_at_night_wraparound(#[case] hour: u32, #[case] expected: bool) {
        assert_eq!(sample_at(hour).at_night(22, 5), expected);
    }

    #[test]
    fn test_at_night_non_wrapping_configuration() {
        // start=1, end=4 keeps the literal OR: every hour >= 1 passes, and so does 0
        let hours_at_night: Vec<u32> = (0..24).filter(|h| sample_at(*h).at_night(1, 4)).collect();
        assert_eq!(hours_at_night, (0..24).collect::<Vec<_>>());

        // start=10, end=2 wraps normally
        assert!(!sample_at(5).at_night(10, 2));
        assert!(sample_at(2).at_night(10, 2));
    }

    #[test]
    fn test_report_line_format() {
        let mut sample = sample_at(23);
        sample.moon_illumination = Some(7);
        // 2024-06-03 is a Monday
        assert_eq!(sample.report_line(), "  7% | 12.5 | Mon - 03 23h |10  5  0");
    }

    #[test]
    fn test_report_line_without_moon() {
        let sample = sample_at(4);
        assert!(sample.report_line().starts_with("  0% |"));
    }

    #[test]
    fn test_with_moon_illumination_sets_value() {
        let sample = sample_at(0).with_moon_illumination();
        let value = sample.moon_illumination.unwrap();
        assert!(value <= 100);
    }
}
