//! Night sky module
//!
//! Pure evaluation of an hourly forecast for stargazing:
//! - Threshold and night filtering of samples
//! - Detection of multi-hour clear windows
//! - Next-hours horizon filtering for proactive alerts
//! - Approximate moon illumination and report rendering

pub mod filter;
pub mod moon;
pub mod report;
pub mod window;

use chrono::{DateTime, Utc};

use crate::models::Sample;

pub use filter::{Thresholds, select_candidates};
pub use moon::{annotate_moon, julian_date, moon_illumination};
pub use report::render_report;
pub use window::{find_window_starts, within_next_hours};

/// Hours ahead that count for the proactive alert
pub const ALERT_HORIZON_HOURS: i64 = 24;

/// Candidates then window detection, in one call
#[must_use]
pub fn window_starts(samples: &[Sample], now: DateTime<Utc>, thresholds: &Thresholds) -> Vec<Sample> {
    let candidates = select_candidates(samples, now, thresholds);
    find_window_starts(&candidates, thresholds.window_size)
}
