//! Approximate lunar illumination
//!
//! A mean synodic month counted from a reference new moon, not an ephemeris.
//! Good to well under a percentage point against the same formula elsewhere.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use std::f64::consts::PI;

use crate::models::Sample;

/// Average length of a synodic month in days
pub const SYNODIC_MONTH: f64 = 29.530_59;

/// Julian date of the reference new moon (January 2000)
pub const NEW_MOON_REFERENCE: f64 = 2_451_549.5;

/// Julian date from the instant's local calendar components
#[must_use]
pub fn julian_date<Tz: TimeZone>(instant: DateTime<Tz>) -> f64 {
    let local = instant.naive_local();

    let mut year = f64::from(local.year());
    let mut month = f64::from(local.month());
    let day = f64::from(local.day());

    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }

    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    let day_number = (365.25 * year).floor() + (30.6001 * (month + 1.0)).floor() + day + 1_720_994.0 + b;

    let fraction = (f64::from(local.hour())
        + f64::from(local.minute()) / 60.0
        + f64::from(local.second()) / 3600.0)
        / 24.0;

    day_number + fraction
}

/// Fraction of the synodic cycle elapsed, in `[0, 1)`
#[must_use]
pub fn moon_phase<Tz: TimeZone>(instant: DateTime<Tz>) -> f64 {
    let days_since_new_moon = julian_date(instant) - NEW_MOON_REFERENCE;
    let phase = (days_since_new_moon / SYNODIC_MONTH).fract();
    if phase < 0.0 { phase + 1.0 } else { phase }
}

/// Illuminated share of the lunar disc in percent (0-100)
#[must_use]
pub fn moon_illumination<Tz: TimeZone>(instant: DateTime<Tz>) -> f64 {
    let phase = moon_phase(instant);
    (1.0 - (2.0 * PI * phase).cos()) / 2.0 * 100.0
}

/// Annotate every sample with its moon illumination
#[must_use]
pub fn annotate_moon(samples: Vec<Sample>) -> Vec<Sample> {
    samples
        .into_iter()
        .map(Sample::with_moon_illumination)
        .collect()
}
