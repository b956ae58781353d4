//! Detection of good-weather windows in a candidate sequence
//!
//! Candidates are good night hours in chronological order, possibly with gaps
//! where hours were filtered out. A window is `window_size` consecutive
//! one-hour steps; only the first hour of each unbroken streak is reported.

use chrono::{DateTime, Duration, Utc};

use crate::models::Sample;

/// Whole hours between two samples, truncated toward zero
fn gap_hours(earlier: &Sample, later: &Sample) -> i64 {
    (later.time - earlier.time).num_hours()
}

/// Return the start sample of every accepted window.
///
/// For each position `i` the `window_size` gaps following it are summed. A
/// sum above `window_size` means the run is broken and `i` moves on by one.
/// A valid run whose start sits exactly one hour after the previous candidate
/// belongs to a streak that is already covered, so it is skipped as well.
/// Otherwise `candidates[i]` is emitted and the whole window is consumed.
#[must_use]
pub fn find_window_starts(candidates: &[Sample], window_size: usize) -> Vec<Sample> {
    let mut starts = Vec::new();
    if window_size == 0 {
        return starts;
    }

    let window = window_size as i64;
    let mut i = 0;
    while i + window_size < candidates.len() {
        let sum: i64 = (1..=window_size)
            .map(|j| gap_hours(&candidates[i + j - 1], &candidates[i + j]))
            .sum();

        if sum > window {
            i += 1;
            continue;
        }

        if i > 0 && candidates[i].time - candidates[i - 1].time == Duration::hours(1) {
            i += 1;
            continue;
        }

        starts.push(candidates[i].clone());
        i += window_size;
    }

    starts
}

/// Keep samples that start within `[now, now + hours)`
#[must_use]
pub fn within_next_hours(samples: &[Sample], now: DateTime<Utc>, hours: i64) -> Vec<Sample> {
    let horizon = Duration::hours(hours);
    samples
        .iter()
        .filter(|sample| {
            let delta = sample.time.with_timezone(&Utc) - now;
            delta >= Duration::zero() && delta < horizon
        })
        .cloned()
        .collect()
}
