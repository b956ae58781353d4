//! Cron-driven alert checks
//!
//! Expressions are evaluated in UTC. Classic five-field expressions
//! (`min hour dom month dow`) get a leading seconds field so they can be
//! parsed by the `cron` crate, which expects six or seven fields. Their
//! day-of-week numbers follow classic cron (0 or 7 is Sunday) and are
//! rewritten as day names, since the `cron` crate numbers Sunday as 1.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::alert::AlertService;
use crate::{NoCloudsError, Result};

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Parse a cron expression, accepting five, six or seven fields
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let expression = expression.trim();
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let normalized = match fields.len() {
        5 => format!(
            "0 {} {}",
            fields[..4].join(" "),
            translate_day_of_week(fields[4])?
        ),
        6 | 7 => expression.to_string(),
        n => {
            return Err(NoCloudsError::config(format!(
                "Cron expression '{expression}' has {n} fields, expected 5 to 7"
            )));
        }
    };

    Schedule::from_str(&normalized).map_err(|e| {
        NoCloudsError::config(format!("Invalid cron expression '{expression}': {e}"))
    })
}

/// Rewrite a classic day-of-week field (0-7, Sunday = 0 or 7) with day names.
///
/// Numeric items, ranges and steps are expanded into an explicit list; items
/// already written with names pass through untouched.
pub fn translate_day_of_week(field: &str) -> Result<String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let invalid = |item: &str| {
        NoCloudsError::config(format!("Invalid day-of-week item '{item}' in '{field}'"))
    };
    let number = |text: &str, item: &str| text.parse::<u32>().map_err(|_| invalid(item));

    let mut days = BTreeSet::new();
    let mut named = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(number(step, item)?)),
            None => (item, None),
        };

        if !range.is_empty() && !range.chars().any(|c| c.is_ascii_digit()) && range != "*" {
            named.push(item.to_string());
            continue;
        }

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((start, end)) = range.split_once('-') {
            (number(start, item)?, number(end, item)?)
        } else {
            let day = number(range, item)?;
            if step.is_some() { (day, 6) } else { (day, day) }
        };

        let step = step.unwrap_or(1);
        if step == 0 || start > end || end > 7 {
            return Err(invalid(item));
        }
        for day in (start..=end).step_by(step as usize) {
            days.insert(day % 7);
        }
    }

    named.extend(days.into_iter().map(|day| WEEKDAYS[day as usize].to_string()));
    Ok(named.join(","))
}

/// First fire time strictly after `after`
#[must_use]
pub fn next_fire(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

/// Sleep until each fire time and run the 24-hour check, until shutdown
pub async fn run_schedule(schedule: Schedule, alerts: Arc<AlertService>, mut shutdown: watch::Receiver<bool>) {
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
        let now = Utc::now();
        let reference = last_fire.map_or(now, |last| last.max(now));
        let Some(fire_at) = next_fire(&schedule, reference) else {
            warn!("Schedule has no upcoming runs, stopping");
            break;
        };

        info!(next_run = %fire_at, "Next forecast check scheduled");
        let wait = (fire_at - now).to_std().unwrap_or_default();
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(wait) => {}
        }
        last_fire = Some(fire_at);

        info!("Running scheduled forecast check");
        match alerts.check_next_24h(Utc::now()).await {
            Ok(transition) => info!(?transition, "Forecast check finished"),
            Err(e) if e.is_forecast_failure() => {
                warn!(error = %e, "Forecast unavailable, skipping this cycle");
            }
            Err(e) => error!(error = %e, "Forecast check failed"),
        }
    }
    info!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("0 8,12,16,20 * * *")]
    #[case("*/15 * * * *")]
    #[case("0 0 8,12,16,20 * * *")]
    #[case("0 30 21 * * * 2030")]
    fn test_parse_valid(#[case] expression: &str) {
        assert!(parse_schedule(expression).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("every hour")]
    #[case("0 25 * * *")]
    #[case("1 2 3 4 5 6 7 8")]
    fn test_parse_invalid(#[case] expression: &str) {
        let err = parse_schedule(expression).unwrap_err();
        assert!(matches!(err, NoCloudsError::Config { .. }));
    }

    #[rstest]
    #[case("1-5", "MON,TUE,WED,THU,FRI")]
    #[case("0", "SUN")]
    #[case("7", "SUN")]
    #[case("5-7", "SUN,FRI,SAT")]
    #[case("*/2", "SUN,TUE,THU,SAT")]
    #[case("1,3", "MON,WED")]
    #[case("MON-FRI", "MON-FRI")]
    #[case("*", "*")]
    fn test_translate_day_of_week(#[case] field: &str, #[case] expected: &str) {
        assert_eq!(translate_day_of_week(field).unwrap(), expected);
    }

    #[rstest]
    #[case("8")]
    #[case("5-2")]
    #[case("1/0")]
    #[case("1-x")]
    fn test_translate_day_of_week_invalid(#[case] field: &str) {
        assert!(translate_day_of_week(field).is_err());
    }

    #[test]
    fn test_weekday_range_fires_monday_to_friday() {
        let schedule = parse_schedule("0 8 * * 1-5").unwrap();
        // Monday
        let monday = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();

        let days: Vec<String> = schedule
            .after(&monday)
            .take(6)
            .map(|fire| fire.format("%a %H:%M").to_string())
            .collect();
        assert_eq!(
            days,
            vec!["Mon 08:00", "Tue 08:00", "Wed 08:00", "Thu 08:00", "Fri 08:00", "Mon 08:00"]
        );
    }

    #[rstest]
    #[case("0 8 * * 0")]
    #[case("0 8 * * 7")]
    fn test_sunday_as_zero_or_seven(#[case] expression: &str) {
        let schedule = parse_schedule(expression).unwrap();
        let monday = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        assert_eq!(
            next_fire(&schedule, monday),
            Some(Utc.with_ymd_and_hms(2024, 1, 14, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_default_schedule_fires_in_utc() {
        let schedule = parse_schedule("0 8,12,16,20 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 9, 30, 0).unwrap();

        let fires: Vec<_> = schedule.after(&now).take(4).collect();
        assert_eq!(
            fires,
            vec![
                Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 10, 20, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 11, 8, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_next_fire_is_strictly_after() {
        let schedule = parse_schedule("0 8,12,16,20 * * *").unwrap();
        let at_fire = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();

        assert_eq!(
            next_fire(&schedule, at_fire),
            Some(Utc.with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap())
        );
    }
}
