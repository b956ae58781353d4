//! Integration tests for the noclouds pipeline

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use noclouds::stargazing::{self, Thresholds};
use noclouds::state::{FileStateStore, NotificationState, StateStore};
use noclouds::telegram::{ChatTransport, OutgoingMessage};
use noclouds::weather::StaticForecastSource;
use noclouds::weather::open_meteo::ForecastResponse;
use noclouds::{AlertService, ForecastService, Sample, Transition};
use serde_json::json;
use std::process::Command;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct Outbox {
    messages: Mutex<Vec<OutgoingMessage>>,
}

#[async_trait]
impl ChatTransport for Outbox {
    async fn send(&self, message: OutgoingMessage) -> noclouds::Result<()> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// 24 hourly Open-Meteo rows in Kyiv local time starting at noon, all clear and calm
fn kyiv_forecast(cloud_mid: u8) -> Vec<Sample> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let times: Vec<String> = (0..24)
        .map(|h| (start + Duration::hours(h)).format("%Y-%m-%dT%H:%M").to_string())
        .collect();

    let body = json!({
        "latitude": 50.45,
        "longitude": 30.52,
        "utc_offset_seconds": 7200,
        "timezone": "Europe/Kyiv",
        "hourly": {
            "time": times,
            "temperature_2m": vec![-3.0; 24],
            "cloud_cover_low": vec![0; 24],
            "cloud_cover_mid": vec![cloud_mid; 24],
            "cloud_cover_high": vec![10; 24],
            "wind_speed_10m": vec![4.0; 24],
            "wind_gusts_10m": vec![9.5; 24],
        }
    });

    let response: ForecastResponse = serde_json::from_value(body).unwrap();
    response.into_samples().unwrap()
}

/// Local noon in Kyiv
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap()
}

#[test]
fn test_pipeline_finds_single_night_window() {
    let samples = kyiv_forecast(0);
    assert_eq!(samples.len(), 24);

    let thresholds = Thresholds::default();
    let candidates = stargazing::select_candidates(&samples, now(), &thresholds);
    // 22h through 05h local
    assert_eq!(candidates.len(), 8);

    let starts = stargazing::find_window_starts(&candidates, thresholds.window_size);
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].time.to_rfc3339(), "2024-01-10T22:00:00+02:00");

    let upcoming = stargazing::within_next_hours(&starts, now(), stargazing::ALERT_HORIZON_HOURS);
    assert_eq!(upcoming, starts);

    let report = stargazing::render_report(&stargazing::annotate_moon(upcoming));
    assert!(report.ends_with("|  9.5 | Wed - 10 22h | 0  0 10\n"));
}

#[test]
fn test_all_night_day_yields_one_start() {
    let thresholds = Thresholds {
        night_start_hour: 0,
        night_end_hour: 23,
        ..Thresholds::default()
    };
    let samples = kyiv_forecast(0);
    let after_now = now() - Duration::minutes(30);

    let starts = stargazing::window_starts(&samples, after_now, &thresholds);
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].time, samples[0].time);

    let in_horizon = stargazing::within_next_hours(&starts, after_now, 24);
    assert_eq!(in_horizon, starts);
    let later = now() + Duration::hours(30);
    assert!(stargazing::within_next_hours(&starts, later, 24).is_empty());
}

#[test]
fn test_cloudy_forecast_has_no_windows() {
    let samples = kyiv_forecast(60);
    assert!(stargazing::window_starts(&samples, now(), &Thresholds::default()).is_empty());
}

#[tokio::test]
async fn test_alert_cycle_with_file_state() {
    let dir = TempDir::new().unwrap();
    let state = Arc::new(FileStateStore::new(dir.path().join("state.txt")));
    state.initialize().await.unwrap();
    let outbox = Arc::new(Outbox::default());

    let clear = ForecastService::new(
        Arc::new(StaticForecastSource::new(kyiv_forecast(0))),
        Thresholds::default(),
    );
    let alerts = AlertService::new(7, clear, state.clone(), outbox.clone());

    assert_eq!(alerts.check_next_24h(now()).await.unwrap(), Transition::BecameGood);
    assert_eq!(alerts.check_next_24h(now()).await.unwrap(), Transition::Unchanged);
    assert_eq!(std::fs::read_to_string(state.path()).unwrap(), "1");

    let cloudy = ForecastService::new(
        Arc::new(StaticForecastSource::new(kyiv_forecast(60))),
        Thresholds::default(),
    );
    let alerts = AlertService::new(7, cloudy, state.clone(), outbox.clone());

    assert_eq!(alerts.check_next_24h(now()).await.unwrap(), Transition::BecameBad);
    assert_eq!(state.read().await.unwrap(), NotificationState::Bad);

    let messages = outbox.messages.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].text.contains("Хороша погода сьогодні"));
    assert_eq!(messages[1].text, "`Сьогодні хмарно 🥺`");
    assert!(messages.iter().all(|m| m.chat_id == 7 && m.parse_mode == "MarkdownV2"));
}

#[tokio::test]
async fn test_alert_sent_when_state_file_unusable() {
    let dir = TempDir::new().unwrap();
    let state = Arc::new(FileStateStore::new(dir.path().join("missing").join("state.txt")));
    assert!(state.initialize().await.is_err());
    let outbox = Arc::new(Outbox::default());

    let clear = ForecastService::new(
        Arc::new(StaticForecastSource::new(kyiv_forecast(0))),
        Thresholds::default(),
    );
    let alerts = AlertService::new(7, clear, state, outbox.clone());

    let err = alerts.check_next_24h(now()).await.unwrap_err();
    assert!(matches!(err, noclouds::NoCloudsError::StateIo { .. }));

    let messages = outbox.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.contains("Хороша погода сьогодні"));
}

/// The binary refuses to start without credentials
#[test]
fn test_binary_fails_without_credentials() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_noclouds"))
        .env_clear()
        .env("NOCLOUDS_CONFIG", dir.path().join("absent.toml"))
        .env("LAT", "50.45")
        .env("LON", "30.52")
        .output()
        .expect("Failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TG_BOT_TOKEN"), "unexpected stderr: {stderr}");
}
