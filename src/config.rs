//! Configuration management for the noclouds service
//!
//! Handles loading configuration from an optional TOML file, `NOCLOUDS_`
//! prefixed environment variables and the plain variable names used by
//! existing deployments (`TG_BOT_TOKEN`, `CHAT_ID`, `LAT`, ...), and validates
//! every setting once at startup.

use crate::NoCloudsError;
use crate::stargazing::Thresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Plain environment variable names and the setting each one overrides
const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("TG_BOT_TOKEN", "telegram.bot_token"),
    ("CHAT_ID", "telegram.chat_id"),
    ("LAT", "location.latitude"),
    ("LON", "location.longitude"),
    ("API_ENDPOINT", "weather.base_url"),
    ("REQUEST_PARAMS", "weather.hourly_params"),
    ("STATE_FILE_PATH", "state.file_path"),
    ("MAX_CLOUD_COVER", "thresholds.max_cloud_cover"),
    ("MAX_WIND", "thresholds.max_wind"),
    ("NIGHT_STARTS_AT", "thresholds.night_start_hour"),
    ("NIGHT_ENDS_AT", "thresholds.night_end_hour"),
    ("GOOD_WEATHER_WINDOW", "thresholds.window_size"),
    ("CRON_EXPRESSION", "schedule.cron"),
    ("LOG_LEVEL", "logging.level"),
];

/// Root configuration structure for the noclouds service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoCloudsConfig {
    /// Telegram bot settings
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Observing location
    #[serde(default)]
    pub location: LocationConfig,
    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Good-weather thresholds
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Alert schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Notification state persistence
    #[serde(default)]
    pub state: StateConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather (mandatory)
    pub bot_token: Option<String>,
    /// The only chat the bot talks to (mandatory)
    pub chat_id: Option<i64>,
    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_base_url: String,
    /// Long polling timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u32,
}

/// Observing location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Latitude in decimal degrees (mandatory)
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees (mandatory)
    pub longitude: Option<f64>,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Open-Meteo forecast endpoint
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Comma separated hourly variables
    #[serde(default = "default_hourly_params")]
    pub hourly_params: String,
    /// Days of forecast to request
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_weather_max_retries")]
    pub max_retries: u32,
}

/// Alert schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression, evaluated in UTC
    #[serde(default = "default_cron")]
    pub cron: String,
}

/// Notification state persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// File holding "0" or "1"
    #[serde(default = "default_state_file_path")]
    pub file_path: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint for trace export
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u32 {
    60
}

fn default_weather_base_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_hourly_params() -> String {
    "temperature_2m,cloud_cover_low,cloud_cover_mid,cloud_cover_high,wind_speed_10m,wind_gusts_10m"
        .to_string()
}

fn default_forecast_days() -> u32 {
    7
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_weather_max_retries() -> u32 {
    3
}

fn default_cron() -> String {
    "0 8,12,16,20 * * *".to_string()
}

fn default_state_file_path() -> PathBuf {
    PathBuf::from("state.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base_url: default_telegram_api_url(),
            poll_timeout_seconds: default_poll_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            hourly_params: default_hourly_params(),
            forecast_days: default_forecast_days(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_weather_max_retries(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file_path: default_state_file_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl LocationConfig {
    /// Latitude and longitude, failing when either is missing
    pub fn coordinates(&self) -> crate::Result<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(NoCloudsError::config("LAT and LON must both be set")),
        }
    }
}

impl TelegramConfig {
    /// Bot token and chat id, failing when either is missing
    pub fn credentials(&self) -> crate::Result<(String, i64)> {
        let token = self
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| NoCloudsError::config("TG_BOT_TOKEN is not set"))?;
        let chat_id = self
            .chat_id
            .ok_or_else(|| NoCloudsError::config("CHAT_ID is not set"))?;
        Ok((token.to_string(), chat_id))
    }
}

impl NoCloudsConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_env(config_path, std::env::vars().collect())
    }

    /// Load configuration using the given environment snapshot
    pub fn load_with_env(config_path: Option<PathBuf>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path
            .or_else(|| env.get("NOCLOUDS_CONFIG").map(PathBuf::from))
            .or_else(|| Self::get_config_path().filter(|path| path.exists()))
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        // NOCLOUDS_THRESHOLDS__MAX_WIND=20 style overrides
        builder = builder.add_source(
            Environment::with_prefix("NOCLOUDS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone().into_iter().collect())),
        );

        for (var, key) in LEGACY_ENV_VARS {
            let value = env
                .get(*var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            builder = builder
                .set_override_option(*key, value)
                .with_context(|| format!("Failed to apply {var}"))?;
        }

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: NoCloudsConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("noclouds").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.telegram.api_base_url.is_empty() {
            self.telegram.api_base_url = default_telegram_api_url();
        }
        if self.telegram.poll_timeout_seconds == 0 {
            self.telegram.poll_timeout_seconds = default_poll_timeout();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.hourly_params.is_empty() {
            self.weather.hourly_params = default_hourly_params();
        }
        if self.weather.forecast_days == 0 {
            self.weather.forecast_days = default_forecast_days();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.schedule.cron.trim().is_empty() {
            self.schedule.cron = default_cron();
        }
        if self.state.file_path.as_os_str().is_empty() {
            self.state.file_path = default_state_file_path();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_mandatory()?;
        self.validate_thresholds()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Credentials and location have no defaults
    pub fn validate_mandatory(&self) -> Result<()> {
        self.telegram.credentials()?;
        let (lat, lon) = self.location.coordinates()?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(NoCloudsError::config(format!("Latitude {lat} is out of range")).into());
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(NoCloudsError::config(format!("Longitude {lon} is out of range")).into());
        }

        Ok(())
    }

    /// Validate good-weather thresholds
    fn validate_thresholds(&self) -> Result<()> {
        let thresholds = &self.thresholds;

        if thresholds.max_cloud_cover > 100 {
            return Err(NoCloudsError::config("Max cloud cover cannot exceed 100%").into());
        }

        if !thresholds.max_wind.is_finite() || thresholds.max_wind < 0.0 {
            return Err(NoCloudsError::config("Max wind must be a non-negative number").into());
        }

        if thresholds.night_start_hour > 23 || thresholds.night_end_hour > 23 {
            return Err(NoCloudsError::config("Night hours must be between 0 and 23").into());
        }

        if thresholds.window_size == 0 {
            return Err(NoCloudsError::config("Good weather window must be at least 1 hour").into());
        }

        if thresholds.window_size > 24 {
            return Err(NoCloudsError::config("Good weather window cannot exceed 24 hours").into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(NoCloudsError::config("Weather API timeout cannot exceed 300 seconds").into());
        }

        if self.weather.max_retries > 10 {
            return Err(NoCloudsError::config("Weather API max retries cannot exceed 10").into());
        }

        if self.weather.forecast_days > 16 {
            return Err(NoCloudsError::config("Open-Meteo forecasts at most 16 days").into());
        }

        if self.telegram.poll_timeout_seconds > 600 {
            return Err(NoCloudsError::config("Telegram poll timeout cannot exceed 600 seconds").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(NoCloudsError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(NoCloudsError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Weather API base URL", self.weather.base_url.as_str()),
            ("Telegram API base URL", self.telegram.api_base_url.as_str()),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(NoCloudsError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        crate::scheduler::parse_schedule(&self.schedule.cron)?;

        Ok(())
    }
}
