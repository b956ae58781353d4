//! `noclouds` - Telegram alerts for clear and calm night skies
//!
//! This library evaluates hourly weather forecasts for stargazing windows
//! (low cloud cover, calm wind, night hours), annotates them with moon
//! illumination and delivers alerts and on-demand reports over Telegram.

pub mod alert;
pub mod config;
pub mod error;
pub mod forecast;
pub mod models;
pub mod scheduler;
pub mod stargazing;
pub mod state;
pub mod telegram;
pub mod telemetry;
pub mod weather;

// Re-export core types for public API
pub use alert::{AlertService, Transition};
pub use config::NoCloudsConfig;
pub use error::NoCloudsError;
pub use forecast::ForecastService;
pub use models::Sample;
pub use stargazing::Thresholds;
pub use state::{FileStateStore, MemoryStateStore, NotificationState, StateStore};
pub use telegram::{ChatHandler, ChatTransport, TelegramClient};
pub use weather::{ForecastSource, OpenMeteoClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, NoCloudsError>;
