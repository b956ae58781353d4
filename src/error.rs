//! Error types and handling for the `noclouds` service

use thiserror::Error;

/// Main error type for the `noclouds` service
#[derive(Error, Debug)]
pub enum NoCloudsError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network failure or non-success response from the weather provider
    #[error("Fetch error: {message}")]
    Fetch { message: String },

    /// Weather response body could not be turned into samples
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The persisted notification flag could not be read or written
    #[error("State error: {message}")]
    StateIo { message: String },

    /// Telegram Bot API failures
    #[error("Telegram error: {message}")]
    Telegram { message: String },
}

impl NoCloudsError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new state I/O error
    pub fn state_io<S: Into<String>>(message: S) -> Self {
        Self::StateIo {
            message: message.into(),
        }
    }

    /// Create a new Telegram error
    pub fn telegram<S: Into<String>>(message: S) -> Self {
        Self::Telegram {
            message: message.into(),
        }
    }

    /// Whether the failure came from the weather provider and the cycle should just be skipped
    #[must_use]
    pub fn is_forecast_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Parse { .. })
    }

    /// Chat reply describing the failure to the bot's user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            NoCloudsError::Fetch { .. } => {
                "Не вдалося отримати прогноз погоди. Спробуй пізніше.".to_string()
            }
            NoCloudsError::Parse { .. } => {
                "Сервіс погоди повернув незрозумілі дані. Спробуй пізніше.".to_string()
            }
            NoCloudsError::Config { .. }
            | NoCloudsError::StateIo { .. }
            | NoCloudsError::Telegram { .. } => {
                "Щось пішло не так. Спробуй пізніше.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for NoCloudsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NoCloudsError::parse(err.to_string())
        } else {
            NoCloudsError::fetch(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for NoCloudsError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => NoCloudsError::fetch(err.to_string()),
        }
    }
}
