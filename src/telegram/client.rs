use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::time::Duration;
use tracing::{debug, info};

use super::{ChatTransport, OutgoingMessage, Update, UpdateSource, User};
use crate::config::TelegramConfig;
use crate::{NoCloudsError, Result};

/// Slack on top of the long-poll timeout before the HTTP client gives up
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Bot API envelope: `{"ok": true, "result": ...}` or `{"ok": false, "description": ...}`
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(NoCloudsError::telegram(format!(
                "{method} failed ({}): {}",
                self.error_code.unwrap_or_default(),
                self.description.as_deref().unwrap_or("no description")
            ))),
        }
    }
}

/// Minimal Telegram Bot API client
pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout: u32,
}

impl TelegramClient {
    /// Create a new client; fails when the bot token is missing
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let (token, _) = config.credentials()?;
        let poll_timeout = config.poll_timeout_seconds;

        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout.into()) + POLL_GRACE)
            .user_agent(concat!("noclouds/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NoCloudsError::telegram(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_base_url.trim_end_matches('/'), token),
            poll_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn decode<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            NoCloudsError::telegram(format!("{method}: unreadable response (HTTP {status}): {}", e.without_url()))
        })?;
        envelope.into_result(method)
    }

    fn transport_error(method: &str, err: reqwest::Error) -> NoCloudsError {
        // the URL carries the bot token
        NoCloudsError::telegram(format!("{method} request failed: {}", err.without_url()))
    }

    /// Verify the token and return the bot account
    #[tracing::instrument(name = "telegram_get_me", skip(self))]
    pub async fn get_me(&self) -> Result<User> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| Self::transport_error("getMe", e))?;
        let user: User = Self::decode("getMe", response).await?;
        info!(
            username = user.username.as_deref().unwrap_or_default(),
            "Authorized on Telegram"
        );
        Ok(user)
    }

    /// Long-poll for updates with ids at or above `offset`
    #[tracing::instrument(name = "telegram_get_updates", level = "debug", skip(self))]
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!(
            "{}?offset={offset}&timeout={}",
            self.method_url("getUpdates"),
            self.poll_timeout
        );
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::transport_error("getUpdates", e))?;
        let updates: Vec<Update> = Self::decode("getUpdates", response).await?;
        debug!(count = updates.len(), "Received updates");
        Ok(updates)
    }

    /// Send one message
    #[tracing::instrument(name = "telegram_send_message", skip(self, message), fields(chat_id = message.chat_id))]
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(message)
            .send()
            .await
            .map_err(|e| Self::transport_error("sendMessage", e))?;
        let _: IgnoredAny = Self::decode("sendMessage", response).await?;
        debug!("Message delivered");
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.send_message(&message).await
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn next_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.get_updates(offset).await
    }
}
