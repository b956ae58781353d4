//! Chat dispatcher and long-polling loop

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{ChatTransport, FORECAST_BUTTON, OutgoingMessage, Update, UpdateSource};
use crate::Result;
use crate::forecast::ForecastService;

pub const START_MESSAGE: &str = "Розпочнімо. Тицяй кнопку.";
pub const UNKNOWN_MESSAGE: &str = "Не розумію...";
pub const NO_WINDOWS_MESSAGE: &str = "Хмарно наступні 7 днів 🥺";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// What an incoming chat message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRequest {
    Start,
    SevenDayForecast,
    Unknown,
}

impl ChatRequest {
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let command = text.split_whitespace().next().unwrap_or_default();
        if command == "/start" || command.starts_with("/start@") {
            ChatRequest::Start
        } else if text == FORECAST_BUTTON {
            ChatRequest::SevenDayForecast
        } else {
            ChatRequest::Unknown
        }
    }
}

/// Answers messages from the one authorized chat
pub struct ChatHandler {
    chat_id: i64,
    forecasts: ForecastService,
    transport: Arc<dyn ChatTransport>,
}

impl ChatHandler {
    pub fn new(chat_id: i64, forecasts: ForecastService, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            chat_id,
            forecasts,
            transport,
        }
    }

    fn is_authorized(&self, chat_id: i64) -> bool {
        chat_id == self.chat_id
    }

    /// Reply text for a request, before MarkdownV2 formatting
    pub async fn reply_text(&self, request: ChatRequest, now: DateTime<Utc>) -> String {
        match request {
            ChatRequest::Start => START_MESSAGE.to_string(),
            ChatRequest::Unknown => UNKNOWN_MESSAGE.to_string(),
            ChatRequest::SevenDayForecast => match self.forecasts.seven_day_report(now).await {
                Ok(Some(report)) => report,
                Ok(None) => NO_WINDOWS_MESSAGE.to_string(),
                Err(e) => {
                    error!(error = %e, "Failed to build 7-day forecast");
                    e.user_message()
                }
            },
        }
    }

    /// Handle one update. Updates without a message and foreign chats are ignored.
    #[tracing::instrument(name = "handle_update", skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle(&self, update: &Update, now: DateTime<Utc>) -> Result<()> {
        let Some(message) = &update.message else {
            debug!("Update carries no message");
            return Ok(());
        };

        if !self.is_authorized(message.chat.id) {
            warn!(chat_id = message.chat.id, "Unauthorized chat, ignoring message");
            return Ok(());
        }

        let text = message.text.as_deref().unwrap_or_default();
        let user = message
            .from
            .as_ref()
            .and_then(|user| user.username.as_deref())
            .unwrap_or("unknown");
        info!(user, text, "Received message");

        let request = ChatRequest::classify(text);
        let reply = self.reply_text(request, now).await;

        self.transport
            .send(OutgoingMessage::mono(message.chat.id, &reply).with_keyboard())
            .await
    }
}

/// Poll for updates and dispatch them until `shutdown` flips to true
pub async fn run_polling<S>(source: &S, handler: &ChatHandler, mut shutdown: watch::Receiver<bool>)
where
    S: UpdateSource + ?Sized,
{
    let mut offset = 0_i64;
    let mut backoff = INITIAL_BACKOFF;

    info!("Listening for chat messages");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let batch = tokio::select! {
            _ = shutdown.changed() => break,
            batch = source.next_updates(offset) => batch,
        };

        match batch {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Err(e) = handler.handle(&update, Utc::now()).await {
                        error!(error = %e, update_id = update.update_id, "Failed to answer message");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, retry_in = ?backoff, "Failed to fetch updates");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
    info!("Polling stopped");
}
