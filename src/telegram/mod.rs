//! Telegram Bot API integration
//!
//! Wire types for the handful of Bot API methods the service uses, the
//! [`ChatTransport`] seam that alerts and replies go through, and the
//! long-polling dispatcher for incoming chat messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub mod client;
pub mod handler;
pub mod markdown;

pub use client::TelegramClient;
pub use handler::{ChatHandler, ChatRequest, run_polling};
pub use markdown::{escape_markdown_v2, mono};

/// Text of the single reply keyboard button
pub const FORECAST_BUTTON: &str = "Прогноз на 7 днів";

/// Incoming update from `getUpdates`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

impl ReplyKeyboardMarkup {
    /// One row with the 7-day forecast button
    #[must_use]
    pub fn forecast() -> Self {
        Self {
            keyboard: vec![vec![KeyboardButton {
                text: FORECAST_BUTTON.to_string(),
            }]],
            resize_keyboard: true,
        }
    }
}

/// `sendMessage` body. Text is always sent as MarkdownV2.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyKeyboardMarkup>,
}

impl OutgoingMessage {
    /// Plain text shown as a monospaced block
    #[must_use]
    pub fn mono(chat_id: i64, text: &str) -> Self {
        Self {
            chat_id,
            text: mono(text),
            parse_mode: "MarkdownV2",
            reply_markup: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self) -> Self {
        self.reply_markup = Some(ReplyKeyboardMarkup::forecast());
        self
    }
}

/// Delivery of outbound messages
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<()>;
}

/// Source of incoming updates for the polling loop
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn next_updates(&self, offset: i64) -> Result<Vec<Update>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::NoCloudsError;
    use std::sync::Mutex;

    /// Transport that keeps every message, optionally failing each send
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub sent: Mutex<Vec<OutgoingMessage>>,
        pub fail: bool,
    }

    impl RecordingTransport {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn messages(&self) -> Vec<OutgoingMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send(&self, message: OutgoingMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message);
            if self.fail {
                return Err(NoCloudsError::telegram("send failed"));
            }
            Ok(())
        }
    }
}
