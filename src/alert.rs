//! Proactive clear-sky alerts
//!
//! Each scheduled run looks for clear windows starting within the next 24
//! hours and compares the answer with the persisted notification state. A
//! message goes out only when the answer flips:
//!
//! | state | windows ahead | action                         |
//! |-------|---------------|--------------------------------|
//! | Bad   | yes           | send good alert, persist Good  |
//! | Good  | no            | send cloudy alert, persist Bad |
//! | any   | same as state | nothing                        |

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::Result;
use crate::forecast::ForecastService;
use crate::models::Sample;
use crate::stargazing::render_report;
use crate::state::{NotificationState, StateStore};
use crate::telegram::{ChatTransport, OutgoingMessage};

pub const GOOD_WEATHER_ALERT: &str = "Хороша погода сьогодні! 🥳";
pub const BAD_WEATHER_ALERT: &str = "Сьогодні хмарно 🥺";

/// Outcome of one alert check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameGood,
    BecameBad,
    Unchanged,
}

/// New state to enter, if any
#[must_use]
pub fn decide(current: NotificationState, has_windows: bool) -> Option<NotificationState> {
    match (current, has_windows) {
        (NotificationState::Bad, true) => Some(NotificationState::Good),
        (NotificationState::Good, false) => Some(NotificationState::Bad),
        _ => None,
    }
}

/// Alert text for a transition into `state`
#[must_use]
pub fn alert_text(state: NotificationState, upcoming: &[Sample]) -> String {
    match state {
        NotificationState::Good => format!("{GOOD_WEATHER_ALERT}\n\n{}", render_report(upcoming)),
        NotificationState::Bad => BAD_WEATHER_ALERT.to_string(),
    }
}

/// Runs the 24-hour check against the stored state
pub struct AlertService {
    chat_id: i64,
    forecasts: ForecastService,
    state: Arc<dyn StateStore>,
    transport: Arc<dyn ChatTransport>,
    // serializes read-decide-send-write
    lock: Mutex<()>,
}

impl AlertService {
    pub fn new(
        chat_id: i64,
        forecasts: ForecastService,
        state: Arc<dyn StateStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            chat_id,
            forecasts,
            state,
            transport,
            lock: Mutex::new(()),
        }
    }

    /// Check the next 24 hours and alert on a state change.
    ///
    /// A failed forecast fetch skips the cycle without touching the state.
    /// Delivery is best effort: the new state is persisted even when the
    /// message could not be sent.
    #[tracing::instrument(name = "check_next_24h", skip(self))]
    pub async fn check_next_24h(&self, now: DateTime<Utc>) -> Result<Transition> {
        let upcoming = self.forecasts.next_24h(now).await?;

        let _guard = self.lock.lock().await;

        let current = match self.state.read().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Could not read notification state, assuming no alert was sent");
                NotificationState::Bad
            }
        };

        let Some(next) = decide(current, !upcoming.is_empty()) else {
            info!(state = %current, windows = upcoming.len(), "No change in the 24h forecast");
            return Ok(Transition::Unchanged);
        };

        info!(from = %current, to = %next, windows = upcoming.len(), "Forecast changed, sending alert");
        let message = OutgoingMessage::mono(self.chat_id, &alert_text(next, &upcoming));
        if let Err(e) = self.transport.send(message).await {
            error!(error = %e, "Failed to deliver alert");
        }

        self.state.write(next).await?;

        Ok(match next {
            NotificationState::Good => Transition::BecameGood,
            NotificationState::Bad => Transition::BecameBad,
        })
    }
}
