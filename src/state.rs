//! Persisted notification flag
//!
//! The flag remembers whether the last proactive alert was "good" so the
//! service only speaks up on transitions. It lives in a one-character file
//! ("0" or "1") so operators can inspect and reset it by hand.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{NoCloudsError, Result};

const STATE_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Last alert that was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationState {
    /// No clear window announced (or a cloudy notice was sent last)
    #[default]
    Bad,
    /// A clear window was announced
    Good,
}

impl NotificationState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationState::Bad => "0",
            NotificationState::Good => "1",
        }
    }
}

impl fmt::Display for NotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationState {
    type Err = NoCloudsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(NotificationState::Bad),
            "1" => Ok(NotificationState::Good),
            other => Err(NoCloudsError::state_io(format!(
                "unrecognized notification state {other:?}"
            ))),
        }
    }
}

/// Storage for the notification flag
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn read(&self) -> Result<NotificationState>;
    async fn write(&self, state: NotificationState) -> Result<()>;
}

/// Flag stored in a plain text file
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reset the flag to Bad, creating the file if needed. Run once at startup.
    pub async fn initialize(&self) -> Result<()> {
        self.write(NotificationState::Bad).await
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    #[tracing::instrument(name = "read_state", level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn read(&self) -> Result<NotificationState> {
        let contents = tokio::time::timeout(STATE_IO_TIMEOUT, tokio::fs::read_to_string(&self.path))
            .await
            .map_err(|_| NoCloudsError::state_io("timed out reading state file"))?
            .map_err(|e| {
                NoCloudsError::state_io(format!("failed to read {}: {e}", self.path.display()))
            })?;
        let state = contents.parse()?;
        debug!(%state, "Read notification state");
        Ok(state)
    }

    #[tracing::instrument(name = "write_state", level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn write(&self, state: NotificationState) -> Result<()> {
        tokio::time::timeout(STATE_IO_TIMEOUT, tokio::fs::write(&self.path, state.as_str()))
            .await
            .map_err(|_| NoCloudsError::state_io("timed out writing state file"))?
            .map_err(|e| {
                NoCloudsError::state_io(format!("failed to write {}: {e}", self.path.display()))
            })
    }
}

/// In-process flag, used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<NotificationState>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new(initial: NotificationState) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self) -> Result<NotificationState> {
        Ok(*self.state.lock().await)
    }

    async fn write(&self, state: NotificationState) -> Result<()> {
        *self.state.lock().await = state;
        Ok(())
    }
}
