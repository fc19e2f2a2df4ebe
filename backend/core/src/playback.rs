use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, RelayError};
use crate::types::{GuildId, UserId};

/// One `play` command, validated. Discarded once the relay finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackRequest {
    requester: UserId,
    guild: GuildId,
    source_url: String,
}

impl PlaybackRequest {
    pub fn new(
        requester: UserId,
        guild: GuildId,
        source_url: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let source_url = source_url.into();
        validate_locator(&source_url)?;
        Ok(Self {
            requester,
            guild,
            source_url,
        })
    }

    pub fn requester(&self) -> UserId {
        self.requester
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Accepts absolute http(s) URLs with a host and no whitespace.
fn validate_locator(url: &str) -> Result<(), CoreError> {
    if url.trim().is_empty() {
        return Err(CoreError::InvalidRequest("source URL is empty".into()));
    }
    if url.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidRequest(
            "source URL contains whitespace".into(),
        ));
    }
    let parsed = Url::parse(url)
        .map_err(|e| CoreError::InvalidRequest(format!("invalid URL {url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::InvalidRequest(format!("unsupported locator: {url}")));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::InvalidRequest(format!("missing host: {url}")));
    }
    Ok(())
}

/// Relay controller states. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Idle,
    ChannelResolved,
    SessionJoined,
    Streaming,
    Completed,
    Failed,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Completed | RelayState::Failed)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Idle => "idle",
            RelayState::ChannelResolved => "channel_resolved",
            RelayState::SessionJoined => "session_joined",
            RelayState::Streaming => "streaming",
            RelayState::Completed => "completed",
            RelayState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal result of one relay, handed back to the command surface.
#[derive(Debug)]
pub enum PlaybackOutcome {
    Completed {
        frames_sent: u64,
    },
    Failed {
        /// Last non-terminal state reached before the failure.
        at: RelayState,
        error: RelayError,
    },
}

impl PlaybackOutcome {
    pub fn failed(at: RelayState, error: impl Into<RelayError>) -> Self {
        PlaybackOutcome::Failed {
            at,
            error: error.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PlaybackOutcome::Completed { .. })
    }

    pub fn error(&self) -> Option<&RelayError> {
        match self {
            PlaybackOutcome::Completed { .. } => None,
            PlaybackOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// What a `play` does when its guild is already streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Fail at once with `RelayError::Busy`.
    #[default]
    Reject,
    /// Wait for the current playback to finish.
    Queue,
}
