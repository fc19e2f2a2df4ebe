use thiserror::Error;

use crate::types::GuildId;

/// Errors raised while building core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid playback request: {0}")]
    InvalidRequest(String),
}

/// Failures of the frame source resolver. All are terminal for the request.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("no stream variant matches the format preference: {0}")]
    NoMatchingFormat(String),

    #[error("network failure reaching the media provider: {0}")]
    Network(String),
}

/// Failures of the encode pipeline.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("encoder failed to start: {0}")]
    Startup(String),

    #[error("corrupt or unreadable frame: {0}")]
    FrameRead(String),

    #[error("source stream interrupted: {0}")]
    SourceInterrupted(String),
}

/// Failures of the voice transport.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice join failed: {0}")]
    Join(String),

    #[error("voice transport closed: {0}")]
    TransportClosed(String),

    #[error("voice protocol violation: {0}")]
    Protocol(String),
}

/// How a relay failure is treated when it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caused by what the requester typed or where they are. Reply only.
    UserInput,
    /// The media provider or the encoder failed. Reply and log.
    Upstream,
    /// The voice transport failed. Reply and log.
    Transport,
    /// The process is going down.
    Shutdown,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::UserInput => "user_input",
            ErrorClass::Upstream => "upstream",
            ErrorClass::Transport => "transport",
            ErrorClass::Shutdown => "shutdown",
        }
    }
}

/// Terminal failure of one relay invocation.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    InvalidRequest(#[from] CoreError),

    #[error("requester is not in a voice channel")]
    NotInVoiceChannel,

    #[error("guild {0} already has an active playback")]
    Busy(GuildId),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("playback cancelled by shutdown")]
    Cancelled,
}

impl RelayError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RelayError::InvalidRequest(_) | RelayError::NotInVoiceChannel | RelayError::Busy(_) => {
                ErrorClass::UserInput
            }
            RelayError::Resolve(_) | RelayError::Transcode(_) => ErrorClass::Upstream,
            RelayError::Voice(_) => ErrorClass::Transport,
            RelayError::Cancelled => ErrorClass::Shutdown,
        }
    }
}
