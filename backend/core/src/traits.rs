use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ResolveError, TranscodeError, VoiceError};
use crate::playback::{PlaybackOutcome, PlaybackRequest};
use crate::types::{ChannelId, EncodeConfig, GuildId, ResolvedSource, UserId};

/// Turns a page or media URL into a live encoded audio stream.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Resolver name for logging.
    fn name(&self) -> &str;

    /// Open the best matching audio variant of `url`. The caller owns (and
    /// eventually drops) the returned stream.
    async fn resolve(&self, url: &str) -> Result<ResolvedSource, ResolveError>;
}

/// Converts a resolved source into transport-ready opus frames.
#[async_trait]
pub trait Transcoder: Send + Sync {
    fn name(&self) -> &str;

    /// Start an encode pipeline fed by `source`.
    async fn transcode(
        &self,
        source: ResolvedSource,
        config: &EncodeConfig,
    ) -> Result<Box<dyn FrameStream>, TranscodeError>;
}

/// Lazy, finite, non-restartable sequence of encoded frames.
///
/// Frames come out in playback order. `Ok(None)` marks the end of input,
/// including input that was cut off in the middle of a frame.
#[async_trait]
pub trait FrameStream: Send {
    async fn next_frame(&mut self) -> Result<Option<Bytes>, TranscodeError>;

    /// Release the pipeline. Only the first call has an effect.
    async fn close(&mut self);
}

/// Establishes voice connections with the platform.
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    /// Perform the voice handshake. On error no partial connection is left
    /// behind.
    async fn connect(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Box<dyn VoiceLink>, VoiceError>;
}

/// One established voice connection.
#[async_trait]
pub trait VoiceLink: Send + Sync {
    async fn set_speaking(&mut self, speaking: bool) -> Result<(), VoiceError>;

    /// Hand one frame to the outbound path. May wait for the transport to
    /// accept it.
    async fn send(&mut self, frame: Bytes) -> Result<(), VoiceError>;

    async fn disconnect(&mut self) -> Result<(), VoiceError>;
}

/// Finds the voice channel a user currently sits in.
pub trait VoiceChannelLocator: Send + Sync {
    fn locate(&self, guild: GuildId, user: UserId) -> Option<ChannelId>;
}

/// Entry point the command surface uses to start a playback.
#[async_trait]
pub trait PlaybackService: Send + Sync {
    async fn play(&self, request: PlaybackRequest) -> PlaybackOutcome;
}
