pub mod error;
pub mod playback;
pub mod traits;
pub mod types;

pub use error::{CoreError, ErrorClass, RelayError, ResolveError, TranscodeError, VoiceError};
pub use playback::{BusyPolicy, PlaybackOutcome, PlaybackRequest, RelayState};
pub use traits::{
    FrameStream, PlaybackService, SourceResolver, Transcoder, VoiceChannelLocator,
    VoiceConnector, VoiceLink,
};
pub use types::{
    Application, ByteStream, ChannelId, EncodeConfig, FormatPreference, GuildId, ResolvedSource,
    SourceFormat, UserId,
};
