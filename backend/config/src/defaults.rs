//! Config defaults: applies default values to parsed config.

use encore_core::{BusyPolicy, EncodeConfig, FormatPreference};

use crate::schema::{
    DiscordConfig, EncoderConfig, EncoreConfig, LoggingConfig, MediaConfig, VoiceConfig,
};

pub const DEFAULT_PREFIX: &str = "e.";

pub const DEFAULT_ACTIVITY: &str = "Use e.help";

pub const DEFAULT_RESOLVER_BINARY: &str = "yt-dlp";

pub const DEFAULT_ENCODER_BINARY: &str = "dca";

/// Default metadata lookup limit (seconds).
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 30;

/// Default limit on connecting to the media host and on each body read (seconds).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 15;

/// Default voice handshake limit (seconds).
pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 10;

/// Frames queued in front of the voice transport, about one second of audio.
pub const DEFAULT_FRAME_BUFFER: usize = 50;

pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: EncoreConfig) -> EncoreConfig {
    let config = apply_discord_defaults(config);
    let config = apply_media_defaults(config);
    let config = apply_encoder_defaults(config);
    let config = apply_voice_defaults(config);
    let mut config = apply_logging_defaults(config);
    if config.shutdown_grace_secs.is_none() {
        config.shutdown_grace_secs = Some(DEFAULT_SHUTDOWN_GRACE_SECS);
    }
    config
}

fn apply_discord_defaults(mut config: EncoreConfig) -> EncoreConfig {
    let discord = config.discord.get_or_insert_with(DiscordConfig::default);
    if discord.prefix.is_none() {
        discord.prefix = Some(DEFAULT_PREFIX.to_string());
    }
    if discord.activity.is_none() {
        // Keep the status hint in step with a custom prefix.
        let prefix = discord.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
        discord.activity = Some(format!("Use {prefix}help"));
    }
    config
}

fn apply_media_defaults(mut config: EncoreConfig) -> EncoreConfig {
    let media = config.media.get_or_insert_with(MediaConfig::default);
    if media.resolver_binary.is_none() {
        media.resolver_binary = Some(DEFAULT_RESOLVER_BINARY.to_string());
    }
    if media.resolve_timeout_secs.is_none() {
        media.resolve_timeout_secs = Some(DEFAULT_RESOLVE_TIMEOUT_SECS);
    }
    if media.read_timeout_secs.is_none() {
        media.read_timeout_secs = Some(DEFAULT_READ_TIMEOUT_SECS);
    }
    if media.format.is_none() {
        media.format = Some(FormatPreference::default());
    }
    config
}

fn apply_encoder_defaults(mut config: EncoreConfig) -> EncoreConfig {
    let encoder = config.encoder.get_or_insert_with(EncoderConfig::default);
    if encoder.binary.is_none() {
        encoder.binary = Some(DEFAULT_ENCODER_BINARY.to_string());
    }
    if encoder.settings.is_none() {
        encoder.settings = Some(EncodeConfig::default());
    }
    config
}

fn apply_voice_defaults(mut config: EncoreConfig) -> EncoreConfig {
    let voice = config.voice.get_or_insert_with(VoiceConfig::default);
    if voice.frame_buffer.is_none() {
        voice.frame_buffer = Some(DEFAULT_FRAME_BUFFER);
    }
    if voice.join_timeout_secs.is_none() {
        voice.join_timeout_secs = Some(DEFAULT_JOIN_TIMEOUT_SECS);
    }
    if voice.busy_policy.is_none() {
        voice.busy_policy = Some(BusyPolicy::Reject);
    }
    config
}

fn apply_logging_defaults(mut config: EncoreConfig) -> EncoreConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}
