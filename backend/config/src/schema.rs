//! encore runtime configuration schema.
//!
//! Every field is optional on disk; [`crate::defaults`] fills the gaps and
//! the accessors on [`EncoreConfig`] fall back to the same defaults.

use std::path::PathBuf;
use std::time::Duration;

use encore_core::{BusyPolicy, EncodeConfig, FormatPreference};
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_ACTIVITY, DEFAULT_ENCODER_BINARY, DEFAULT_FRAME_BUFFER, DEFAULT_JOIN_TIMEOUT_SECS,
    DEFAULT_LOG_LEVEL, DEFAULT_PREFIX, DEFAULT_READ_TIMEOUT_SECS, DEFAULT_RESOLVER_BINARY,
    DEFAULT_RESOLVE_TIMEOUT_SECS, DEFAULT_SHUTDOWN_GRACE_SECS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreConfig {
    /// Platform credentials and command surface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,

    /// Source resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaConfig>,

    /// Opus encoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<EncoderConfig>,

    /// Voice transport and per-guild policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Seconds in-flight playbacks get to unwind on shutdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_grace_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Bot token. Usually `${DISCORD_TOKEN}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// "Playing ..." status text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver_binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_timeout_secs: Option<u64>,
    /// Stall limit for the media download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatPreference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<EncodeConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// Frames buffered in front of the voice transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_buffer: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_policy: Option<BusyPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `encore_relay=debug,info`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for daily NDJSON log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// JSON console output instead of human-readable lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl EncoreConfig {
    /// The bot token, if one is configured and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.discord
            .as_ref()
            .and_then(|d| d.token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn prefix(&self) -> &str {
        self.discord
            .as_ref()
            .and_then(|d| d.prefix.as_deref())
            .unwrap_or(DEFAULT_PREFIX)
    }

    pub fn activity(&self) -> &str {
        self.discord
            .as_ref()
            .and_then(|d| d.activity.as_deref())
            .unwrap_or(DEFAULT_ACTIVITY)
    }

    pub fn resolver_binary(&self) -> &str {
        self.media
            .as_ref()
            .and_then(|m| m.resolver_binary.as_deref())
            .unwrap_or(DEFAULT_RESOLVER_BINARY)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(
            self.media
                .as_ref()
                .and_then(|m| m.resolve_timeout_secs)
                .unwrap_or(DEFAULT_RESOLVE_TIMEOUT_SECS),
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(
            self.media
                .as_ref()
                .and_then(|m| m.read_timeout_secs)
                .unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
        )
    }

    pub fn format_preference(&self) -> FormatPreference {
        self.media
            .as_ref()
            .and_then(|m| m.format.clone())
            .unwrap_or_default()
    }

    pub fn encoder_binary(&self) -> &str {
        self.encoder
            .as_ref()
            .and_then(|e| e.binary.as_deref())
            .unwrap_or(DEFAULT_ENCODER_BINARY)
    }

    pub fn encode_settings(&self) -> EncodeConfig {
        self.encoder
            .as_ref()
            .and_then(|e| e.settings.clone())
            .unwrap_or_default()
    }

    pub fn frame_buffer(&self) -> usize {
        self.voice
            .as_ref()
            .and_then(|v| v.frame_buffer)
            .unwrap_or(DEFAULT_FRAME_BUFFER)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(
            self.voice
                .as_ref()
                .and_then(|v| v.join_timeout_secs)
                .unwrap_or(DEFAULT_JOIN_TIMEOUT_SECS),
        )
    }

    pub fn busy_policy(&self) -> BusyPolicy {
        self.voice
            .as_ref()
            .and_then(|v| v.busy_policy)
            .unwrap_or_default()
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs.unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS))
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn dir(&self) -> Option<PathBuf> {
        self.dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn json(&self) -> bool {
        self.json.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let cfg = EncoreConfig::default();
        assert_eq!(cfg.token(), None);
        assert_eq!(cfg.prefix(), "e.");
        assert_eq!(cfg.busy_policy(), BusyPolicy::Reject);
        assert_eq!(cfg.encode_settings(), EncodeConfig::default());
        assert_eq!(cfg.join_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.read_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn parses_camel_case_yaml() {
        let raw = r#"
discord:
  token: abc.def.ghi
  prefix: "!"
media:
  resolveTimeoutSecs: 12
  readTimeoutSecs: 7
  format:
    preferredFormatIds: ["251"]
    targetBitrateKbps: 160
encoder:
  settings:
    bitrateKbps: 96
    application: lowdelay
voice:
  busyPolicy: queue
  frameBuffer: 16
shutdownGraceSecs: 3
"#;
        let cfg: EncoreConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(cfg.token(), Some("abc.def.ghi"));
        assert_eq!(cfg.prefix(), "!");
        assert_eq!(cfg.resolve_timeout(), Duration::from_secs(12));
        assert_eq!(cfg.read_timeout(), Duration::from_secs(7));
        let format = cfg.format_preference();
        assert_eq!(format.preferred_format_ids, vec!["251".to_string()]);
        assert_eq!(format.target_bitrate_kbps, 160);
        assert_eq!(format.bitrate_tolerance_kbps, 64);
        assert_eq!(cfg.encode_settings().bitrate_kbps, 96);
        assert_eq!(cfg.encode_settings().frame_size, 960);
        assert_eq!(cfg.busy_policy(), BusyPolicy::Queue);
        assert_eq!(cfg.frame_buffer(), 16);
        assert_eq!(cfg.shutdown_grace(), Duration::from_secs(3));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let cfg = EncoreConfig {
            discord: Some(DiscordConfig {
                token: Some("  ".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(cfg.token(), None);
    }
}
