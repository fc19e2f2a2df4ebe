//! Config validation: schema checks with user-friendly error messages.

use thiserror::Error;

use crate::schema::EncoreConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &EncoreConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_discord(config, &mut report);
    validate_media(config, &mut report);
    validate_encoder(config, &mut report);
    validate_voice(config, &mut report);
    if config.shutdown_grace_secs == Some(0) {
        report.warn(
            "shutdownGraceSecs",
            "Playbacks will be aborted without a chance to leave voice channels",
        );
    }
    report
}

fn validate_discord(config: &EncoreConfig, report: &mut ValidationReport) {
    if config.token().is_none() {
        report.error(
            "discord.token",
            "Discord bot token is required (set DISCORD_TOKEN)",
        );
    }
    let prefix = config.prefix();
    if prefix.is_empty() {
        report.error("discord.prefix", "Command prefix cannot be empty");
    } else if prefix.chars().any(char::is_whitespace) {
        report.error("discord.prefix", "Command prefix cannot contain whitespace");
    }
}

fn validate_media(config: &EncoreConfig, report: &mut ValidationReport) {
    if config.resolver_binary().trim().is_empty() {
        report.error("media.resolverBinary", "Resolver binary cannot be empty");
    }
    if config.resolve_timeout().is_zero() {
        report.error("media.resolveTimeoutSecs", "resolveTimeoutSecs must be > 0");
    }
    if config.read_timeout().is_zero() {
        report.error("media.readTimeoutSecs", "readTimeoutSecs must be > 0");
    }
    let format = config.format_preference();
    if format.preferred_format_ids.is_empty() && format.allowed_codecs.is_empty() {
        report.error(
            "media.format",
            "Either preferredFormatIds or allowedCodecs must list something",
        );
    }
    if format.allowed_codecs.is_empty() {
        report.warn(
            "media.format.allowedCodecs",
            "No fallback codecs; only preferredFormatIds can match",
        );
    }
}

fn validate_encoder(config: &EncoreConfig, report: &mut ValidationReport) {
    if config.encoder_binary().trim().is_empty() {
        report.error("encoder.binary", "Encoder binary cannot be empty");
    }
    if let Some(problem) = config.encode_settings().check() {
        report.error("encoder.settings", problem);
    }
}

fn validate_voice(config: &EncoreConfig, report: &mut ValidationReport) {
    if config.frame_buffer() == 0 {
        report.error("voice.frameBuffer", "frameBuffer must be >= 1");
    }
    if config.join_timeout().is_zero() {
        report.error("voice.joinTimeoutSecs", "joinTimeoutSecs must be > 0");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DiscordConfig, EncoderConfig, MediaConfig, VoiceConfig};
    use encore_core::EncodeConfig;

    fn with_token() -> EncoreConfig {
        EncoreConfig {
            discord: Some(DiscordConfig {
                token: Some("token".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_config_is_valid() {
        let report = validate(&with_token());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn missing_token_is_error() {
        let report = validate(&EncoreConfig::default());
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "discord.token");
    }

    #[test]
    fn bad_encoder_settings_are_errors() {
        let mut cfg = with_token();
        cfg.encoder = Some(EncoderConfig {
            settings: Some(EncodeConfig {
                bitrate_kbps: 1024,
                ..Default::default()
            }),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "encoder.settings"));
    }

    #[test]
    fn zero_frame_buffer_is_error() {
        let mut cfg = with_token();
        cfg.voice = Some(VoiceConfig {
            frame_buffer: Some(0),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "voice.frameBuffer"));
    }

    #[test]
    fn zero_read_timeout_is_error() {
        let mut cfg = with_token();
        cfg.media = Some(MediaConfig {
            read_timeout_secs: Some(0),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "media.readTimeoutSecs"));
    }

    #[test]
    fn whitespace_prefix_is_error() {
        let mut cfg = with_token();
        cfg.discord.as_mut().unwrap().prefix = Some("e .".into());
        assert!(!validate(&cfg).is_valid());
    }
}
