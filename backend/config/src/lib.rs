//! `encore-config`: runtime configuration for the encore bot.
//!
//! Provides:
//! - Typed config schema (platform, media, encoder, voice, logging)
//! - YAML loading from `~/.encore/config.yaml` or an explicit path
//! - `${ENV_VAR}` substitution and environment overrides
//! - Config redaction for safe logging/display
//! - Default value application
//! - Schema validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use schema::{DiscordConfig, EncoderConfig, EncoreConfig, LoggingConfig, MediaConfig, VoiceConfig};
pub use io::{config_dir, config_file_path, load_config};
pub use env::{apply_env_overrides_with, resolve_env_vars_with, MissingEnvVarError};
pub use redact::{redact, collect_redacted_paths};
pub use defaults::apply_all_defaults;
pub use validation::{validate, ValidationReport, ConfigValidationError};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load a config, apply env substitution, overrides and defaults, without
/// rejecting invalid values. Used by `encore config` to show what is wrong.
pub async fn load_resolved(path: &Path) -> Result<EncoreConfig> {
    load_resolved_with(path, &std::env::vars().collect()).await
}

/// [`load_resolved`] against a provided environment (useful for testing).
pub async fn load_resolved_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<EncoreConfig> {
    let raw_config = load_config(path).await?;

    // Serialize to Value for the env substitution pass.
    let value: Value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;

    // Substitute ${VAR} env vars.
    let value = resolve_env_vars_with(&value, env)
        .context("Failed to resolve env vars in config")?;

    // Deserialize back to typed config.
    let config: EncoreConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides_with(config, env);
    Ok(apply_all_defaults(config))
}

/// Load, substitute, override, default and validate a config file against
/// `env`. Any validation error is returned instead of a config.
pub async fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<EncoreConfig> {
    let config = load_resolved_with(path, env).await?;
    ensure_valid(&config)?;
    Ok(config)
}

/// Log every validation finding and fail if any of them is an error.
pub fn ensure_valid(config: &EncoreConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let summary: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration: {}", summary.join("; "));
    }
    Ok(())
}
