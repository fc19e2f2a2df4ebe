//! Environment variable substitution and overrides for config values.
//!
//! Supports `${VAR_NAME}` syntax in string values, resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` variable names are matched.
//! `$${}` escapes to a literal `${}`.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{DiscordConfig, EncoreConfig, LoggingConfig};

/// Overrides `discord.token`.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Overrides `discord.prefix`.
pub const PREFIX_ENV: &str = "ENCORE_PREFIX";

/// Overrides `logging.level`.
pub const LOG_ENV: &str = "ENCORE_LOG";

/// Pattern matching valid uppercase env var names.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Pattern matching escaped env var references (`$${}` → `${}`).
static ESCAPED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree.
///
/// Only string leaves are processed. Fails if any referenced variable is
/// unset or empty in `env`.
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value> {
    match value {
        Value::String(s) => {
            let substituted = substitute_string(s, env, path)?;
            Ok(Value::String(substituted))
        }
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        // Primitives pass through unchanged.
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let result = s.to_string();

    // Substitute real vars; escaped `$${VAR}` references are skipped here
    let mut error: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(&result, |caps: &regex::Captures| {
        if error.is_some() {
            return String::new();
        }
        let var_name = &caps[1];
        // Skip if this was an escaped ref position (heuristic: check $$)
        if let Some(start) = caps.get(0).map(|m| m.start()) {
            let bytes = result.as_bytes();
            if start > 0 && bytes.get(start.saturating_sub(1)) == Some(&b'$') {
                return caps[0].to_string();
            }
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                error = Some(MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = error {
        bail!(err);
    }

    // Restore escaped refs: $${ → ${
    let final_result = ESCAPED_PATTERN
        .replace_all(&substituted, |caps: &regex::Captures| {
            format!("${{{}}}", &caps[1])
        })
        .to_string();

    Ok(final_result)
}

/// Apply `DISCORD_TOKEN`, `ENCORE_PREFIX` and `ENCORE_LOG` from `env`.
///
/// Empty values are ignored so an exported-but-blank variable does not wipe
/// a token set in the file.
pub fn apply_env_overrides_with(
    mut config: EncoreConfig,
    env: &HashMap<String, String>,
) -> EncoreConfig {
    let get = |name: &str| env.get(name).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(token) = get(TOKEN_ENV) {
        config.discord.get_or_insert_with(DiscordConfig::default).token = Some(token);
    }
    if let Some(prefix) = get(PREFIX_ENV) {
        config.discord.get_or_insert_with(DiscordConfig::default).prefix = Some(prefix);
    }
    if let Some(level) = get(LOG_ENV) {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level);
    }
    config
}
