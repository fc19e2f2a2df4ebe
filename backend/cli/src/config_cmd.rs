//! `encore config`: show the effective configuration.

use std::path::Path;

use anyhow::{Context, Result};

use encore_config::{collect_redacted_paths, load_resolved, redact, validate};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

pub async fn run(path: &Path) -> Result<()> {
    if path.exists() {
        note_info(&format!("Config file: {}", path.display()));
    } else {
        note_info(&format!("No config file at {}; using defaults", path.display()));
    }

    let config = load_resolved(path).await?;
    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    let masked = collect_redacted_paths(&value);

    println!("{}", serde_json::to_string_pretty(&redact(&value))?);
    if !masked.is_empty() {
        note_info(&format!("Masked: {}", masked.join(", ")));
    }

    let report = validate(&config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    if report.is_valid() {
        note_success("Configuration is valid");
        Ok(())
    } else {
        anyhow::bail!("{} configuration error(s)", report.errors.len())
    }
}
