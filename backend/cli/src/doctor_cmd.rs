//! `encore doctor`: check what the bot needs before it goes online.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use tokio::process::Command;

use encore_config::{load_resolved, EncoreConfig};

use crate::terminal_output::{note_error, note_success, note_warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes the full doctor diagnosis.
pub async fn run(path: &Path) -> Result<()> {
    println!("\nRunning encore doctor...\n");
    let config = load_resolved(path).await?;

    let token_ok = check_token(&config);
    let resolver_ok = check_binary("resolver", config.resolver_binary(), "--version").await;
    let encoder_ok = check_binary("encoder", config.encoder_binary(), "-h").await;

    println!();
    if token_ok && resolver_ok && encoder_ok {
        note_success("All checks passed.");
        Ok(())
    } else {
        anyhow::bail!("Some checks failed. Fix the errors above.")
    }
}

fn check_token(config: &EncoreConfig) -> bool {
    match config.token() {
        Some(token) if token.starts_with("Bot ") => {
            note_warn("Discord token starts with \"Bot \"; the prefix is added automatically");
            true
        }
        Some(_) => {
            note_success("Discord token is set");
            true
        }
        None => {
            note_error("Discord token is missing (set DISCORD_TOKEN)");
            false
        }
    }
}

/// A binary counts as present if it can be started at all; some encoders
/// exit non-zero on a help flag.
async fn check_binary(role: &str, binary: &str, probe_arg: &str) -> bool {
    let probe = Command::new(binary)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
        Ok(Ok(output)) => {
            let version = String::from_utf8_lossy(&output.stdout);
            let version = version.lines().next().unwrap_or("").trim();
            if version.is_empty() {
                note_success(&format!("{role} `{binary}` is installed"));
            } else {
                note_success(&format!("{role} `{binary}` is installed ({version})"));
            }
            true
        }
        Ok(Err(e)) => {
            note_error(&format!("{role} `{binary}` could not be started: {e}"));
            false
        }
        Err(_) => {
            note_warn(&format!("{role} `{binary}` did not answer within {}s", PROBE_TIMEOUT.as_secs()));
            true
        }
    }
}
