//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional JSON formatting, file
//! rotation (NDJSON), and environment-based level control.

use anyhow::{Context, Result};
use encore_config::LoggingConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global structured logger.
///
/// `RUST_LOG` wins over the configured level. When `dir` is set, a daily
/// rolling file of NDJSON records is written next to the console output.
pub fn init_logger(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level()));

    // Rolling file appender: writes NDJSON to `<dir>/encore.YYYY-MM-DD.log`
    let file_layer = match config.dir() {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("encore")
                .filename_suffix("log")
                .build(&dir)
                .with_context(|| format!("Failed to open log directory {}", dir.display()))?;
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    // Console layer, human-readable or JSON
    let json = config.json();
    let console_text = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });
    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stdout));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_text)
        .with(console_json)
        .with(file_layer)
        .try_init();
    Ok(())
}
