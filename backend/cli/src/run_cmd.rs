//! `encore run`: wire the relay to Discord and serve until a signal.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use songbird::Songbird;
use tokio::sync::watch;
use tracing::{error, info, warn};

use encore_channels::{CacheVoiceLocator, ChannelAdapter, DiscordAdapter, SongbirdConnector};
use encore_commands::build_dispatcher;
use encore_config::{ensure_valid, load_resolved};
use encore_logging::init_logger;
use encore_media::{DcaTranscoder, YtDlpResolver};
use encore_relay::{RelayController, RelayHost, VoiceSessions};

pub async fn run(path: &Path) -> Result<()> {
    let config = load_resolved(path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    init_logger(&config.logging())?;
    ensure_valid(&config)?;

    let token = config
        .token()
        .context("No Discord token configured (set DISCORD_TOKEN)")?
        .to_string();

    info!(
        config = %path.display(),
        prefix = config.prefix(),
        busy_policy = ?config.busy_policy(),
        "Starting encore"
    );

    let songbird = Songbird::serenity();
    let locator = Arc::new(CacheVoiceLocator::new());

    let connector = SongbirdConnector::new(
        Arc::clone(&songbird),
        config.join_timeout(),
        config.frame_buffer(),
    );
    let resolver = YtDlpResolver::new(
        config.resolver_binary(),
        config.format_preference(),
        config.read_timeout(),
    )
    .context("Failed to set up the media resolver")?
    .with_timeout(config.resolve_timeout());
    let transcoder = DcaTranscoder::new(config.encoder_binary());

    let controller = RelayController::new(
        locator.clone(),
        Arc::new(VoiceSessions::new(Arc::new(connector))),
        Arc::new(resolver),
        Arc::new(transcoder),
    )
    .with_encode_config(config.encode_settings())
    .with_busy_policy(config.busy_policy());
    let host = Arc::new(RelayHost::new(controller));

    let dispatcher = Arc::new(build_dispatcher(config.prefix(), host.clone()));
    let adapter = DiscordAdapter::new(
        token,
        config.activity().to_string(),
        dispatcher,
        songbird,
        locator,
    );
    info!(adapter = adapter.name(), "Registered channel adapter");

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut gateway = tokio::spawn(async move { adapter.start(stop_rx).await });

    let gateway_ended = tokio::select! {
        _ = shutdown_signal() => None,
        ended = &mut gateway => Some(ended),
    };

    info!("Shutting down bot gracefully...");
    host.shutdown(config.shutdown_grace()).await;

    let ended = match gateway_ended {
        Some(ended) => ended,
        None => {
            stop_tx.send_replace(true);
            gateway.await
        }
    };
    match ended {
        Ok(result) => result?,
        Err(e) => error!(error = %e, "Gateway task panicked"),
    }

    info!("encore stopped");
    Ok(())
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
