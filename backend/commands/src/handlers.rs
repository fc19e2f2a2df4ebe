/// Built-in command handlers.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use encore_core::{PlaybackOutcome, PlaybackRequest, PlaybackService, RelayError};
use tracing::debug;

use crate::dispatch::{CommandContext, CommandHandler, CommandResponse};
use crate::registry::CommandRegistry;
use crate::types::{CommandInvocation, Embed};

pub const MISSING_URL: &str = "You need to mention the URL for a video or song (tip: copy and paste the link from your browser, instead of manually typing it in)";
pub const INVALID_URL: &str =
    "That doesn't look like a link I can play. Paste the full URL, starting with https://";
pub const NOT_IN_VOICE: &str = "You need to be in a voice channel for the bot to play a song.";
pub const BUSY: &str = "I'm already playing something in this server. Try again when it finishes.";
pub const GUILD_ONLY: &str = "Playback only works inside a server.";
pub const PLAYBACK_FAILED: &str = "Sorry, I couldn't play that song. Please try again later.";
pub const SHUTTING_DOWN: &str = "The bot is shutting down, so playback was stopped.";

const ABOUT_TEXT: &str = "A small music relay: it joins your voice channel and streams the audio of any link [YouTube DL](http://ytdl-org.github.io/youtube-dl/supportedsites.html) can open, encoded with dca.";

/// The chat reply for a failed playback.
pub fn failure_message(error: &RelayError) -> &'static str {
    match error {
        RelayError::InvalidRequest(_) => INVALID_URL,
        RelayError::NotInVoiceChannel => NOT_IN_VOICE,
        RelayError::Busy(_) => BUSY,
        RelayError::Cancelled => SHUTTING_DOWN,
        RelayError::Resolve(_) | RelayError::Transcode(_) | RelayError::Voice(_) => PLAYBACK_FAILED,
    }
}

// ---------------------------------------------------------------------------
// about
// ---------------------------------------------------------------------------

pub struct AboutHandler;

#[async_trait]
impl CommandHandler for AboutHandler {
    async fn handle(&self, _ctx: &CommandContext, _inv: &CommandInvocation) -> Result<CommandResponse> {
        Ok(CommandResponse::embed(
            Embed::new("About this bot").description(ABOUT_TEXT),
        ))
    }
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub registry: CommandRegistry,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, _ctx: &CommandContext, _inv: &CommandInvocation) -> Result<CommandResponse> {
        let embed = self
            .registry
            .all()
            .iter()
            .fold(Embed::new("Commands"), |embed, cmd| {
                embed.field(self.registry.display_usage(cmd), cmd.description.as_str())
            });
        Ok(CommandResponse::embed(embed))
    }
}

// ---------------------------------------------------------------------------
// play
// ---------------------------------------------------------------------------

/// Starts a playback and waits for it. Success is silent; the audio is the
/// answer.
pub struct PlayHandler {
    pub service: Arc<dyn PlaybackService>,
}

#[async_trait]
impl CommandHandler for PlayHandler {
    async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
        let Some(url) = inv.args.first() else {
            return Ok(CommandResponse::text(MISSING_URL));
        };
        let Some(guild) = ctx.guild_id else {
            return Ok(CommandResponse::text(GUILD_ONLY));
        };
        let request = match PlaybackRequest::new(ctx.author_id, guild, url.as_str()) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Rejected play request");
                return Ok(CommandResponse::text(INVALID_URL));
            }
        };

        match self.service.play(request).await {
            PlaybackOutcome::Completed { .. } => Ok(CommandResponse::silent()),
            PlaybackOutcome::Failed { error, .. } => {
                Ok(CommandResponse::text(failure_message(&error)))
            }
        }
    }
}
