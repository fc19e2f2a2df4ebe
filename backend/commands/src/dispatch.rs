/// Command dispatch: route detected commands to handlers.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use encore_core::{ChannelId, GuildId, UserId};
use tracing::{debug, info};

use crate::detection::detect_command;
use crate::registry::CommandRegistry;
use crate::types::{CommandInvocation, Embed, Reply};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    /// `None` for direct messages.
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_is_bot: bool,
}

/// What a handler wants posted back to the channel, if anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResponse {
    pub reply: Option<Reply>,
}

impl CommandResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            reply: Some(Reply::text(content)),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            reply: Some(Reply::Embed(embed)),
        }
    }

    /// Nothing to say.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn text_content(&self) -> Option<&str> {
        self.reply.as_ref().and_then(Reply::as_text)
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher {
    registry: CommandRegistry,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    /// Handle one chat message. `Ok(None)` means the message was not a
    /// command for this bot.
    pub async fn handle_message(
        &self,
        ctx: &CommandContext,
        content: &str,
    ) -> Result<Option<CommandResponse>> {
        if ctx.author_is_bot {
            return Ok(None);
        }
        let Some(inv) = detect_command(content, &self.registry) else {
            return Ok(None);
        };
        self.dispatch(ctx, &inv).await.map(Some)
    }

    pub async fn dispatch(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse> {
        if let Some(handler) = self.handlers.get(&inv.key) {
            info!(
                command = %inv.key,
                author = %ctx.author_id,
                channel = %ctx.channel_id,
                "Dispatching command"
            );
            handler.handle(ctx, inv).await
        } else {
            debug!(command = %inv.key, "No handler registered");
            Ok(CommandResponse::silent())
        }
    }
}
