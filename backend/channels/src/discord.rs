use std::sync::Arc;

use crate::ChannelAdapter;
use crate::discord_embeds::build_message;
use crate::voice_state::CacheVoiceLocator;
use async_trait::async_trait;
use encore_commands::{CommandContext, CommandDispatcher, CommandResponse};
use encore_core::{ChannelId, GuildId, UserId};
use serenity::gateway::ActivityData;
use serenity::model::channel::Message as DiscordMessage;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use songbird::{SerenityInit, Songbird};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Intents the bot needs: guild messages with their content, and voice
/// states so the cache knows who sits where.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::MESSAGE_CONTENT
}

struct Handler {
    dispatcher: Arc<CommandDispatcher>,
    activity: String,
}

fn command_context(msg: &DiscordMessage) -> CommandContext {
    CommandContext {
        guild_id: msg.guild_id.map(|g| GuildId::new(g.get())),
        channel_id: ChannelId::new(msg.channel_id.get()),
        author_id: UserId::new(msg.author.id.get()),
        author_is_bot: msg.author.bot,
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: DiscordMessage) {
        let context = command_context(&msg);
        let reply = match self.dispatcher.handle_message(&context, &msg.content).await {
            Ok(Some(CommandResponse { reply: Some(reply) })) => reply,
            Ok(_) => return,
            Err(e) => {
                error!(channel = %context.channel_id, error = %e, "Command failed");
                return;
            }
        };

        debug!(channel = %context.channel_id, "Replying to command");
        if let Err(e) = msg.channel_id.send_message(&ctx.http, build_message(&reply)).await {
            warn!(channel = %context.channel_id, error = %e, "Error sending reply");
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Bot is connected");
        ctx.set_activity(Some(ActivityData::playing(&self.activity)));
    }
}

pub struct DiscordAdapter {
    token: String,
    activity: String,
    dispatcher: Arc<CommandDispatcher>,
    songbird: Arc<Songbird>,
    locator: Arc<CacheVoiceLocator>,
}

impl DiscordAdapter {
    pub fn new(
        token: String,
        activity: String,
        dispatcher: Arc<CommandDispatcher>,
        songbird: Arc<Songbird>,
        locator: Arc<CacheVoiceLocator>,
    ) -> Self {
        Self {
            token,
            activity,
            dispatcher,
            songbird,
            locator,
        }
    }
}

#[async_trait]
impl ChannelAdapter for DiscordAdapter {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!("Starting Discord adapter");

        let handler = Handler {
            dispatcher: Arc::clone(&self.dispatcher),
            activity: self.activity.clone(),
        };
        let mut client = Client::builder(&self.token, intents())
            .event_handler(handler)
            .register_songbird_with(Arc::clone(&self.songbird))
            .await?;

        if !self.locator.attach(Arc::clone(&client.cache)) {
            warn!("Voice locator already had a cache attached");
        }
        let shard_manager = Arc::clone(&client.shard_manager);

        tokio::select! {
            started = client.start() => {
                if let Err(why) = started {
                    error!(error = %why, "Client error");
                    anyhow::bail!("Discord client error: {why}");
                }
                info!("Discord client stopped");
            }
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                info!("Closing Discord connection");
                shard_manager.shutdown_all().await;
            }
        }

        Ok(())
    }
}
