//! Voice channel lookup against serenity's cache.

use std::sync::{Arc, OnceLock};

use encore_core::{ChannelId, GuildId, UserId, VoiceChannelLocator};
use serenity::cache::Cache;
use serenity::model::id::{GuildId as DiscordGuildId, UserId as DiscordUserId};

/// Reads voice states from the gateway cache. Until a cache is attached
/// every lookup misses.
#[derive(Default)]
pub struct CacheVoiceLocator {
    cache: OnceLock<Arc<Cache>>,
}

impl CacheVoiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a cache was already attached.
    pub fn attach(&self, cache: Arc<Cache>) -> bool {
        self.cache.set(cache).is_ok()
    }

    pub fn is_attached(&self) -> bool {
        self.cache.get().is_some()
    }
}

impl VoiceChannelLocator for CacheVoiceLocator {
    fn locate(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        let cache = self.cache.get()?;
        let guild = cache.guild(DiscordGuildId::new(guild.get()))?;
        let channel = guild
            .voice_states
            .get(&DiscordUserId::new(user.get()))
            .and_then(|state| state.channel_id)
            .map(|channel| ChannelId::new(channel.get()));
        channel
    }
}
