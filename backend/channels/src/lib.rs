use async_trait::async_trait;
use tokio::sync::watch;

pub mod discord;
pub mod discord_embeds;
pub mod discord_voice;
pub mod voice_state;

pub use discord::{DiscordAdapter, intents};
pub use discord_voice::{FeedReader, SongbirdConnector, SongbirdLink};
pub use voice_state::CacheVoiceLocator;

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Connect and serve until the platform connection ends or `shutdown`
    /// flips to true.
    async fn start(&self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()>;
}
