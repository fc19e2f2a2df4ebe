pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod types;

use std::sync::Arc;

use encore_core::PlaybackService;

pub use detection::detect_command;
pub use dispatch::{CommandContext, CommandDispatcher, CommandHandler, CommandResponse};
pub use handlers::{failure_message, AboutHandler, HelpHandler, PlayHandler};
pub use registry::{builtin_commands, CommandRegistry, DEFAULT_PREFIX};
pub use types::{CommandDef, CommandInvocation, Embed, EmbedField, Reply, EMBED_COLOUR};

/// Build a dispatcher wired with the built-in handlers, answering to `prefix`
/// and sending `play` to `service`.
pub fn build_dispatcher(prefix: &str, service: Arc<dyn PlaybackService>) -> CommandDispatcher {
    let registry = CommandRegistry::with_prefix(prefix);
    let mut dispatcher = CommandDispatcher::new(registry.clone());

    dispatcher.register("about", Arc::new(AboutHandler));
    dispatcher.register("help", Arc::new(HelpHandler { registry }));
    dispatcher.register("play", Arc::new(PlayHandler { service }));

    dispatcher
}
