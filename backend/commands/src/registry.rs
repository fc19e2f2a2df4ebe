/// Prefix command registry.
use crate::types::CommandDef;

pub const DEFAULT_PREFIX: &str = "e.";

/// Build the built-in command set.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        CommandDef {
            key: "about".into(),
            description: "What does this bot do and other FAQs".into(),
            aliases: vec!["about".into()],
            usage: None,
            accepts_args: false,
        },
        CommandDef {
            key: "help".into(),
            description: "List the available commands".into(),
            aliases: vec!["help".into(), "h".into()],
            usage: None,
            accepts_args: false,
        },
        CommandDef {
            key: "play".into(),
            description: "Play any song that [YouTube DL](http://ytdl-org.github.io/youtube-dl/supportedsites.html) gives access to".into(),
            aliases: vec!["play".into()],
            usage: Some("<url>".into()),
            accepts_args: true,
        },
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    prefix: String,
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands: builtin_commands(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn register(&mut self, def: CommandDef) {
        self.commands.push(def);
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    /// Find a command by the name typed after the prefix.
    pub fn find_by_alias(&self, alias: &str) -> Option<&CommandDef> {
        self.commands
            .iter()
            .find(|c| c.aliases.iter().any(|a| a == alias))
    }

    /// How a command is written in chat, e.g. `e.play <url>`.
    pub fn display_usage(&self, def: &CommandDef) -> String {
        match &def.usage {
            Some(usage) => format!("{}{} {}", self.prefix, def.primary_alias(), usage),
            None => format!("{}{}", self.prefix, def.primary_alias()),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
