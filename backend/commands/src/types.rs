/// Prefix command types.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command definition
// ---------------------------------------------------------------------------

/// One entry in the command registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Unique key (e.g. "play").
    pub key: String,
    pub description: String,
    /// Names typed after the prefix. Matched exactly and case-sensitively.
    pub aliases: Vec<String>,
    /// Argument hint shown in help (e.g. "<url>").
    pub usage: Option<String>,
    pub accepts_args: bool,
}

impl CommandDef {
    /// Primary alias (first in list), or key if none.
    pub fn primary_alias(&self) -> &str {
        self.aliases.first().map(|s| s.as_str()).unwrap_or(&self.key)
    }
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A detected and parsed prefix-command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub key: String,
    pub raw_alias: String,
    /// Whitespace-separated arguments.
    pub args: Vec<String>,
    /// Full remaining text after the command name.
    pub raw_args: String,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Embed colour used by every reply card.
pub const EMBED_COLOUR: u32 = 16724804;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral rich reply. The adapter turns it into a native embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub colour: u32,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            colour: EMBED_COLOUR,
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Reply {
    Text { content: String },
    Embed(Embed),
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply::Text {
            content: content.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text { content } => Some(content),
            Reply::Embed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_builder_uses_house_colour() {
        let embed = Embed::new("Commands").field("e.play <url>", "Play a song");
        assert_eq!(embed.colour, 16724804);
        assert_eq!(embed.fields.len(), 1);
        assert!(!embed.fields[0].inline);
    }

    #[test]
    fn reply_serializes_with_kind_tag() {
        let json = serde_json::to_value(Reply::text("hi")).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["content"], "hi");
    }
}
