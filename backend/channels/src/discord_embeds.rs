//! Discord rendering of command replies.

use encore_commands::{Embed, Reply};
use serenity::builder::{CreateEmbed, CreateMessage};

pub fn build_embed(embed: &Embed) -> CreateEmbed {
    let mut out = CreateEmbed::new().title(&embed.title).colour(embed.colour);
    if let Some(description) = &embed.description {
        out = out.description(description);
    }
    embed.fields.iter().fold(out, |out, field| {
        out.field(&field.name, &field.value, field.inline)
    })
}

/// Turn a reply into a message ready to post.
pub fn build_message(reply: &Reply) -> CreateMessage {
    match reply {
        Reply::Text { content } => CreateMessage::new().content(content),
        Reply::Embed(embed) => CreateMessage::new().embed(build_embed(embed)),
    }
}
