/// Prefix command detection.
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

/// Detect a prefix command at the start of a message.
///
/// The prefix and the command name are both case-sensitive, and the name
/// must match an alias exactly: with prefix `e.`, `e.helpme` is not a
/// command. Returns `None` for ordinary chat.
pub fn detect_command(text: &str, registry: &CommandRegistry) -> Option<CommandInvocation> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix(registry.prefix())?;

    let (alias_part, rest) = body
        .split_once(char::is_whitespace)
        .map(|(a, r)| (a, r.trim()))
        .unwrap_or((body, ""));
    if alias_part.is_empty() {
        return None;
    }

    let def = registry.find_by_alias(alias_part)?;
    let args = if def.accepts_args {
        rest.split_whitespace().map(str::to_string).collect()
    } else {
        Vec::new()
    };

    Some(CommandInvocation {
        key: def.key.clone(),
        raw_alias: alias_part.to_string(),
        args,
        raw_args: rest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Option<CommandInvocation> {
        detect_command(text, &CommandRegistry::new())
    }

    #[test]
    fn detects_play_with_url() {
        let inv = detect("e.play https://valid.example/video").unwrap();
        assert_eq!(inv.key, "play");
        assert_eq!(inv.args, vec!["https://valid.example/video"]);
    }

    #[test]
    fn detects_bare_play() {
        let inv = detect("e.play").unwrap();
        assert_eq!(inv.key, "play");
        assert!(inv.args.is_empty());
    }

    #[test]
    fn short_help_alias() {
        assert_eq!(detect("e.h").unwrap().key, "help");
        assert_eq!(detect("  e.help  ").unwrap().key, "help");
    }

    #[test]
    fn ignores_lookalikes_and_chat() {
        assert!(detect("e.helpme").is_none());
        assert!(detect("e.hello").is_none());
        assert!(detect("E.play https://valid.example").is_none());
        assert!(detect("e.").is_none());
        assert!(detect("just talking about e.play").is_none());
        assert!(detect("").is_none());
    }

    #[test]
    fn extra_words_after_about_are_dropped() {
        let inv = detect("e.about please").unwrap();
        assert_eq!(inv.key, "about");
        assert!(inv.args.is_empty());
        assert_eq!(inv.raw_args, "please");
    }

    #[test]
    fn custom_prefix() {
        let registry = CommandRegistry::with_prefix("!");
        assert_eq!(detect_command("!play x", &registry).unwrap().args, vec!["x"]);
        assert!(detect_command("e.play x", &registry).is_none());
    }
}
