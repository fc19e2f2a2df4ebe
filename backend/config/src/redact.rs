//! Config redaction: produce safe-to-share config snapshots by masking sensitive fields.

use regex::Regex;
use serde_json::Value;
use once_cell::sync::Lazy;

/// Keys whose values are secrets.
static SENSITIVE_KEYS: &[&str] = &[
    "token",
    "botToken",
    "bot_token",
    "apiKey",
    "api_key",
    "secret",
    "password",
    "cookies",
];

/// Discord bot tokens embedded in free-form values.
static DISCORD_TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z\d_-]{24,}\.[A-Za-z\d_-]{6}\.[A-Za-z\d_-]{27,}").unwrap()
});

/// Redact a config JSON value, replacing all sensitive fields with `"***"`.
///
/// The resulting value is safe to log or print with `encore config`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) && !s.is_empty() {
        // Preserve length hint: show first 4 chars + ***
        let hint = if s.chars().count() > 4 {
            format!("{}***", s.chars().take(4).collect::<String>())
        } else {
            "***".to_string()
        };
        return Value::String(hint);
    }

    // Tokens pasted into other fields, e.g. a resolver URL
    Value::String(DISCORD_TOKEN_PATTERN.replace_all(s, "***").into_owned())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => {
            Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect())
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

/// Collect all field paths that were redacted (for diagnostics).
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths_recursive(value, "", &mut paths);
    paths
}

fn collect_paths_recursive(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => {
            let key = path.rsplit('.').next().unwrap_or("");
            if is_sensitive_key(key) || DISCORD_TOKEN_PATTERN.is_match(s) {
                out.push(path.to_string());
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                collect_paths_recursive(v, &format!("{path}[{i}]"), out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                collect_paths_recursive(v, &child_path, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOKEN: &str = "MTA5ODc2NTQzMjEwOTg3NjU0MzI.GhIjKl.abcdefghijklmnopqrstuvwxyz0123";

    #[test]
    fn redacts_bot_token() {
        let v = json!({ "discord": { "token": TOKEN, "prefix": "e." } });
        let redacted = redact(&v);
        let token = redacted["discord"]["token"].as_str().unwrap();
        assert_eq!(token, "MTA5***");
        assert_eq!(redacted["discord"]["prefix"], "e.");
    }

    #[test]
    fn redacts_embedded_tokens() {
        let v = json!({ "media": { "resolverBinary": format!("yt-dlp --token {TOKEN}") } });
        let redacted = redact(&v);
        assert_eq!(redacted["media"]["resolverBinary"], "yt-dlp --token ***");
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({ "logging": { "level": "debug" }, "shutdownGraceSecs": 5 });
        let redacted = redact(&v);
        assert_eq!(redacted["logging"]["level"], "debug");
        assert_eq!(redacted["shutdownGraceSecs"], 5);
    }

    #[test]
    fn lists_redacted_paths() {
        let v = json!({ "discord": { "token": "abc" }, "voice": { "frameBuffer": 50 } });
        assert_eq!(collect_redacted_paths(&v), vec!["discord.token".to_string()]);
    }
}
