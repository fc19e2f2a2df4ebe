//! Log Redaction Layer
//!
//! Scrubs bot tokens, authorization credentials, and URL secrets from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static DISCORD_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z\d_-]{24,}\.[A-Za-z\d_-]{6}\.[A-Za-z\d_-]{27,}").unwrap()
});
static AUTH_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(Bot|Bearer)\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
static URL_USERINFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https?://)[^/\s:@]+:[^/\s@]+@").unwrap());
static URL_SECRET_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:token|key|sig|signature|auth)=)[^&\s#]+").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = input.to_string();

    // Redact bot tokens
    redacted = DISCORD_TOKEN_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();

    // Redact authorization credentials
    redacted = AUTH_HEADER_RE.replace_all(&redacted, "$1 [REDACTED_TOKEN]").to_string();

    // Redact credentials embedded in URLs
    redacted = URL_USERINFO_RE.replace_all(&redacted, "${1}[REDACTED]@").to_string();
    redacted = URL_SECRET_PARAM_RE.replace_all(&redacted, "${1}[REDACTED]").to_string();

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "Connecting with Bot MTA5ODc2NTQzMjEwOTg3NjU0MzI.GhIjKl.abcdefghijklmnopqrstuvwxyz0123";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("GhIjKl"));
        assert!(clean.starts_with("Connecting with Bot"));
    }

    #[test]
    fn redacts_bare_token() {
        let raw = "token=MTA5ODc2NTQzMjEwOTg3NjU0MzI.GhIjKl.abcdefghijklmnopqrstuvwxyz0123 rejected";
        assert_eq!(redact_sensitive_data(raw), "token=[REDACTED_TOKEN] rejected");
    }

    #[test]
    fn redacts_url_secrets() {
        let raw = "https://user:pw@media.example/a.m4a?id=1&sig=abcdef&x=2";
        assert_eq!(
            redact_sensitive_data(raw),
            "https://[REDACTED]@media.example/a.m4a?id=1&sig=[REDACTED]&x=2"
        );
    }

    #[test]
    fn leaves_plain_urls_alone() {
        let raw = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(redact_sensitive_data(raw), raw);
    }
}
