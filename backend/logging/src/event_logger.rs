//! Playback Event Logger
//!
//! Structured events (started, finished, failed) written through `tracing`
//! on the `playback_events` target, so they land in the NDJSON log file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Started {
        guild_id: u64,
        requester_id: u64,
        url: String,
    },
    Finished {
        guild_id: u64,
        frames_sent: u64,
        elapsed_ms: u64,
    },
    Failed {
        guild_id: u64,
        state: String,
        class: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct PlaybackEventEntry {
    pub relay_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: PlaybackEvent,
}

pub struct PlaybackEventLogger;

impl PlaybackEventLogger {
    /// Logs a playback event, redacting URLs and error text first.
    pub fn log_event(relay_id: &str, event: PlaybackEvent) -> PlaybackEventEntry {
        let entry = PlaybackEventEntry {
            relay_id: relay_id.into(),
            timestamp: Utc::now(),
            event: Self::redacted(event),
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "playback_events", relay_id = %entry.relay_id, event = %json, "Playback event");
        entry
    }

    fn redacted(mut event: PlaybackEvent) -> PlaybackEvent {
        match &mut event {
            PlaybackEvent::Started { url, .. } => {
                *url = redact_sensitive_data(url);
            }
            PlaybackEvent::Failed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            PlaybackEvent::Finished { .. } => {}
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_before_logging() {
        let entry = PlaybackEventLogger::log_event(
            "relay-1",
            PlaybackEvent::Started {
                guild_id: 1,
                requester_id: 2,
                url: "https://media.example/a?token=secret".into(),
            },
        );
        match entry.event {
            PlaybackEvent::Started { url, .. } => {
                assert_eq!(url, "https://media.example/a?token=[REDACTED]")
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = PlaybackEvent::Failed {
            guild_id: 7,
            state: "streaming".into(),
            class: "upstream".into(),
            error_msg: "frame read failed".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["state"], "streaming");
    }
}
