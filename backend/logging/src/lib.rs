//! Telemetry and structured logging for encore.
//!
//! Handles log redaction, JSON output generation, file rotation, and playback event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{PlaybackEvent, PlaybackEventEntry, PlaybackEventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
