//! Drives `play` requests from command to completion.
//!
//! [`RelayController`] runs one playback as a state machine over the
//! collaborator traits in `encore-core`; [`VoiceSessions`] and
//! [`GuildLocks`] hold the only state shared between relays; and
//! [`RelayHost`] owns the in-flight relays and their graceful shutdown.

pub mod controller;
pub mod guild_lock;
pub mod host;
pub mod session;

pub use controller::RelayController;
pub use guild_lock::{GuildGuard, GuildLocks};
pub use host::RelayHost;
pub use session::{VoiceSession, VoiceSessions};
