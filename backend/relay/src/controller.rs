//! The relay state machine.
//!
//! One [`RelayController::run`] call drives a single `play` request:
//!
//! ```text
//! Idle -> ChannelResolved -> SessionJoined -> Streaming -> Completed
//!   \            \                 \              \
//!    +------------+-----------------+--------------+--> Failed
//! ```
//!
//! Every path that got past the join converges on the same teardown: the
//! frame stream is closed (if one was opened) and the session is left
//! exactly once.

use std::sync::Arc;
use std::time::Instant;

use encore_core::{
    BusyPolicy, EncodeConfig, ErrorClass, FrameStream, PlaybackOutcome, PlaybackRequest,
    RelayError, RelayState, SourceResolver, Transcoder, VoiceChannelLocator,
};
use encore_logging::{PlaybackEvent, PlaybackEventLogger};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::guild_lock::GuildLocks;
use crate::session::{VoiceSession, VoiceSessions};

/// Runs playbacks against a fixed set of collaborators.
pub struct RelayController {
    locator: Arc<dyn VoiceChannelLocator>,
    sessions: Arc<VoiceSessions>,
    resolver: Arc<dyn SourceResolver>,
    transcoder: Arc<dyn Transcoder>,
    encode: EncodeConfig,
    locks: GuildLocks,
}

impl RelayController {
    pub fn new(
        locator: Arc<dyn VoiceChannelLocator>,
        sessions: Arc<VoiceSessions>,
        resolver: Arc<dyn SourceResolver>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            locator,
            sessions,
            resolver,
            transcoder,
            encode: EncodeConfig::default(),
            locks: GuildLocks::new(BusyPolicy::default()),
        }
    }

    pub fn with_encode_config(mut self, encode: EncodeConfig) -> Self {
        self.encode = encode;
        self
    }

    pub fn with_busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.locks = GuildLocks::new(policy);
        self
    }

    pub fn sessions(&self) -> &Arc<VoiceSessions> {
        &self.sessions
    }

    pub fn locks(&self) -> &GuildLocks {
        &self.locks
    }

    /// Drive `request` to a terminal state. `shutdown` flipping to `true`
    /// abandons the playback with [`RelayError::Cancelled`].
    pub async fn run(
        &self,
        request: PlaybackRequest,
        mut shutdown: watch::Receiver<bool>,
    ) -> PlaybackOutcome {
        let relay_id = Uuid::new_v4().to_string();
        let span = info_span!("relay", relay_id = %relay_id, guild = %request.guild());

        async {
            let started = Instant::now();
            PlaybackEventLogger::log_event(
                &relay_id,
                PlaybackEvent::Started {
                    guild_id: request.guild().get(),
                    requester_id: request.requester().get(),
                    url: request.source_url().to_string(),
                },
            );

            let outcome = self.drive(&request, &mut shutdown).await;
            report(&relay_id, &request, &outcome, started);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        request: &PlaybackRequest,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PlaybackOutcome {
        let mut state = RelayState::Idle;
        let guild = request.guild();

        if *shutdown.borrow() {
            return PlaybackOutcome::failed(state, RelayError::Cancelled);
        }

        let Some(channel) = self.locator.locate(guild, request.requester()) else {
            debug!(requester = %request.requester(), "Requester is not in a voice channel");
            return PlaybackOutcome::failed(state, RelayError::NotInVoiceChannel);
        };
        enter(&mut state, RelayState::ChannelResolved);

        // Held until this function returns, i.e. after teardown.
        let _guard = tokio::select! {
            biased;
            _ = shutdown_signal(shutdown) => {
                return PlaybackOutcome::failed(state, RelayError::Cancelled);
            }
            acquired = self.locks.acquire(guild) => match acquired {
                Ok(guard) => guard,
                Err(e) => return PlaybackOutcome::failed(state, e),
            },
        };

        let session = match self.sessions.join(guild, channel).await {
            Ok(session) => session,
            Err(e) => return PlaybackOutcome::failed(state, e),
        };
        enter(&mut state, RelayState::SessionJoined);

        let mut frames: Option<Box<dyn FrameStream>> = None;
        let outcome = self
            .stream(request, &session, &mut frames, &mut state, shutdown)
            .await;

        // Teardown.
        if let Some(mut frames) = frames {
            frames.close().await;
        }
        if let Err(e) = self.sessions.leave(&session).await {
            warn!(session_id = %session.id(), error = %e, "Voice leave failed");
        }
        outcome
    }

    /// Resolve, transcode and forward frames. Whatever it opens is handed
    /// back through `frames` so the caller can release it.
    async fn stream(
        &self,
        request: &PlaybackRequest,
        session: &VoiceSession,
        frames: &mut Option<Box<dyn FrameStream>>,
        state: &mut RelayState,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PlaybackOutcome {
        let resolved = tokio::select! {
            biased;
            _ = shutdown_signal(shutdown) => Err(RelayError::Cancelled),
            resolved = self.resolver.resolve(request.source_url()) => resolved.map_err(RelayError::from),
        };
        let source = match resolved {
            Ok(source) => source,
            Err(e) => return PlaybackOutcome::failed(*state, e),
        };
        info!(
            resolver = self.resolver.name(),
            format = %source.format,
            title = source.title.as_deref().unwrap_or("-"),
            "Resolved source"
        );

        let transcoded = tokio::select! {
            biased;
            _ = shutdown_signal(shutdown) => Err(RelayError::Cancelled),
            started = self.transcoder.transcode(source, &self.encode) => started.map_err(RelayError::from),
        };
        let frames = match transcoded {
            Ok(stream) => frames.insert(stream),
            Err(e) => return PlaybackOutcome::failed(*state, e),
        };
        enter(state, RelayState::Streaming);

        if let Err(e) = session.set_speaking(true).await {
            return PlaybackOutcome::failed(*state, e);
        }
        let forwarded = forward(session, frames, shutdown).await;
        if let Err(e) = session.set_speaking(false).await {
            debug!(error = %e, "Could not clear speaking state");
        }

        match forwarded {
            Ok(frames_sent) => {
                enter(state, RelayState::Completed);
                PlaybackOutcome::Completed { frames_sent }
            }
            Err(e) => PlaybackOutcome::failed(*state, e),
        }
    }
}

/// Copy every frame to the session in order. Pacing comes from `send`.
async fn forward(
    session: &VoiceSession,
    frames: &mut Box<dyn FrameStream>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<u64, RelayError> {
    let mut sent = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown_signal(shutdown) => return Err(RelayError::Cancelled),
            next = frames.next_frame() => next?,
        };
        let Some(frame) = next else {
            return Ok(sent);
        };
        tokio::select! {
            biased;
            _ = shutdown_signal(shutdown) => return Err(RelayError::Cancelled),
            delivered = session.send(frame) => delivered?,
        }
        sent += 1;
    }
}

/// Resolves once shutdown has been requested. A dropped sender means the
/// host is gone without asking for cancellation, so this never resolves.
async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn enter(state: &mut RelayState, next: RelayState) {
    debug!(from = %state, to = %next, "Relay state change");
    *state = next;
}

fn report(relay_id: &str, request: &PlaybackRequest, outcome: &PlaybackOutcome, started: Instant) {
    let guild_id = request.guild().get();
    match outcome {
        PlaybackOutcome::Completed { frames_sent } => {
            info!(frames_sent, "Playback completed");
            PlaybackEventLogger::log_event(
                relay_id,
                PlaybackEvent::Finished {
                    guild_id,
                    frames_sent: *frames_sent,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                },
            );
        }
        PlaybackOutcome::Failed { at, error } => {
            let class = error.class();
            match class {
                ErrorClass::UserInput => debug!(at = %at, error = %error, "Playback refused"),
                ErrorClass::Shutdown => info!(at = %at, "Playback cancelled by shutdown"),
                ErrorClass::Upstream | ErrorClass::Transport => {
                    warn!(at = %at, class = class.as_str(), error = %error, "Playback failed")
                }
            }
            PlaybackEventLogger::log_event(
                relay_id,
                PlaybackEvent::Failed {
                    guild_id,
                    state: at.to_string(),
                    class: class.as_str().to_string(),
                    error_msg: error.to_string(),
                },
            );
        }
    }
}
