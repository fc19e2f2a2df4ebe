//! Voice sessions and the per-guild session registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use bytes::Bytes;
use encore_core::{ChannelId, GuildId, VoiceConnector, VoiceError, VoiceLink};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An established voice connection to one channel.
///
/// Shared as `Arc<VoiceSession>`; calls are serialized through the inner
/// link so frames reach the transport in the order `send` was called.
pub struct VoiceSession {
    id: Uuid,
    guild: GuildId,
    channel: ChannelId,
    link: Mutex<Box<dyn VoiceLink>>,
    speaking: AtomicBool,
    open: AtomicBool,
}

impl VoiceSession {
    fn new(guild: GuildId, channel: ChannelId, link: Box<dyn VoiceLink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild,
            channel,
            link: Mutex::new(link),
            speaking: AtomicBool::new(false),
            open: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Toggle the speaking indicator. Turning it off on a closed session is
    /// a no-op.
    pub async fn set_speaking(&self, speaking: bool) -> Result<(), VoiceError> {
        if !self.is_open() {
            if speaking {
                return Err(VoiceError::TransportClosed("session already left".into()));
            }
            return Ok(());
        }
        let mut link = self.link.lock().await;
        link.set_speaking(speaking).await?;
        self.speaking.store(speaking, Ordering::SeqCst);
        Ok(())
    }

    /// Transmit one frame, waiting for the transport to accept it.
    pub async fn send(&self, frame: Bytes) -> Result<(), VoiceError> {
        if !self.is_open() {
            return Err(VoiceError::TransportClosed("session already left".into()));
        }
        if !self.is_speaking() {
            return Err(VoiceError::Protocol(
                "frame sent before speaking was enabled".into(),
            ));
        }
        self.link.lock().await.send(frame).await
    }

    /// Disconnect once. Returns false when the session was already closed.
    async fn close(&self) -> Result<bool, VoiceError> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.speaking.store(false, Ordering::SeqCst);
        self.link.lock().await.disconnect().await?;
        Ok(true)
    }
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSession")
            .field("id", &self.id)
            .field("guild", &self.guild)
            .field("channel", &self.channel)
            .field("speaking", &self.is_speaking())
            .field("open", &self.is_open())
            .finish()
    }
}

type Slot = Arc<Mutex<Option<Arc<VoiceSession>>>>;

/// Registry of open voice sessions, at most one per guild.
///
/// Each guild has its own slot lock, so a slow handshake in one guild does
/// not hold up joins elsewhere.
pub struct VoiceSessions {
    connector: Arc<dyn VoiceConnector>,
    slots: StdMutex<HashMap<GuildId, Slot>>,
}

impl VoiceSessions {
    pub fn new(connector: Arc<dyn VoiceConnector>) -> Self {
        Self {
            connector,
            slots: StdMutex::new(HashMap::new()),
        }
    }

    fn slot(&self, guild: GuildId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(guild).or_default())
    }

    fn all_slots(&self) -> Vec<Slot> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().cloned().collect()
    }

    /// Join `channel`, reusing an open session already connected there.
    ///
    /// An idle session in another channel of the same guild is left first;
    /// one that is speaking makes the join fail.
    pub async fn join(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Arc<VoiceSession>, VoiceError> {
        let slot = self.slot(guild);
        let mut current = slot.lock().await;

        if let Some(existing) = current.take() {
            if existing.is_open() && existing.channel() == channel {
                debug!(session_id = %existing.id(), %guild, %channel, "Reusing voice session");
                *current = Some(Arc::clone(&existing));
                return Ok(existing);
            }
            if existing.is_open() && existing.is_speaking() {
                let busy_channel = existing.channel();
                *current = Some(existing);
                return Err(VoiceError::Join(format!(
                    "already streaming in channel {busy_channel}"
                )));
            }
            if existing.is_open() {
                info!(
                    session_id = %existing.id(),
                    from = %existing.channel(),
                    to = %channel,
                    "Moving voice session"
                );
                if let Err(e) = existing.close().await {
                    warn!(error = %e, "Failed to leave previous voice channel");
                }
            }
        }

        let link = self.connector.connect(guild, channel).await?;
        let session = Arc::new(VoiceSession::new(guild, channel, link));
        info!(session_id = %session.id(), %guild, %channel, "Joined voice channel");
        *current = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The open session for `guild`, if any.
    pub async fn get(&self, guild: GuildId) -> Option<Arc<VoiceSession>> {
        let slot = self.slot(guild);
        let current = slot.lock().await;
        current.as_ref().filter(|s| s.is_open()).cloned()
    }

    /// Leave the session's channel. Calling it again is a no-op.
    pub async fn leave(&self, session: &Arc<VoiceSession>) -> Result<(), VoiceError> {
        {
            let slot = self.slot(session.guild());
            let mut current = slot.lock().await;
            if current.as_ref().is_some_and(|s| s.id() == session.id()) {
                current.take();
            }
        }
        if session.close().await? {
            info!(session_id = %session.id(), guild = %session.guild(), "Left voice channel");
        } else {
            debug!(session_id = %session.id(), "Voice session already left");
        }
        Ok(())
    }

    /// Leave every open session. Returns how many were closed.
    pub async fn leave_all(&self) -> usize {
        let mut closed = 0;
        for slot in self.all_slots() {
            let Some(session) = slot.lock().await.take() else {
                continue;
            };
            match session.close().await {
                Ok(true) => closed += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    session_id = %session.id(),
                    error = %e,
                    "Failed to leave voice channel during shutdown"
                ),
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counts {
        connects: AtomicUsize,
        disconnects: AtomicUsize,
    }

    struct CountingConnector(Arc<Counts>);

    struct CountingLink(Arc<Counts>);

    #[async_trait]
    impl VoiceConnector for CountingConnector {
        async fn connect(
            &self,
            _guild: GuildId,
            _channel: ChannelId,
        ) -> Result<Box<dyn VoiceLink>, VoiceError> {
            self.0.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingLink(Arc::clone(&self.0))))
        }
    }

    #[async_trait]
    impl VoiceLink for CountingLink {
        async fn set_speaking(&mut self, _speaking: bool) -> Result<(), VoiceError> {
            Ok(())
        }

        async fn send(&mut self, _frame: Bytes) -> Result<(), VoiceError> {
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), VoiceError> {
            self.0.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn registry() -> (VoiceSessions, Arc<Counts>) {
        let counts = Arc::new(Counts::default());
        let sessions = VoiceSessions::new(Arc::new(CountingConnector(Arc::clone(&counts))));
        (sessions, counts)
    }

    const GUILD: GuildId = GuildId::new(1);
    const V1: ChannelId = ChannelId::new(10);
    const V2: ChannelId = ChannelId::new(20);

    #[tokio::test]
    async fn second_join_returns_same_session() {
        let (sessions, counts) = registry();
        let first = sessions.join(GUILD, V1).await.unwrap();
        let second = sessions.join(GUILD, V1).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counts.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn double_leave_disconnects_once() {
        let (sessions, counts) = registry();
        let session = sessions.join(GUILD, V1).await.unwrap();
        sessions.leave(&session).await.unwrap();
        sessions.leave(&session).await.unwrap();
        assert_eq!(counts.disconnects.load(Ordering::SeqCst), 1);
        assert!(sessions.get(GUILD).await.is_none());
    }

    #[tokio::test]
    async fn send_requires_speaking_and_an_open_session() {
        let (sessions, _) = registry();
        let session = sessions.join(GUILD, V1).await.unwrap();
        let err = session.send(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, VoiceError::Protocol(_)));

        session.set_speaking(true).await.unwrap();
        session.send(Bytes::from_static(b"x")).await.unwrap();

        sessions.leave(&session).await.unwrap();
        let err = session.send(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, VoiceError::TransportClosed(_)));
        session.set_speaking(false).await.unwrap();
    }

    #[tokio::test]
    async fn idle_session_moves_to_new_channel() {
        let (sessions, counts) = registry();
        let old = sessions.join(GUILD, V1).await.unwrap();
        let new = sessions.join(GUILD, V2).await.unwrap();
        assert!(!old.is_open());
        assert_eq!(new.channel(), V2);
        assert_eq!(counts.disconnects.load(Ordering::SeqCst), 1);

        // The stale handle can still be left without touching the new one.
        sessions.leave(&old).await.unwrap();
        assert!(sessions.get(GUILD).await.is_some());
    }

    #[tokio::test]
    async fn speaking_session_blocks_other_channel() {
        let (sessions, _) = registry();
        let busy = sessions.join(GUILD, V1).await.unwrap();
        busy.set_speaking(true).await.unwrap();
        let err = sessions.join(GUILD, V2).await.unwrap_err();
        assert!(matches!(err, VoiceError::Join(_)));
        assert!(busy.is_open());
    }

    #[tokio::test]
    async fn leave_all_closes_everything() {
        let (sessions, counts) = registry();
        sessions.join(GUILD, V1).await.unwrap();
        sessions.join(GuildId::new(2), V2).await.unwrap();
        assert_eq!(sessions.leave_all().await, 2);
        assert_eq!(counts.disconnects.load(Ordering::SeqCst), 2);
        assert_eq!(sessions.leave_all().await, 0);
    }
}
