//! Hand-written collaborators for driving the relay without a platform.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use encore_core::{
    BusyPolicy, ChannelId, EncodeConfig, FrameStream, GuildId, ResolveError, ResolvedSource,
    SourceFormat, SourceResolver, TranscodeError, Transcoder, UserId, VoiceChannelLocator,
    VoiceConnector, VoiceError, VoiceLink,
};
use encore_relay::{RelayController, RelayHost, VoiceSessions};

pub const GUILD: GuildId = GuildId::new(100);
pub const V1: ChannelId = ChannelId::new(1);
pub const LISTENER: UserId = UserId::new(42);
pub const LURKER: UserId = UserId::new(43);
pub const URL: &str = "https://valid.example/video";

/// Everything the collaborators did, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(GuildId, ChannelId),
    Speaking(bool),
    Send(Bytes),
    Disconnect,
    Resolve(String),
    Transcode,
    Close,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Call>>>);

impl Recorder {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn joins(&self) -> usize {
        self.count(|c| matches!(c, Call::Connect(..)))
    }

    pub fn leaves(&self) -> usize {
        self.count(|c| matches!(c, Call::Disconnect))
    }

    pub fn closes(&self) -> usize {
        self.count(|c| matches!(c, Call::Close))
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockLocator {
    members: HashMap<(GuildId, UserId), ChannelId>,
}

impl MockLocator {
    pub fn with(mut self, guild: GuildId, user: UserId, channel: ChannelId) -> Self {
        self.members.insert((guild, user), channel);
        self
    }
}

impl VoiceChannelLocator for MockLocator {
    fn locate(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        self.members.get(&(guild, user)).copied()
    }
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

pub struct MockConnector {
    pub recorder: Recorder,
    pub fail_join: bool,
    /// Sends after which the transport reports itself closed.
    pub close_after_sends: Option<usize>,
    pub send_delay: Option<Duration>,
}

#[async_trait]
impl VoiceConnector for MockConnector {
    async fn connect(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Box<dyn VoiceLink>, VoiceError> {
        if self.fail_join {
            return Err(VoiceError::Join("handshake timed out".into()));
        }
        self.recorder.push(Call::Connect(guild, channel));
        Ok(Box::new(MockLink {
            recorder: self.recorder.clone(),
            sends: 0,
            close_after_sends: self.close_after_sends,
            send_delay: self.send_delay,
        }))
    }
}

pub struct MockLink {
    recorder: Recorder,
    sends: usize,
    close_after_sends: Option<usize>,
    send_delay: Option<Duration>,
}

#[async_trait]
impl VoiceLink for MockLink {
    async fn set_speaking(&mut self, speaking: bool) -> Result<(), VoiceError> {
        self.recorder.push(Call::Speaking(speaking));
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), VoiceError> {
        if self.close_after_sends.is_some_and(|limit| self.sends >= limit) {
            return Err(VoiceError::TransportClosed("peer went away".into()));
        }
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        self.sends += 1;
        self.recorder.push(Call::Send(frame));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), VoiceError> {
        self.recorder.push(Call::Disconnect);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Ok,
    NotFound,
    NoMatchingFormat,
    Network,
    /// Never answers.
    Hang,
}

pub struct MockResolver {
    pub recorder: Recorder,
    pub resolution: Resolution,
}

pub fn source_format() -> SourceFormat {
    SourceFormat {
        format_id: "140".into(),
        codec: "mp4a.40.2".into(),
        container: Some("m4a".into()),
        bitrate_kbps: Some(129.5),
        sample_rate: Some(44_100),
        channels: Some(2),
    }
}

#[async_trait]
impl SourceResolver for MockResolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedSource, ResolveError> {
        self.recorder.push(Call::Resolve(url.to_string()));
        match self.resolution {
            Resolution::Ok => Ok(ResolvedSource::new(
                source_format(),
                Box::pin(futures::stream::empty::<std::io::Result<Bytes>>()),
            )
            .with_title("Test Song")),
            Resolution::NotFound => Err(ResolveError::SourceNotFound("Video unavailable".into())),
            Resolution::NoMatchingFormat => {
                Err(ResolveError::NoMatchingFormat("only video variants".into()))
            }
            Resolution::Network => Err(ResolveError::Network("connection reset".into())),
            Resolution::Hang => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Transcoder
// ---------------------------------------------------------------------------

pub struct MockTranscoder {
    pub recorder: Recorder,
    pub frames: Vec<Bytes>,
    pub fail_startup: bool,
    /// Index of the frame that comes out corrupt.
    pub corrupt_at: Option<usize>,
    pub frame_delay: Option<Duration>,
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(
        &self,
        _source: ResolvedSource,
        _config: &EncodeConfig,
    ) -> Result<Box<dyn FrameStream>, TranscodeError> {
        self.recorder.push(Call::Transcode);
        if self.fail_startup {
            return Err(TranscodeError::Startup("encoder exited with status 1".into()));
        }
        Ok(Box::new(MockFrames {
            recorder: self.recorder.clone(),
            frames: self.frames.iter().cloned().collect(),
            produced: 0,
            corrupt_at: self.corrupt_at,
            frame_delay: self.frame_delay,
            closed: false,
        }))
    }
}

pub struct MockFrames {
    recorder: Recorder,
    frames: VecDeque<Bytes>,
    produced: usize,
    corrupt_at: Option<usize>,
    frame_delay: Option<Duration>,
    closed: bool,
}

#[async_trait]
impl FrameStream for MockFrames {
    async fn next_frame(&mut self) -> Result<Option<Bytes>, TranscodeError> {
        if let Some(delay) = self.frame_delay {
            tokio::time::sleep(delay).await;
        }
        if self.corrupt_at == Some(self.produced) {
            return Err(TranscodeError::FrameRead("frame length -3".into()));
        }
        self.produced += 1;
        Ok(self.frames.pop_front())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.recorder.push(Call::Close);
        }
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub fn frames(n: usize) -> Vec<Bytes> {
    (0..n).map(|i| Bytes::from(format!("opus-{i}"))).collect()
}

/// Builder for a fully mocked relay host.
pub struct Fixture {
    pub recorder: Recorder,
    pub locator: MockLocator,
    pub resolution: Resolution,
    pub frames: Vec<Bytes>,
    pub fail_join: bool,
    pub fail_startup: bool,
    pub corrupt_at: Option<usize>,
    pub close_after_sends: Option<usize>,
    pub frame_delay: Option<Duration>,
    pub send_delay: Option<Duration>,
    pub policy: BusyPolicy,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            recorder: Recorder::default(),
            locator: MockLocator::default().with(GUILD, LISTENER, V1),
            resolution: Resolution::Ok,
            frames: frames(5),
            fail_join: false,
            fail_startup: false,
            corrupt_at: None,
            close_after_sends: None,
            frame_delay: None,
            send_delay: None,
            policy: BusyPolicy::Reject,
        }
    }
}

impl Fixture {
    pub fn build(self) -> (Arc<RelayHost>, Recorder) {
        let recorder = self.recorder.clone();
        let connector = MockConnector {
            recorder: recorder.clone(),
            fail_join: self.fail_join,
            close_after_sends: self.close_after_sends,
            send_delay: self.send_delay,
        };
        let resolver = MockResolver {
            recorder: recorder.clone(),
            resolution: self.resolution,
        };
        let transcoder = MockTranscoder {
            recorder: recorder.clone(),
            frames: self.frames,
            fail_startup: self.fail_startup,
            corrupt_at: self.corrupt_at,
            frame_delay: self.frame_delay,
        };
        let sessions = Arc::new(VoiceSessions::new(Arc::new(connector)));
        let controller = RelayController::new(
            Arc::new(self.locator),
            sessions,
            Arc::new(resolver),
            Arc::new(transcoder),
        )
        .with_busy_policy(self.policy);
        (Arc::new(RelayHost::new(controller)), recorder)
    }
}
