//! Discord voice over songbird.
//!
//! Frames from the relay are pushed into a bounded flume channel. A blocking
//! reader on the other end re-frames them as a `DCA1` stream, which songbird
//! passes straight through to the voice UDP socket without re-encoding. The
//! channel bound is what paces the relay: `send` waits while the driver is
//! a full buffer ahead.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use encore_core::{ChannelId, GuildId, VoiceConnector, VoiceError, VoiceLink};
use encore_media::{DcaMetadata, encode_frame};
use serenity::model::id::{ChannelId as DiscordChannelId, GuildId as DiscordGuildId};
use songbird::input::core::io::{MediaSource, ReadOnlySource};
use songbird::input::core::probe::Hint;
use songbird::input::{AudioStream, Input, LiveInput};
use songbird::tracks::TrackHandle;
use songbird::{Call, Songbird};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Discord voice runs 48 kHz stereo in 20 ms packets.
const SAMPLE_RATE: u32 = 48_000;
const FRAME_SIZE: u64 = 960;
const CHANNELS: u8 = 2;
const FRAME_DURATION: Duration = Duration::from_millis(20);

pub struct SongbirdConnector {
    manager: Arc<Songbird>,
    join_timeout: Duration,
    frame_buffer: usize,
}

impl SongbirdConnector {
    pub fn new(manager: Arc<Songbird>, join_timeout: Duration, frame_buffer: usize) -> Self {
        Self {
            manager,
            join_timeout,
            frame_buffer: frame_buffer.max(1),
        }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn connect(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Box<dyn VoiceLink>, VoiceError> {
        let discord_guild = DiscordGuildId::new(guild.get());
        let discord_channel = DiscordChannelId::new(channel.get());

        let joined = tokio::time::timeout(
            self.join_timeout,
            self.manager.join(discord_guild, discord_channel),
        )
        .await;
        let call = match joined {
            Ok(Ok(call)) => call,
            Ok(Err(e)) => {
                self.discard(discord_guild).await;
                return Err(VoiceError::Join(e.to_string()));
            }
            Err(_) => {
                self.discard(discord_guild).await;
                return Err(VoiceError::Join(format!(
                    "no voice handshake within {}s",
                    self.join_timeout.as_secs()
                )));
            }
        };

        info!(%guild, %channel, "Voice handshake complete");
        Ok(Box::new(SongbirdLink {
            manager: Arc::clone(&self.manager),
            guild: discord_guild,
            call,
            frame_buffer: self.frame_buffer,
            feed: None,
            track: None,
        }))
    }
}

impl SongbirdConnector {
    /// Drop a half-open call so no partial connection outlives a failed join.
    async fn discard(&self, guild: DiscordGuildId) {
        if let Err(e) = self.manager.remove(guild).await {
            debug!(guild = %guild, error = %e, "Nothing to discard after failed join");
        }
    }
}

/// One joined voice channel.
pub struct SongbirdLink {
    manager: Arc<Songbird>,
    guild: DiscordGuildId,
    call: Arc<Mutex<Call>>,
    frame_buffer: usize,
    feed: Option<flume::Sender<Bytes>>,
    track: Option<TrackHandle>,
}

impl SongbirdLink {
    /// Give the driver time to play out what is already queued.
    async fn drain(feed: &flume::Sender<Bytes>, budget: Duration) {
        let deadline = tokio::time::Instant::now() + budget;
        while !feed.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(FRAME_DURATION).await;
        }
    }
}

#[async_trait]
impl VoiceLink for SongbirdLink {
    async fn set_speaking(&mut self, speaking: bool) -> Result<(), VoiceError> {
        if speaking {
            if self.feed.is_some() {
                return Ok(());
            }
            let (tx, rx) = flume::bounded(self.frame_buffer);
            let track = self.call.lock().await.play_only_input(dca_input(rx));
            self.feed = Some(tx);
            self.track = Some(track);
            return Ok(());
        }

        if let Some(feed) = self.feed.take() {
            Self::drain(&feed, FRAME_DURATION * self.frame_buffer as u32).await;
            // Dropping the sender ends the track once the reader runs dry.
        }
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), VoiceError> {
        let feed = self
            .feed
            .as_ref()
            .ok_or_else(|| VoiceError::Protocol("no active voice track".into()))?;
        feed.send_async(frame)
            .await
            .map_err(|_| VoiceError::TransportClosed("voice track ended".into()))
    }

    async fn disconnect(&mut self) -> Result<(), VoiceError> {
        self.feed.take();
        if let Some(track) = self.track.take() {
            if let Err(e) = track.stop() {
                debug!(error = %e, "Voice track already finished");
            }
        }
        self.manager.remove(self.guild).await.map_err(|e| {
            warn!(guild = %self.guild, error = %e, "Voice disconnect failed");
            VoiceError::TransportClosed(e.to_string())
        })
    }
}

/// Songbird input reading a `DCA1` stream off the frame feed.
fn dca_input(frames: flume::Receiver<Bytes>) -> Input {
    let reader = FeedReader::new(frames);
    let mut hint = Hint::new();
    hint.with_extension("dca");
    let source: Box<dyn MediaSource> = Box::new(ReadOnlySource::new(reader));
    Input::Live(
        LiveInput::Raw(AudioStream {
            input: source,
            hint: Some(hint),
        }),
        None,
    )
}

/// Blocking `Read` over the frame feed: a DCA header, then each frame with
/// its length prefix. End of file once every sender is gone.
pub struct FeedReader {
    frames: flume::Receiver<Bytes>,
    pending: Bytes,
}

impl FeedReader {
    pub fn new(frames: flume::Receiver<Bytes>) -> Self {
        Self {
            frames,
            pending: DcaMetadata::passthrough(SAMPLE_RATE, FRAME_SIZE, CHANNELS).to_header(),
        }
    }
}

impl Read for FeedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            match self.frames.recv() {
                Ok(frame) => self.pending = encode_frame(&frame),
                Err(flume::RecvError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(reader: &mut FeedReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn emits_header_then_length_prefixed_frames() {
        let (tx, rx) = flume::bounded(4);
        tx.send(Bytes::from_static(b"abc")).unwrap();
        tx.send(Bytes::from_static(b"hi")).unwrap();
        drop(tx);

        let out = read_all(&mut FeedReader::new(rx));

        assert_eq!(&out[..4], b"DCA1");
        let meta_len = i32::from_le_bytes(out[4..8].try_into().unwrap()) as usize;
        let meta: serde_json::Value = serde_json::from_slice(&out[8..8 + meta_len]).unwrap();
        assert_eq!(meta["opus"]["sample_rate"], 48_000);
        assert_eq!(meta["opus"]["channels"], 2);
        assert_eq!(&out[8 + meta_len..], b"\x03\x00abc\x02\x00hi");
    }

    #[test]
    fn small_reads_do_not_lose_bytes() {
        let (tx, rx) = flume::bounded(2);
        tx.send(Bytes::from_static(b"xyz")).unwrap();
        drop(tx);

        let mut reader = FeedReader::new(rx);
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while reader.read(&mut byte).unwrap() == 1 {
            out.push(byte[0]);
        }
        assert!(out.ends_with(b"\x03\x00xyz"));
    }

    #[test]
    fn closed_feed_is_end_of_file() {
        let (tx, rx) = flume::bounded::<Bytes>(1);
        drop(tx);
        let out = read_all(&mut FeedReader::new(rx));
        assert_eq!(&out[..4], b"DCA1");
    }
}
