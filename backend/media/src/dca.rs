//! DCA framing: an optional `DCA1` metadata header followed by opus packets,
//! each prefixed with its length as a little-endian `i16`.

use std::io::{self, ErrorKind};

use bytes::{BufMut, Bytes, BytesMut};
use encore_core::TranscodeError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

pub const MAGIC: &[u8; 4] = b"DCA1";

/// Largest frame accepted; six 20 ms opus frames at the 1275-byte cap fit.
pub const MAX_FRAME_BYTES: usize = 8192;

/// Upper bound on the JSON metadata block.
pub const MAX_METADATA_BYTES: usize = 64 * 1024;

/// Metadata block of a DCA1 stream. Only the fields the relay cares about
/// are typed; the rest is kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaMetadata {
    pub dca: DcaInfo,
    pub opus: OpusInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaInfo {
    pub version: u64,
    pub tool: DcaTool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaTool {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpusInfo {
    pub mode: String,
    pub sample_rate: u32,
    pub frame_size: u64,
    #[serde(default)]
    pub abr: Option<u64>,
    pub vbr: bool,
    pub channels: u8,
}

impl DcaMetadata {
    /// Metadata describing a passthrough opus stream.
    pub fn passthrough(sample_rate: u32, frame_size: u64, channels: u8) -> Self {
        Self {
            dca: DcaInfo {
                version: 1,
                tool: DcaTool {
                    name: env!("CARGO_PKG_NAME").to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    url: None,
                    author: None,
                },
            },
            opus: OpusInfo {
                mode: "music".to_string(),
                sample_rate,
                frame_size,
                abr: None,
                vbr: true,
                channels,
            },
            info: None,
            origin: None,
            extra: None,
        }
    }

    /// Serialize as a complete `DCA1` header.
    pub fn to_header(&self) -> Bytes {
        // Serializing plain structs of strings and numbers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut out = BytesMut::with_capacity(MAGIC.len() + 4 + json.len());
        out.put_slice(MAGIC);
        out.put_i32_le(json.len() as i32);
        out.put_slice(&json);
        out.freeze()
    }
}

/// Prefix one opus packet with its `i16` length.
pub fn encode_frame(frame: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(frame.len() + 2);
    out.put_i16_le(frame.len() as i16);
    out.put_slice(frame);
    out.freeze()
}

/// Pulls length-prefixed frames out of an encoder's output.
pub struct FrameReader<R> {
    inner: R,
    expect_header: bool,
    metadata: Option<DcaMetadata>,
    frames_read: u64,
    finished: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// `expect_header` is false for raw output (no `DCA1` block).
    pub fn new(inner: R, expect_header: bool) -> Self {
        Self {
            inner,
            expect_header,
            metadata: None,
            frames_read: 0,
            finished: false,
        }
    }

    pub fn metadata(&self) -> Option<&DcaMetadata> {
        self.metadata.as_ref()
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Next frame, `Ok(None)` at end of input. Truncated input ends the
    /// stream; a corrupt length poisons it.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, TranscodeError> {
        if self.finished {
            return Ok(None);
        }
        if self.expect_header {
            self.expect_header = false;
            if !self.read_header().await? {
                self.finished = true;
                return Ok(None);
            }
        }

        let len = match self.inner.read_i16_le().await {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(self.finish()),
            Err(e) => return Err(self.fail(format!("reading frame length: {e}"))),
        };
        if len <= 0 || len as usize > MAX_FRAME_BYTES {
            return Err(self.fail(format!(
                "frame length {len} outside 1..={MAX_FRAME_BYTES}"
            )));
        }

        let mut frame = vec![0u8; len as usize];
        match self.inner.read_exact(&mut frame).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!(len, "Input ended inside a frame; dropping the partial frame");
                return Ok(self.finish());
            }
            Err(e) => return Err(self.fail(format!("reading frame body: {e}"))),
        }

        self.frames_read += 1;
        Ok(Some(Bytes::from(frame)))
    }

    /// Returns false when the input is empty.
    async fn read_header(&mut self) -> Result<bool, TranscodeError> {
        let mut magic = [0u8; 4];
        match read_full(&mut self.inner, &mut magic).await {
            Ok(0) => return Ok(false),
            Ok(4) => {}
            Ok(n) => return Err(self.fail(format!("stream ended after {n} header bytes"))),
            Err(e) => return Err(self.fail(format!("reading header: {e}"))),
        }
        if &magic != MAGIC {
            return Err(self.fail(format!("bad magic {magic:?}, expected DCA1")));
        }

        let len = self
            .inner
            .read_i32_le()
            .await
            .map_err(|e| self.fail(format!("reading metadata length: {e}")))?;
        if len <= 0 || len as usize > MAX_METADATA_BYTES {
            return Err(self.fail(format!(
                "metadata length {len} outside 1..={MAX_METADATA_BYTES}"
            )));
        }

        let mut raw = vec![0u8; len as usize];
        self.inner
            .read_exact(&mut raw)
            .await
            .map_err(|e| self.fail(format!("reading metadata: {e}")))?;
        let metadata: DcaMetadata = serde_json::from_slice(&raw)
            .map_err(|e| self.fail(format!("parsing metadata: {e}")))?;

        debug!(
            tool = %metadata.dca.tool.name,
            sample_rate = metadata.opus.sample_rate,
            frame_size = metadata.opus.frame_size,
            channels = metadata.opus.channels,
            "Read DCA header"
        );
        self.metadata = Some(metadata);
        Ok(true)
    }

    fn finish(&mut self) -> Option<Bytes> {
        self.finished = true;
        None
    }

    fn fail(&mut self, message: String) -> TranscodeError {
        self.finished = true;
        TranscodeError::FrameRead(message)
    }
}

/// Like `read_exact`, but reports how much was read before EOF.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
