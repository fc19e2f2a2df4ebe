use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Platform ids
// ---------------------------------------------------------------------------

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// A chat-platform server ("guild").
    GuildId
);
snowflake_id!(
    /// A text or voice channel.
    ChannelId
);
snowflake_id!(
    /// A platform user.
    UserId
);

// ---------------------------------------------------------------------------
// Resolved source
// ---------------------------------------------------------------------------

/// Declared metadata of the stream variant chosen by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFormat {
    /// Provider-specific variant id (an itag for YouTube).
    pub format_id: String,
    pub codec: String,
    pub container: Option<String>,
    pub bitrate_kbps: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.format_id, self.codec)?;
        if let Some(kbps) = self.bitrate_kbps {
            write!(f, ", {kbps:.0} kbps")?;
        }
        write!(f, ")")
    }
}

/// Encoded source bytes as they arrive from the provider.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A live, exclusively-owned source stream plus the variant it was opened for.
pub struct ResolvedSource {
    pub format: SourceFormat,
    pub title: Option<String>,
    pub stream: ByteStream,
}

impl ResolvedSource {
    pub fn new(format: SourceFormat, stream: ByteStream) -> Self {
        Self {
            format,
            title: None,
            stream,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSource")
            .field("format", &self.format)
            .field("title", &self.title)
            .field("stream", &"<byte stream>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Format selection criteria
// ---------------------------------------------------------------------------

/// Criteria used to pick one audio variant out of the provider's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatPreference {
    /// Variant ids tried first, in order.
    pub preferred_format_ids: Vec<String>,
    /// Centre of the acceptable bitrate class.
    pub target_bitrate_kbps: u32,
    /// Allowed distance from the target, either side.
    pub bitrate_tolerance_kbps: u32,
    /// Codec prefixes accepted by the fallback rule (`mp4a` matches `mp4a.40.2`).
    pub allowed_codecs: Vec<String>,
}

impl Default for FormatPreference {
    fn default() -> Self {
        Self {
            preferred_format_ids: vec!["140".to_string()],
            target_bitrate_kbps: 128,
            bitrate_tolerance_kbps: 64,
            allowed_codecs: vec!["mp4a".into(), "opus".into(), "vorbis".into()],
        }
    }
}

impl FormatPreference {
    pub fn accepts_codec(&self, codec: &str) -> bool {
        let codec = codec.to_ascii_lowercase();
        self.allowed_codecs
            .iter()
            .any(|allowed| codec.starts_with(&allowed.to_ascii_lowercase()))
    }

    pub fn accepts_bitrate(&self, kbps: f64) -> bool {
        let target = f64::from(self.target_bitrate_kbps);
        let tolerance = f64::from(self.bitrate_tolerance_kbps);
        (kbps - target).abs() <= tolerance
    }
}

// ---------------------------------------------------------------------------
// Encoder settings
// ---------------------------------------------------------------------------

/// Opus application profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Application {
    /// Favour fidelity.
    #[default]
    Audio,
    /// Favour speech intelligibility.
    Voip,
    /// Lowest algorithmic delay.
    LowDelay,
}

impl Application {
    pub fn as_str(self) -> &'static str {
        match self {
            Application::Audio => "audio",
            Application::Voip => "voip",
            Application::LowDelay => "lowdelay",
        }
    }
}

/// Target frame format for the transcoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodeConfig {
    pub bitrate_kbps: u32,
    pub application: Application,
    /// Strip the DCA container header and emit bare length-prefixed frames.
    pub raw_output: bool,
    pub sample_rate: u32,
    pub channels: u8,
    /// Samples per channel in one frame (960 = 20 ms at 48 kHz).
    pub frame_size: u32,
    /// Encoder volume, 256 is unity.
    pub volume: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: 64,
            application: Application::Audio,
            raw_output: false,
            sample_rate: 48_000,
            channels: 2,
            frame_size: 960,
            volume: 256,
        }
    }
}

impl EncodeConfig {
    /// Frame sizes the voice transport accepts (20, 40 and 60 ms).
    pub const FRAME_SIZES: [u32; 3] = [960, 1920, 2880];

    /// Returns a description of the first invalid field, if any.
    pub fn check(&self) -> Option<String> {
        if !(8..=512).contains(&self.bitrate_kbps) {
            return Some(format!(
                "bitrate must be between 8 and 512 kbps, got {}",
                self.bitrate_kbps
            ));
        }
        if !(1..=2).contains(&self.channels) {
            return Some(format!("channels must be 1 or 2, got {}", self.channels));
        }
        if self.sample_rate != 48_000 {
            return Some(format!(
                "sample rate must be 48000 Hz, got {}",
                self.sample_rate
            ));
        }
        if !Self::FRAME_SIZES.contains(&self.frame_size) {
            return Some(format!(
                "frame size must be one of {:?}, got {}",
                Self::FRAME_SIZES,
                self.frame_size
            ));
        }
        None
    }

    /// Duration of one frame in milliseconds.
    pub fn frame_duration_ms(&self) -> u32 {
        self.frame_size * 1000 / self.sample_rate
    }
}
