//! Provider metadata and the variant selection rule.

use std::cmp::Ordering;
use std::collections::HashMap;

use encore_core::{FormatPreference, SourceFormat};
use serde::Deserialize;

/// Subset of the metadata document printed by `yt-dlp --dump-single-json`.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatEntry>,
}

/// One downloadable variant.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatEntry {
    pub format_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Average audio bitrate in kbps.
    #[serde(default)]
    pub abr: Option<f64>,
    /// Total bitrate in kbps; stands in for `abr` on audio-only variants.
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub asr: Option<u32>,
    #[serde(default)]
    pub audio_channels: Option<u8>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

impl FormatEntry {
    pub fn has_audio(&self) -> bool {
        matches!(self.acodec.as_deref(), Some(codec) if codec != "none")
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && matches!(self.vcodec.as_deref(), None | Some("none"))
    }

    /// Plain HTTP variants only; segmented manifests cannot be piped as-is.
    pub fn is_direct(&self) -> bool {
        self.url.is_some()
            && matches!(self.protocol.as_deref(), None | Some("http") | Some("https"))
    }

    pub fn audio_bitrate(&self) -> Option<f64> {
        self.abr.or(if self.is_audio_only() { self.tbr } else { None })
    }

    pub fn to_source_format(&self) -> SourceFormat {
        SourceFormat {
            format_id: self.format_id.clone(),
            codec: self.acodec.clone().unwrap_or_else(|| "unknown".into()),
            container: self.ext.clone(),
            bitrate_kbps: self.audio_bitrate(),
            sample_rate: self.asr,
            channels: self.audio_channels,
        }
    }
}

/// Pick one variant out of `formats`.
///
/// Preferred ids win in the order they are listed. Otherwise the best
/// audio-only variant inside the target bitrate class is chosen: highest
/// bitrate, then highest sample rate, then lowest id.
pub fn select_format<'a>(
    formats: &'a [FormatEntry],
    preference: &FormatPreference,
) -> Option<&'a FormatEntry> {
    let usable = |f: &&FormatEntry| f.is_direct() && f.has_audio();

    for id in &preference.preferred_format_ids {
        if let Some(found) = formats.iter().filter(usable).find(|f| &f.format_id == id) {
            return Some(found);
        }
    }

    formats
        .iter()
        .filter(usable)
        .filter(|f| f.is_audio_only())
        .filter(|f| f.acodec.as_deref().is_some_and(|c| preference.accepts_codec(c)))
        .filter(|f| f.audio_bitrate().is_some_and(|kbps| preference.accepts_bitrate(kbps)))
        .max_by(|a, b| rank(a, b))
}

fn rank(a: &FormatEntry, b: &FormatEntry) -> Ordering {
    let bitrate = |f: &FormatEntry| f.audio_bitrate().unwrap_or(0.0);
    bitrate(a)
        .partial_cmp(&bitrate(b))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.asr.unwrap_or(0).cmp(&b.asr.unwrap_or(0)))
        // max_by keeps the greater element, so reverse the id order to favour the lowest id.
        .then_with(|| b.format_id.cmp(&a.format_id))
}
