//! Source resolution and opus encoding for the relay.
//!
//! [`YtDlpResolver`] turns a page URL into a byte stream of the best audio
//! variant, and [`DcaTranscoder`] pipes that stream through the `dca`
//! encoder to produce length-prefixed opus frames.

pub mod dca;
pub mod format;
pub mod resolver;
pub mod transcode;

pub use dca::{DcaMetadata, FrameReader, MAX_FRAME_BYTES, encode_frame};
pub use format::{FormatEntry, MediaInfo, select_format};
pub use resolver::{
    DEFAULT_READ_TIMEOUT, DEFAULT_RESOLVE_TIMEOUT, YtDlpResolver, classify_failure,
};
pub use transcode::{DcaFrameStream, DcaTranscoder};
