//! Frame source resolver backed by `yt-dlp` metadata and a direct HTTP fetch.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use encore_core::{FormatPreference, ResolveError, ResolvedSource, SourceResolver};
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use tokio::process::Command;
use tracing::{debug, info};

use crate::format::{FormatEntry, MediaInfo, select_format};

/// Default wall-clock limit for the metadata lookup.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit on a single read of the media body, and on connecting.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// stderr fragments that point at the network rather than the URL.
const NETWORK_MARKERS: &[&str] = &[
    "Unable to download",
    "timed out",
    "Connection",
    "Temporary failure in name resolution",
    "HTTP Error 5",
    "Network is unreachable",
];

/// Resolves page URLs with `yt-dlp` and opens the chosen audio variant.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    binary: PathBuf,
    http: Client,
    preference: FormatPreference,
    timeout: Duration,
}

impl YtDlpResolver {
    /// `read_timeout` bounds connecting and every read of the media body.
    pub fn new(
        binary: impl AsRef<Path>,
        preference: FormatPreference,
        read_timeout: Duration,
    ) -> Result<Self, ResolveError> {
        let http = Client::builder()
            .connect_timeout(read_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| ResolveError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            binary: binary.as_ref().to_path_buf(),
            http,
            preference,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the provider's metadata document for `url`.
    pub async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ResolveError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("--dump-single-json")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            ResolveError::Network(format!("failed to launch {}: {e}", self.binary.display()))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ResolveError::Network(format!(
                    "metadata lookup timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ResolveError::Network(format!("failed to wait for yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ResolveError::SourceNotFound(format!("unreadable metadata: {e}")))
    }

    async fn open(&self, entry: &FormatEntry) -> Result<reqwest::Response, ResolveError> {
        let url = entry
            .url
            .as_deref()
            .ok_or_else(|| ResolveError::SourceNotFound("selected variant has no URL".into()))?;

        let response = self
            .http
            .get(url)
            .headers(forwarded_headers(entry))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResolveError::Network(format!("media request timed out: {e}"))
                } else {
                    ResolveError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(match status {
            StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::FORBIDDEN => {
                ResolveError::SourceNotFound(format!("media request returned {status}"))
            }
            _ => ResolveError::Network(format!("media request returned {status}")),
        })
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedSource, ResolveError> {
        let info = self.fetch_info(url).await?;
        debug!(id = %info.id, variants = info.formats.len(), "Fetched media metadata");

        let entry = select_format(&info.formats, &self.preference).ok_or_else(|| {
            ResolveError::NoMatchingFormat(format!(
                "{} variants offered, none matched {:?} or {}±{} kbps",
                info.formats.len(),
                self.preference.preferred_format_ids,
                self.preference.target_bitrate_kbps,
                self.preference.bitrate_tolerance_kbps
            ))
        })?;
        let format = entry.to_source_format();

        let response = self.open(entry).await?;
        info!(id = %info.id, format = %format, "Opened source stream");

        let stream = response.bytes_stream().map_err(io::Error::other);
        let source = ResolvedSource::new(format, Box::pin(stream));
        Ok(match info.title {
            Some(title) => source.with_title(title),
            None => source,
        })
    }
}

/// Map a failed lookup to the error taxonomy from its stderr text.
pub fn classify_failure(stderr: &str) -> ResolveError {
    let detail = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("yt-dlp exited unsuccessfully")
        .to_string();
    if NETWORK_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        ResolveError::Network(detail)
    } else {
        ResolveError::SourceNotFound(detail)
    }
}

/// Headers the provider asks clients to send along with the media request.
fn forwarded_headers(entry: &FormatEntry) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &entry.http_headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            debug!(header = %name, "Skipping malformed provider header");
            continue;
        };
        headers.insert(name, value);
    }
    headers
}
