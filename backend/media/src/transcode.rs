//! Encode pipeline driving the external `dca` encoder.
//!
//! Source bytes are pumped into the encoder's stdin by a feeder task while
//! frames are pulled from its stdout on demand, so memory stays bounded by
//! the pipe buffers regardless of track length.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use encore_core::{EncodeConfig, FrameStream, ResolvedSource, TranscodeError, Transcoder};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dca::FrameReader;

/// Lines of encoder stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Runs `dca` (or a compatible binary) as the encode pipeline.
#[derive(Debug, Clone)]
pub struct DcaTranscoder {
    binary: PathBuf,
}

impl DcaTranscoder {
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Encoder arguments for `config`, reading from stdin.
    pub fn encoder_args(config: &EncodeConfig) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            "pipe:0".to_string(),
            "-ab".to_string(),
            config.bitrate_kbps.to_string(),
            "-aa".to_string(),
            config.application.as_str().to_string(),
            "-ar".to_string(),
            config.sample_rate.to_string(),
            "-ac".to_string(),
            config.channels.to_string(),
            "-as".to_string(),
            config.frame_size.to_string(),
            "-vol".to_string(),
            config.volume.to_string(),
        ];
        if config.raw_output {
            args.push("-raw".to_string());
        }
        args
    }
}

#[async_trait]
impl Transcoder for DcaTranscoder {
    fn name(&self) -> &str {
        "dca"
    }

    async fn transcode(
        &self,
        source: ResolvedSource,
        config: &EncodeConfig,
    ) -> Result<Box<dyn FrameStream>, TranscodeError> {
        if let Some(problem) = config.check() {
            return Err(TranscodeError::Startup(problem));
        }

        let mut command = Command::new(&self.binary);
        command
            .args(Self::encoder_args(config))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            TranscodeError::Startup(format!("failed to spawn {}: {e}", self.binary.display()))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TranscodeError::Startup("encoder stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TranscodeError::Startup("encoder stdout unavailable".into()))?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let stderr_task = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&stderr_tail);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "encoder", "{line}");
                    if let Ok(mut tail) = tail.lock() {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            })
        });

        info!(
            binary = %self.binary.display(),
            pid = ?child.id(),
            format = %source.format,
            bitrate_kbps = config.bitrate_kbps,
            application = config.application.as_str(),
            raw = config.raw_output,
            "Encoder started"
        );

        let feeder = tokio::spawn(feed(source, stdin));

        Ok(Box::new(DcaFrameStream {
            reader: FrameReader::new(stdout, !config.raw_output),
            child,
            feeder: Some(feeder),
            stderr_task,
            stderr_tail,
            closed: false,
        }))
    }
}

/// Copy the source into the encoder. A closed pipe means the encoder is done
/// with its input and is not an error.
async fn feed(source: ResolvedSource, mut stdin: ChildStdin) -> Result<u64, String> {
    let mut stream = source.stream;
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        if let Err(e) = stdin.write_all(&chunk).await {
            debug!(error = %e, written, "Encoder stopped accepting input");
            return Ok(written);
        }
        written += chunk.len() as u64;
    }
    // Dropping stdin signals end of input.
    let _ = stdin.shutdown().await;
    Ok(written)
}

/// Frames coming out of a running encoder process.
pub struct DcaFrameStream {
    reader: FrameReader<ChildStdout>,
    child: Child,
    feeder: Option<JoinHandle<Result<u64, String>>>,
    stderr_task: Option<JoinHandle<()>>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    closed: bool,
}

impl DcaFrameStream {
    fn stderr_summary(&self) -> String {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect::<Vec<_>>().join(" | "))
            .unwrap_or_default()
    }

    /// Called once the encoder's output is exhausted: decide whether the end
    /// is a clean one.
    async fn check_end(&mut self) -> Result<(), TranscodeError> {
        if let Some(feeder) = self.feeder.take() {
            match feeder.await {
                Ok(Ok(written)) => debug!(written, "Source fully fed to encoder"),
                Ok(Err(e)) => return Err(TranscodeError::SourceInterrupted(e)),
                Err(e) => warn!(error = %e, "Feeder task ended abnormally"),
            }
        }

        if self.reader.frames_read() == 0 {
            if let Ok(status) = self.child.wait().await {
                if !status.success() {
                    // Let the stderr drain finish so the report is complete.
                    if let Some(task) = self.stderr_task.take() {
                        let _ = task.await;
                    }
                    return Err(TranscodeError::Startup(format!(
                        "encoder exited with {status} before producing audio: {}",
                        self.stderr_summary()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FrameStream for DcaFrameStream {
    async fn next_frame(&mut self) -> Result<Option<Bytes>, TranscodeError> {
        if self.closed {
            return Ok(None);
        }
        match self.reader.next_frame().await? {
            Some(frame) => Ok(Some(frame)),
            None => {
                self.check_end().await?;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
        if let Err(e) = self.child.start_kill() {
            // Already exited on its own.
            debug!(error = %e, "Encoder kill skipped");
        }
        match self.child.wait().await {
            Ok(status) => info!(
                %status,
                frames = self.reader.frames_read(),
                "Encoder released"
            ),
            Err(e) => warn!(error = %e, "Failed to reap encoder"),
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

impl Drop for DcaFrameStream {
    fn drop(&mut self) {
        // The child itself is killed by `kill_on_drop`.
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::Application;

    #[test]
    fn builds_encoder_arguments() {
        let config = EncodeConfig {
            bitrate_kbps: 96,
            application: Application::LowDelay,
            raw_output: true,
            ..Default::default()
        };
        let args = DcaTranscoder::encoder_args(&config);
        assert_eq!(
            args,
            vec![
                "-i", "pipe:0", "-ab", "96", "-aa", "lowdelay", "-ar", "48000", "-ac", "2", "-as",
                "960", "-vol", "256", "-raw",
            ]
        );
    }

    #[test]
    fn container_output_omits_raw_flag() {
        let args = DcaTranscoder::encoder_args(&EncodeConfig::default());
        assert!(!args.iter().any(|a| a == "-raw"));
        assert!(args.windows(2).any(|w| w[0] == "-aa" && w[1] == "audio"));
    }
}
