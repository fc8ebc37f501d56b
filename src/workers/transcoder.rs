use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::settings::AppConfig;

const DEFAULT_DIAGNOSTIC_LIMIT: usize = 64 * 1024;
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const TRUNCATED_MARKER: &str = "[...]\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    Success,
    ProcessFailure {
        exit_code: Option<i32>,
        diagnostic: String,
    },
    Timeout,
}

/// Startup probe failure. The service cannot run without the tool.
#[derive(Debug, Error)]
#[error("transcoder unavailable: {0}")]
pub struct ToolUnavailable(pub String);

/// Runs the external transcoder once per job.
///
/// Outcome is decided by exit status, output presence and the wall clock
/// only; stdout is discarded and stderr is kept as a size-capped diagnostic.
/// No retries.
#[derive(Debug, Clone)]
pub struct Transcoder {
    program: PathBuf,
    audio_codec: String,
    audio_bitrate: String,
    diagnostic_limit: usize,
}

impl Transcoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            diagnostic_limit: DEFAULT_DIAGNOSTIC_LIMIT,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.ffmpeg_bin)
            .with_audio(&config.audio_codec, &config.audio_bitrate)
            .with_diagnostic_limit(config.diagnostic_limit_bytes)
    }

    pub fn with_audio(mut self, codec: &str, bitrate: &str) -> Self {
        self.audio_codec = codec.to_string();
        self.audio_bitrate = bitrate.to_string();
        self
    }

    pub fn with_diagnostic_limit(mut self, limit: usize) -> Self {
        self.diagnostic_limit = limit;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Overwrite, copy video, re-encode audio, move the index to the front.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(12);
        args.push("-y".into());
        args.push("-i".into());
        args.push(input.into());
        args.push("-c:v".into());
        args.push("copy".into());
        args.push("-c:a".into());
        args.push(self.audio_codec.as_str().into());
        args.push("-b:a".into());
        args.push(self.audio_bitrate.as_str().into());
        args.push("-movflags".into());
        args.push("+faststart".into());
        args.push(output.into());
        args
    }

    /// Startup probe: `<program> -version` has to spawn and exit cleanly.
    /// Returns the first line of the version banner.
    pub async fn ensure_available(&self) -> Result<String, ToolUnavailable> {
        let mut probe = Command::new(&self.program);
        probe
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(PROBE_TIMEOUT, probe.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolUnavailable(format!(
                    "{} could not be started: {}",
                    self.program.display(),
                    e
                )));
            }
            Err(_) => {
                return Err(ToolUnavailable(format!(
                    "{} -version did not answer within {}s",
                    self.program.display(),
                    PROBE_TIMEOUT.as_secs()
                )));
            }
        };

        if !output.status.success() {
            return Err(ToolUnavailable(format!(
                "{} -version exited with {}",
                self.program.display(),
                output.status
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        Ok(banner.lines().next().unwrap_or_default().trim().to_string())
    }

    pub async fn invoke(&self, input: &Path, output: &Path, timeout: Duration) -> TranscodeOutcome {
        let started = Instant::now();
        debug!(program = %self.program.display(), input = %input.display(), "Starting transcoder");

        let mut child = match Command::new(&self.program)
            .args(self.args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!(program = %self.program.display(), "Failed to spawn transcoder: {}", e);
                return TranscodeOutcome::ProcessFailure {
                    exit_code: None,
                    diagnostic: format!("failed to start {}: {}", self.program.display(), e),
                };
            }
        };

        let limit = self.diagnostic_limit;
        let stderr = child.stderr.take();
        let collector = tokio::spawn(async move {
            match stderr {
                Some(stream) => collect_tail(stream, limit).await,
                None => String::new(),
            }
        });

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                collector.abort();
                error!("Failed to wait for transcoder: {}", e);
                return TranscodeOutcome::ProcessFailure {
                    exit_code: None,
                    diagnostic: format!("failed to wait for transcoder: {}", e),
                };
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out transcoder: {}", e);
                }
                collector.abort();
                error!(timeout_secs = timeout.as_secs_f64(), "Transcoder timed out, process killed");
                return TranscodeOutcome::Timeout;
            }
        };

        let diagnostic = match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, collector).await {
            Ok(Ok(text)) => text,
            _ => String::new(),
        };

        if !status.success() {
            return TranscodeOutcome::ProcessFailure {
                exit_code: status.code(),
                diagnostic,
            };
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "Conversion successful");
                TranscodeOutcome::Success
            }
            _ => TranscodeOutcome::ProcessFailure {
                exit_code: status.code(),
                diagnostic: "transcoder exited cleanly but produced no output".to_string(),
            },
        }
    }
}

/// Reads `reader` to the end keeping only the last `limit` bytes.
async fn collect_tail<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> String {
    let mut kept: Vec<u8> = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&buf[..n]);
                if kept.len() > limit {
                    let excess = kept.len() - limit;
                    kept.drain(..excess);
                    truncated = true;
                }
            }
        }
    }

    let text = String::from_utf8_lossy(&kept);
    if truncated {
        format!("{}{}", TRUNCATED_MARKER, text)
    } else {
        text.into_owned()
    }
}
