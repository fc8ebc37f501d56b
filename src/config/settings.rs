use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use crate::config::env::{self, EnvKey};

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "flv"];

/// 2 GiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub ffmpeg_bin: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub transcode_timeout_secs: u64,
    pub success_cleanup_delay_secs: u64,
    pub failure_cleanup_delay_secs: u64,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub diagnostic_limit_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Self {
        let defaults = Self::default();

        Self {
            server_port: env::get_parsed(EnvKey::ServerPort, defaults.server_port),
            upload_dir: env::get(EnvKey::UploadDir).map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, defaults.max_upload_bytes),
            ffmpeg_bin: env::get(EnvKey::FfmpegBin).map(PathBuf::from).unwrap_or(defaults.ffmpeg_bin),
            allowed_extensions: env::get_list(EnvKey::AllowedExtensions, DEFAULT_ALLOWED_EXTENSIONS),
            transcode_timeout_secs: env::get_parsed(EnvKey::TranscodeTimeoutSecs, defaults.transcode_timeout_secs),
            success_cleanup_delay_secs: env::get_parsed(
                EnvKey::SuccessCleanupDelaySecs,
                defaults.success_cleanup_delay_secs,
            ),
            failure_cleanup_delay_secs: env::get_parsed(
                EnvKey::FailureCleanupDelaySecs,
                defaults.failure_cleanup_delay_secs,
            ),
            audio_codec: env::get_or(EnvKey::AudioCodec, &defaults.audio_codec),
            audio_bitrate: env::get_or(EnvKey::AudioBitrate, &defaults.audio_bitrate),
            diagnostic_limit_bytes: env::get_parsed(EnvKey::DiagnosticLimitBytes, defaults.diagnostic_limit_bytes),
        }
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }

    pub fn success_cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.success_cleanup_delay_secs)
    }

    pub fn failure_cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.failure_cleanup_delay_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 1800,
            upload_dir: PathBuf::from("temp_uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            transcode_timeout_secs: 3600,
            success_cleanup_delay_secs: 300,
            failure_cleanup_delay_secs: 60,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            diagnostic_limit_bytes: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server_port, 1800);
        assert_eq!(config.transcode_timeout(), Duration::from_secs(3600));
        assert_eq!(config.success_cleanup_delay(), Duration::from_secs(300));
        assert_eq!(config.failure_cleanup_delay(), Duration::from_secs(60));
        assert_eq!(config.allowed_extensions.len(), 6);
        assert!(config.allowed_extensions.contains(&"webm".to_string()));
    }

    #[test]
    fn success_delay_outlasts_failure_delay() {
        let config = AppConfig::default();
        assert!(config.success_cleanup_delay() > config.failure_cleanup_delay());
    }
}
