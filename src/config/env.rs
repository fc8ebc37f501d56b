use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    UploadDir,
    MaxUploadBytes,
    FfmpegBin,
    AllowedExtensions,
    TranscodeTimeoutSecs,
    SuccessCleanupDelaySecs,
    FailureCleanupDelaySecs,
    AudioCodec,
    AudioBitrate,
    DiagnosticLimitBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::UploadDir => "UPLOAD_DIR",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::AllowedExtensions => "ALLOWED_EXTENSIONS",
            EnvKey::TranscodeTimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
            EnvKey::SuccessCleanupDelaySecs => "SUCCESS_CLEANUP_DELAY_SECS",
            EnvKey::FailureCleanupDelaySecs => "FAILURE_CLEANUP_DELAY_SECS",
            EnvKey::AudioCodec => "AUDIO_CODEC",
            EnvKey::AudioBitrate => "AUDIO_BITRATE",
            EnvKey::DiagnosticLimitBytes => "DIAGNOSTIC_LIMIT_BYTES",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Comma separated list, lowercased, empty entries dropped.
pub fn get_list(key: EnvKey, default: &[&str]) -> Vec<String> {
    let parsed = get(key).map(|val| parse_list(&val)).unwrap_or_default();

    if parsed.is_empty() {
        default.iter().map(|item| item.to_string()).collect()
    } else {
        parsed
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}
