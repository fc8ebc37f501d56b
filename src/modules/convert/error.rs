use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::common::flash::FlashKind;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Caller's fault. Raised before anything touches the disk.
    #[error("invalid input: {0}")]
    InvalidInput(InvalidInput),

    /// The body ran past the upload ceiling while it was being read.
    #[error("upload exceeds the size ceiling")]
    PayloadTooLarge,

    #[error("failed to persist upload: {0}")]
    StorageFailure(#[source] std::io::Error),

    #[error("transcoder rejected the input: {diagnostic}")]
    TranscodeFailed { diagnostic: String },

    #[error("transcoder exceeded its {}s budget", .0.as_secs())]
    TranscodeTimeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    MissingFile,
    EmptyFilename,
    UnsupportedExtension,
}

impl std::fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidInput::MissingFile => write!(f, "no file part in request"),
            InvalidInput::EmptyFilename => write!(f, "empty filename"),
            InvalidInput::UnsupportedExtension => write!(f, "extension not allowed"),
        }
    }
}

impl ConvertError {
    pub fn flash_kind(&self) -> FlashKind {
        match self {
            ConvertError::InvalidInput(InvalidInput::MissingFile) => FlashKind::MissingFile,
            ConvertError::InvalidInput(InvalidInput::EmptyFilename) => FlashKind::EmptyFilename,
            ConvertError::InvalidInput(InvalidInput::UnsupportedExtension) => FlashKind::InvalidType,
            ConvertError::PayloadTooLarge => FlashKind::TooLarge,
            ConvertError::StorageFailure(_) => FlashKind::SaveFailed,
            ConvertError::TranscodeFailed { .. } => FlashKind::ConversionFailed,
            ConvertError::TranscodeTimeout(_) => FlashKind::TimedOut,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ConvertError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ConvertError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConvertError::TranscodeFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ConvertError::TranscodeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Message safe to show an end user. Tool diagnostics never appear here.
    pub fn user_message(&self, allowed_extensions: &[String]) -> String {
        self.flash_kind().message(allowed_extensions)
    }
}

impl From<InvalidInput> for ConvertError {
    fn from(value: InvalidInput) -> Self {
        ConvertError::InvalidInput(value)
    }
}
