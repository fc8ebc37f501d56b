use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE: &str = "flash";

/// One-shot user notice carried across the post/redirect/get round trip.
///
/// Only the kind travels in the cookie; the text is rendered server side so
/// no user-controlled bytes ever end up in a cookie value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    MissingFile,
    EmptyFilename,
    InvalidType,
    SaveFailed,
    ConversionFailed,
    TimedOut,
    TooLarge,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::MissingFile => "missing_file",
            FlashKind::EmptyFilename => "empty_filename",
            FlashKind::InvalidType => "invalid_type",
            FlashKind::SaveFailed => "save_failed",
            FlashKind::ConversionFailed => "conversion_failed",
            FlashKind::TimedOut => "timed_out",
            FlashKind::TooLarge => "too_large",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "missing_file" => Some(FlashKind::MissingFile),
            "empty_filename" => Some(FlashKind::EmptyFilename),
            "invalid_type" => Some(FlashKind::InvalidType),
            "save_failed" => Some(FlashKind::SaveFailed),
            "conversion_failed" => Some(FlashKind::ConversionFailed),
            "timed_out" => Some(FlashKind::TimedOut),
            "too_large" => Some(FlashKind::TooLarge),
            _ => None,
        }
    }

    pub fn message(&self, allowed_extensions: &[String]) -> String {
        match self {
            FlashKind::MissingFile => "No file part in request.".to_string(),
            FlashKind::EmptyFilename => "No file selected.".to_string(),
            FlashKind::InvalidType => {
                format!("Invalid file type. Allowed: {}", allowed_extensions.join(", "))
            }
            FlashKind::SaveFailed => "Failed to save uploaded file.".to_string(),
            FlashKind::ConversionFailed => "Conversion failed. The file might be corrupt.".to_string(),
            FlashKind::TimedOut => "File is too large or conversion took too long.".to_string(),
            FlashKind::TooLarge => "File is too large.".to_string(),
        }
    }
}

pub fn set(cookies: &Cookies, kind: FlashKind) {
    cookies.add(
        Cookie::build((FLASH_COOKIE, kind.as_str()))
            .path("/")
            .http_only(true)
            .build(),
    );
}

/// Reads and clears the pending flash, if any.
pub fn take(cookies: &Cookies) -> Option<FlashKind> {
    let kind = cookies
        .get(FLASH_COOKIE)
        .and_then(|cookie| FlashKind::parse(cookie.value()));

    if kind.is_some() {
        cookies.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
    }

    kind
}
