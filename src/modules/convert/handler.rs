use axum::{
    extract::{
        multipart::{Multipart, MultipartError},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use futures_util::StreamExt;
use std::io;
use tower_cookies::{Cookie, Cookies};
use tracing::warn;

use super::download::stream_video;
use super::error::{ConvertError, InvalidInput};
use super::model::ConvertedVideo;
use super::page::render_index;
use crate::common::flash;
use crate::common::response::{ApiError, ApiResponse};
use crate::state::AppState;

const DOWNLOAD_TOKEN_COOKIE: &str = "download_token";
const MAX_TOKEN_LEN: usize = 64;

/// Upload page
pub async fn index(State(state): State<AppState>, cookies: Cookies) -> Html<String> {
    let message = flash::take(&cookies).map(|kind| kind.message(&state.config.allowed_extensions));

    Html(render_index(
        state.config.max_upload_bytes,
        &state.config.allowed_extensions,
        message.as_deref(),
    ))
}

/// Form flow: stream the result back or redirect home with a flash message.
pub async fn convert_form(
    State(state): State<AppState>,
    cookies: Cookies,
    multipart: Multipart,
) -> Response {
    let (result, token) = run_upload(&state, multipart).await;

    match result {
        Ok(video) => {
            if let Some(token) = token {
                cookies.add(
                    Cookie::build((DOWNLOAD_TOKEN_COOKIE, token))
                        .path("/")
                        .max_age(time::Duration::seconds(60))
                        .build(),
                );
            }
            stream_video(&video).await
        }
        Err(e) => {
            warn!("Conversion request failed: {}", e);
            flash::set(&cookies, e.flash_kind());
            Redirect::to("/").into_response()
        }
    }
}

/// Convert Video
/// Same job as the form flow, with errors rendered as JSON.
#[utoipa::path(
    post,
    path = "/api/v1/convert",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Converted MP4 stream (attachment)"),
        (status = 400, description = "Missing file or unsupported extension", body = ApiResponse<String>),
        (status = 413, description = "Upload exceeds the size ceiling", body = ApiResponse<String>),
        (status = 422, description = "Transcoder rejected the input", body = ApiResponse<String>),
        (status = 500, description = "Upload could not be stored", body = ApiResponse<String>),
        (status = 504, description = "Transcoding exceeded its time budget", body = ApiResponse<String>)
    ),
    tag = "Convert"
)]
pub async fn convert_api(State(state): State<AppState>, multipart: Multipart) -> Response {
    let (result, _) = run_upload(&state, multipart).await;

    match result {
        Ok(video) => stream_video(&video).await,
        Err(e) => {
            warn!("Conversion request failed: {}", e);
            ApiError::from_convert(&e, &state.config.allowed_extensions).into_response()
        }
    }
}

/// Walks the multipart body, running the job on the first `file` part.
///
/// The form may place `download_token` before or after the file, so every
/// part is visited. Running past the size ceiling anywhere in the body
/// answers `PayloadTooLarge`.
async fn run_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> (Result<ConvertedVideo, ConvertError>, Option<String>) {
    let mut result: Option<Result<ConvertedVideo, ConvertError>> = None;
    let mut token = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(status = %e.status(), "Malformed multipart body: {}", e);
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    result = Some(Err(ConvertError::PayloadTooLarge));
                }
                break;
            }
        };

        let name = field.name().unwrap_or("").to_string();

        if name == "file" && result.is_none() {
            let declared = field.file_name().unwrap_or("").to_string();
            let upload = field.map(|chunk| chunk.map_err(upload_error));
            result = Some(state.converter.run_conversion_job(upload, &declared).await);
        } else if name == "download_token" {
            token = field.text().await.ok().filter(|value| is_valid_token(value));
        }
    }

    let result = result.unwrap_or(Err(InvalidInput::MissingFile.into()));
    (result, token)
}

/// Tags a body that hit the size ceiling so it survives the trip through `io::Error`.
fn upload_error(e: MultipartError) -> io::Error {
    let kind = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        io::ErrorKind::FileTooLarge
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, e.body_text())
}

fn is_valid_token(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_TOKEN_LEN
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
