use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use super::model::ConvertedVideo;
use crate::common::response::ApiError;

/// Streams a finished conversion to the client as an attachment.
pub async fn stream_video(video: &ConvertedVideo) -> Response {
    let file = match tokio::fs::File::open(&video.path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(job_id = %video.job_id, "Converted file vanished before streaming: {}", e);
            return ApiError("Converted file is no longer available".to_string(), StatusCode::GONE)
                .into_response();
        }
    };
    let length = file.metadata().await.ok().map(|meta| meta.len());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, video.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", video.download_name),
        )
        .header("x-job-id", video.job_id.as_str());

    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    let body = Body::from_stream(ReaderStream::new(file));

    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::convert::model::JobId;

    #[tokio::test]
    async fn streams_file_with_attachment_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converted.mp4");
        std::fs::write(&path, b"mp4 bytes").unwrap();
        let video = ConvertedVideo {
            job_id: JobId::generate(),
            path,
            download_name: "clip_aac.mp4".to_string(),
            content_type: "video/mp4",
        };

        let response = stream_video(&video).await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(headers[header::CONTENT_LENGTH], "9");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clip_aac.mp4\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"mp4 bytes");
    }

    #[tokio::test]
    async fn missing_file_is_gone() {
        let video = ConvertedVideo {
            job_id: JobId::generate(),
            path: "/nonexistent/converted.mp4".into(),
            download_name: "clip_aac.mp4".to_string(),
            content_type: "video/mp4",
        };

        assert_eq!(stream_video(&video).await.status(), StatusCode::GONE);
    }
}
