use axum::Router;
use axum::extract::DefaultBodyLimit;
use crate::state::AppState;
use tower_cookies::CookieManagerLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub async fn create_app(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    crate::routes::configure_routes()
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::settings::AppConfig;
    use crate::infrastructure::storage::artifact_store::ArtifactStore;
    use crate::modules::convert::service::{ConversionService, JobPolicy};
    use crate::test_support::stand_in_transcoder;
    use crate::workers::cleanup::CleanupScheduler;
    use crate::workers::transcoder::Transcoder;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serial_test::serial;
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XConverterBoundary";

    async fn test_app(dir: &Path, mode: &str, max_upload_bytes: usize) -> Router {
        let config = AppConfig {
            upload_dir: dir.join("artifacts"),
            max_upload_bytes,
            ..AppConfig::default()
        };
        let store = ArtifactStore::open(&config.upload_dir).await.unwrap();
        let converter = ConversionService::new(
            store,
            Transcoder::new(stand_in_transcoder(dir, mode)),
            CleanupScheduler::new(),
            JobPolicy::from_config(&config),
        );
        create_app(AppState::new(config, converter)).await
    }

    fn multipart(filename: &str, content: &[u8], token: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(token) = token {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"download_token\"\r\n\r\n{token}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    /// Same upload without `Content-Length`, delivered in small chunks.
    fn chunked_upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        let chunks: Vec<Result<bytes::Bytes, std::io::Error>> = body
            .chunks(512)
            .map(|chunk| Ok(bytes::Bytes::copy_from_slice(chunk)))
            .collect();
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap()
    }

    fn set_cookies(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    #[serial]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 1024 * 1024).await;

        let response = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    #[serial]
    async fn form_success_streams_attachment_and_sets_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 1024 * 1024).await;

        let response = app
            .oneshot(upload_request("/convert", multipart("clip.mov", b"movie", Some("tok123"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clip_aac.mp4\""
        );
        assert!(set_cookies(&response).iter().any(|c| c.starts_with("download_token=tok123")));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"converted");
    }

    #[tokio::test]
    #[serial]
    async fn form_rejects_bad_extension_with_flash() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 1024 * 1024).await;

        let response = app
            .oneshot(upload_request("/convert", multipart("notes.txt", b"hello", None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(set_cookies(&response).iter().any(|c| c.starts_with("flash=invalid_type")));
        assert_eq!(std::fs::read_dir(dir.path().join("artifacts")).unwrap().count(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn index_shows_and_clears_flash() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 1024 * 1024).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::COOKIE, "flash=conversion_failed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).iter().any(|c| c.starts_with("flash=")));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Conversion failed. The file might be corrupt."));
    }

    #[tokio::test]
    #[serial]
    async fn api_reports_transcode_failure_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "fail", 1024 * 1024).await;

        let response = app
            .oneshot(upload_request("/api/v1/convert", multipart("broken.mp4", b"junk", None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Conversion failed. The file might be corrupt.");
        assert!(!json["message"].as_str().unwrap().contains("moov"));
    }

    #[tokio::test]
    #[serial]
    async fn api_without_file_part_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 1024 * 1024).await;
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n"
        );

        let response = app
            .oneshot(upload_request("/api/v1/convert", body.into_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn oversized_upload_is_refused_at_the_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 64).await;

        let response = app
            .oneshot(upload_request("/convert", multipart("clip.mov", &[0u8; 1024], None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(std::fs::read_dir(dir.path().join("artifacts")).unwrap().count(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn chunked_oversized_upload_is_too_large_in_api() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 256).await;

        let response = app
            .oneshot(chunked_upload_request("/api/v1/convert", multipart("clip.mov", &[0u8; 4096], None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "File is too large.");
        assert_eq!(std::fs::read_dir(dir.path().join("artifacts")).unwrap().count(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn chunked_oversized_upload_flashes_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), "succeed", 256).await;

        let response = app
            .oneshot(chunked_upload_request("/convert", multipart("clip.mov", &[0u8; 4096], None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(set_cookies(&response).iter().any(|c| c.starts_with("flash=too_large")));
        assert_eq!(std::fs::read_dir(dir.path().join("artifacts")).unwrap().count(), 0);
    }
}
