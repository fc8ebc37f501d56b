use axum::Router;
use axum::routing::{get, post};
use crate::state::AppState;

pub mod download;
pub mod error;
pub mod handler;
pub mod model;
pub mod page;
pub mod service;

/// Browser-facing routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::index))
        .route("/convert", post(handler::convert_form))
}

/// JSON API routes, nested under `/api/v1`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/convert", post(handler::convert_api))
}
