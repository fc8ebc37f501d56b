use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use axum::Router;
use crate::state::AppState;

use tower_http::cors::{Any, CorsLayer};

pub fn configure_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(crate::modules::convert::router())
        .nest("/api/v1", api_routes().layer(cors))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(health))
        .merge(crate::modules::convert::api_router())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is up", body = String)
    ),
    tag = "System"
)]
pub async fn health() -> &'static str {
    "ok"
}
