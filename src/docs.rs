use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::modules::convert::handler::convert_api,
    ),
    tags(
        (name = "Convert", description = "One-shot video conversion to web-friendly MP4"),
        (name = "System", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;
