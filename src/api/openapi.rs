//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the repackage REST API
///
/// Served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "repackage REST API",
        description = "Converts remote .tar.zst archives to ZIP and returns them inline or through a presigned URL",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::api::routes::convert,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            crate::api::routes::ConvertRequest,
            crate::api::routes::ConvertResponse,
            crate::api::routes::HealthResponse,
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "convert", description = "Archive conversion"),
        (name = "system", description = "Health and API description")
    )
)]
pub struct ApiDoc;
