//! OpenAPI documentation, served at `{API_PREFIX}/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use sealdrop_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sealdrop API",
        version = "0.1.0",
        description = "Batch ingestion of tabular and media files with encryption at rest"
    ),
    paths(
        handlers::upload::upload_batch,
        handlers::health::health_check,
    ),
    components(schemas(
        models::BatchReport,
        models::FileResult,
        models::FileStatus,
        models::FileKind,
        handlers::health::HealthResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "ingest", description = "Batch upload and ingestion"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
