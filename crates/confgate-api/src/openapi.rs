//! # OpenAPI Specification Assembly
//!
//! Served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "confgate API",
        version = "0.1.0",
        description = "Validate structured configuration documents against declarative policy rules.",
        license(name = "Apache-2.0")
    ),
    paths(
        crate::routes::validate::validate,
        crate::routes::metrics::get_metrics,
    ),
    components(schemas(
        // Report model
        confgate_report::Report,
        confgate_report::ReportEntry,
        confgate_report::Summary,
        confgate_report::FailurePolicy,
        confgate_core::Finding,
        confgate_core::Severity,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "validation", description = "Document validation"),
        (name = "operations", description = "Server metrics"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/validate"));
        assert!(doc.paths.paths.contains_key("/v1/metrics"));
    }
}
