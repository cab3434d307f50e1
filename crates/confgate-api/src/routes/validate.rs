//! # Validation API
//!
//! Every file part of a multipart upload becomes one input source, named
//! by its filename (or its field name when the filename is empty). Each
//! request runs its own [`Pipeline`] on the blocking pool; dropping the
//! request future cancels the evaluation.
//!
//! A completed evaluation always answers 200 with the rendered report and
//! an `x-confgate-result: pass|fail` header, even when documents failed.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use confgate_core::{DocumentFormat, PipelineError};
use confgate_loader::InputSource;
use confgate_pipeline::Pipeline;
use confgate_policy::CancelFlag;
use confgate_report::{render, OutputFormat};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;
use crate::state::AppState;

/// Response header carrying the overall report status.
pub const RESULT_HEADER: HeaderName = HeaderName::from_static("x-confgate-result");

const BANNER: &str = "confgate policy server\n\nPOST files as multipart/form-data to /v1/validate\n";

/// Query parameters of a validation request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValidateParams {
    /// Decode every uploaded file with this format instead of its suffix.
    pub format: Option<String>,
    /// Comma-separated namespaces to evaluate; all when absent.
    pub namespaces: Option<String>,
    /// Report format: json (default), stdout, table, tap or junit.
    pub output: Option<String>,
    /// Evaluate all uploads as one combined document.
    pub combine: Option<bool>,
}

/// Build the validation router.
pub fn router(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/v1/validate", post(validate))
        .route("/validate", post(validate))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// GET /: Plain-text banner.
async fn banner() -> &'static str {
    BANNER
}

/// POST /v1/validate: Evaluate uploaded documents against the server's policies.
#[utoipa::path(
    post,
    path = "/v1/validate",
    params(ValidateParams),
    request_body(content = String, content_type = "multipart/form-data", description = "One or more document files"),
    responses(
        (status = 200, description = "Evaluation completed; see x-confgate-result", body = confgate_report::Report),
        (status = 400, description = "Malformed upload or undecodable document", body = crate::error::ErrorBody),
        (status = 413, description = "Upload exceeds the body limit", body = crate::error::ErrorBody),
        (status = 422, description = "Policy compile error, unknown namespace or bad parameter", body = crate::error::ErrorBody),
        (status = 500, description = "Server-side failure", body = crate::error::ErrorBody),
    ),
    tag = "validation"
)]
async fn validate(
    State(state): State<AppState>,
    params: Result<Query<ValidateParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let format = params
        .format
        .as_deref()
        .map(str::parse::<DocumentFormat>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let output = params
        .output
        .as_deref()
        .map(str::parse::<OutputFormat>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?
        .unwrap_or_default();

    let inputs = read_uploads(multipart?, format).await?;
    if inputs.is_empty() {
        return Err(AppError::BadRequest(
            "no files in multipart upload".to_string(),
        ));
    }

    let mut config = state.request_pipeline();
    if let Some(namespaces) = params.namespaces {
        config.namespaces = namespaces
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(combine) = params.combine {
        config.combine = combine;
    }

    let request_id = uuid::Uuid::new_v4();
    tracing::info!(%request_id, files = inputs.len(), output = %output, "validation request");

    let report = run_cancellable(move |cancel| Pipeline::new(config).run(inputs, cancel)).await?;

    state.metrics.record_validation(report.failed);
    tracing::debug!(%request_id, failed = report.failed, "validation finished");

    let body = render(&report, output)
        .map_err(|e| AppError::Internal(format!("failed to render report: {e}")))?;
    let result = if report.failed { "fail" } else { "pass" };
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(output.content_type())),
            (RESULT_HEADER, HeaderValue::from_static(result)),
        ],
        body,
    )
        .into_response())
}

/// Run `work` on the blocking pool with a fresh [`CancelFlag`].
///
/// Dropping the returned future before `work` finishes cancels the flag.
async fn run_cancellable<T, F>(work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&CancelFlag) -> Result<T, PipelineError> + Send + 'static,
{
    let cancel = CancelFlag::new();
    let guard = cancel.guard();
    let outcome = tokio::task::spawn_blocking(move || work(&cancel))
        .await
        .map_err(|e| AppError::Internal(format!("evaluation task failed: {e}")))?;
    guard.disarm();
    Ok(outcome?)
}

async fn read_uploads(
    mut multipart: Multipart,
    format: Option<DocumentFormat>,
) -> Result<Vec<InputSource>, AppError> {
    let mut inputs = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name() else {
            tracing::debug!(field = ?field.name(), "skipping non-file part");
            continue;
        };
        let name = if file_name.is_empty() {
            field.name().unwrap_or_default().to_string()
        } else {
            file_name.to_string()
        };
        let bytes = field.bytes().await?;
        tracing::debug!(file = %name, size = bytes.len(), "received upload");
        inputs.push(InputSource::new(name, bytes.to_vec()).with_format(format));
    }
    Ok(inputs)
}
