//! Route handlers for the REST API

use crate::api::AppState;
use crate::error::{ApiError, Error, Result};
use crate::types::{JobId, JobSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{OpenApi, ToSchema};

/// Request body for attaching a resource to a job
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AttachRequest {
    /// Locator of the resource to fetch
    pub url: String,
}

/// Response body for a newly created job
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateJobResponse {
    /// Identifier of the admitted job
    pub id: JobId,
}

/// POST /jobs - Admit a new job
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 201, description = "Job admitted", body = CreateJobResponse),
        (status = 503, description = "At capacity or shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_job(State(state): State<AppState>) -> Result<Response> {
    let id = state.engine.admit()?;
    Ok((StatusCode::CREATED, Json(CreateJobResponse { id })).into_response())
}

/// GET /jobs/:id - Get job status
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job snapshot", body = JobSnapshot),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<JobSnapshot>> {
    let snapshot = state.engine.status(JobId(id))?;
    Ok(Json(snapshot))
}

/// POST /jobs/:id/resources - Attach a resource locator to a pending job
#[utoipa::path(
    post,
    path = "/jobs/{id}/resources",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    request_body = AttachRequest,
    responses(
        (status = 200, description = "Resource attached"),
        (status = 400, description = "Empty locator", body = crate::error::ApiError),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job already started", body = crate::error::ApiError),
        (status = 422, description = "Resource quota reached", body = crate::error::ApiError)
    )
)]
pub async fn attach_resource(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AttachRequest>,
) -> Response {
    if request.url.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation("url must not be empty")),
        )
            .into_response();
    }

    match state.engine.attach_resource(JobId(id), &request.url) {
        Ok(()) => (StatusCode::OK, Json(json!({"attached": request.url}))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /jobs/:id - Cancel a job
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 204, description = "Job cancelled"),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state.engine.cancel(JobId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification document")
    )
)]
pub async fn openapi_spec() -> Result<Json<serde_json::Value>> {
    let spec = crate::api::ApiDoc::openapi();
    let value = serde_json::to_value(spec).map_err(Error::Serialization)?;
    Ok(Json(value))
}
