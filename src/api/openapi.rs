//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the bundle-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the bundle-dl REST API
///
/// This struct is used to generate the OpenAPI 3.1 specification that
/// describes all available endpoints, request/response types, and API
/// behavior. The spec is served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "bundle-dl REST API",
        version = "0.1.0",
        description = "REST API for managing fetch-and-bundle jobs: admit a job, attach resource URLs, and collect the resulting ZIP archive",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::api::routes::create_job,
        crate::api::routes::get_job,
        crate::api::routes::attach_resource,
        crate::api::routes::cancel_job,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::Status,
        crate::types::JobSnapshot,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Config,
        crate::config::ApiConfig,

        // API request/response types from routes.rs
        crate::api::routes::AttachRequest,
        crate::api::routes::CreateJobResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Job management - Admit jobs, attach resources, monitor and cancel them"),
        (name = "system", description = "System endpoints - Health checks and the OpenAPI spec"),
    )
)]
pub struct ApiDoc;
