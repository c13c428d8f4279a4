//! REST API server module
//!
//! Provides a small OpenAPI-documented REST API for admitting jobs,
//! attaching resources, and monitoring job status.

use crate::{BundleEngine, Config, Result};
use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /jobs` - Admit a new job
/// - `GET /jobs/:id` - Get job status
/// - `POST /jobs/:id/resources` - Attach a resource locator
/// - `DELETE /jobs/:id` - Cancel a job
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(engine: Arc<BundleEngine>, config: Arc<Config>) -> Router {
    let state = AppState::new(engine, config.clone());

    let router = Router::new()
        .route("/jobs", post(routes::create_job))
        .route("/jobs/:id", get(routes::get_job))
        .route("/jobs/:id", delete(routes::cancel_job))
        .route("/jobs/:id/resources", post(routes::attach_resource))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Allows the specified origins ("*" or an empty list means any origin),
/// all methods, and all headers for cross-origin requests.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Creates a TCP listener, binds it to the configured address, and serves
/// the API router until the server is shut down.
///
/// # Example
///
/// ```no_run
/// use bundle_dl::{BundleEngine, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let engine = Arc::new(BundleEngine::new(config.clone())?);
///
/// // Start API server (blocks until shutdown)
/// bundle_dl::api::start_api_server(engine, Arc::new(config)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(engine: Arc<BundleEngine>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(engine, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
