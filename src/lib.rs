//! # bundle-dl
//!
//! Backend library for fetch-and-bundle services: admit a job, attach a
//! bounded set of resource URLs, fetch them concurrently, and collect the
//! result as a single ZIP archive.
//!
//! ## Design Philosophy
//!
//! bundle-dl is designed to be:
//! - **Bounded by construction** - Global job capacity and per-job resource
//!   quotas are enforced at admission, never by queueing callers
//! - **Failure-tolerant** - One bad resource fails its job, never the engine
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!   (an optional REST API server is included)
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use bundle_dl::{BundleEngine, Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         max_jobs: 3,
//!         max_resources_per_job: 3,
//!         ..Default::default()
//!     };
//!
//!     let engine = Arc::new(BundleEngine::new(config)?);
//!     engine.start_queue_processor();
//!
//!     // Subscribe to events
//!     let mut events = engine.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = engine.admit()?;
//!     engine.attach_resource(id, "http://example.com/report.pdf")?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Archive output
pub mod archive;
/// Configuration types
pub mod config;
/// Core engine implementation (decomposed into focused submodules)
pub mod engine;
/// Error types
pub mod error;
/// Resource fetching
pub mod fetcher;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archive::{ArchiveStore, JobArchive, ZipArchiveStore};
pub use config::{ApiConfig, Config};
pub use engine::BundleEngine;
pub use error::{
    ApiError, ArchiveError, Error, ErrorDetail, FetchError, JobError, ResourceError, Result,
    ToHttpStatus,
};
pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use types::{Event, JobId, JobSnapshot, Status};

/// Helper function to run the engine with graceful signal handling.
///
/// Waits for a termination signal and then calls the engine's `shutdown()`
/// method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use bundle_dl::{BundleEngine, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = Arc::new(BundleEngine::new(Config::default())?);
///     engine.start_queue_processor();
///     engine.clone().spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(&engine).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(engine: &BundleEngine) -> Result<()> {
    wait_for_signal().await;
    engine.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
