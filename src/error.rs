//! Error types for bundle-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (admission, job mutation, fetch, archive)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{JobId, Status};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for bundle-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bundle-dl
///
/// Errors returned synchronously by engine operations. Per-resource failures
/// during orchestration are never surfaced through this type; they are
/// recorded into the job's error list and read back via `status()`.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_jobs")
        key: Option<String>,
    },

    /// Admission refused: the registry already holds `capacity` jobs
    #[error("capacity exceeded: {active} of {capacity} job slots in use")]
    CapacityExceeded {
        /// Configured global job capacity
        capacity: usize,
        /// Number of jobs currently registered
        active: usize,
    },

    /// Job mutation error (quota, invalid state)
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Unknown job identifier
    #[error("job {0} not found")]
    NotFound(JobId),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Archive-side failure
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Job mutation errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Per-job resource limit already reached
    #[error("job {id}: resource quota of {limit} already reached")]
    QuotaExceeded {
        /// The job whose quota is exhausted
        id: JobId,
        /// The configured per-job resource limit
        limit: usize,
    },

    /// Operation attempted in a state that does not allow it
    #[error("job {id}: cannot {operation} while {status:?}")]
    InvalidState {
        /// The job in an invalid state for the operation
        id: JobId,
        /// The operation that was attempted (e.g., "attach resource")
        operation: String,
        /// The status that prevents the operation
        status: Status,
    },
}

/// Per-fetch failures produced by a [`ResourceFetcher`](crate::fetcher::ResourceFetcher)
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch did not complete within the configured deadline
    #[error("timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// The deadline that was exceeded
        timeout: Duration,
    },

    /// Connection, DNS, or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The origin answered with a non-success status
    #[error("rejected with HTTP status {status}")]
    RejectedStatus {
        /// The HTTP status code returned by the origin
        status: u16,
    },

    /// The job-scoped cancellation signal fired before or during the fetch
    #[error("cancelled")]
    Cancelled,
}

/// Archive writer failures
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An entry with this name was already written (first writer wins)
    #[error("duplicate entry name: {name}")]
    DuplicateEntry {
        /// The colliding entry name
        name: String,
    },

    /// Write attempted after the archive was sealed
    #[error("archive already finalized")]
    Finalized,

    /// Underlying zip container error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while writing the container
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-resource failure recorded during orchestration
///
/// The `Display` rendering of this type is what ends up in the job's
/// human-readable error list.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The locator's file type is not on the configured allow-list
    #[error("file type {0} not allowed")]
    DisallowedType(String),

    /// The locator has no file name to derive an archive entry from
    #[error("locator has no file name segment")]
    NoFileName,

    /// The fetch itself failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The payload could not be written into the archive
    #[error(transparent)]
    Write(#[from] ArchiveError),
}

/// API error response format
///
/// Returned by API endpoints when an error occurs, with a machine-readable
/// error code, a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "job 123 not found",
///     "details": {
///       "job_id": 123
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "quota_exceeded")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - invalid input
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict - mutation attempted after start
            Error::Job(JobError::InvalidState { .. }) => 409,

            // 422 Unprocessable Entity - semantic errors
            Error::Job(JobError::QuotaExceeded { .. }) => 422,

            // 500 Internal Server Error
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable - backend at capacity or stopping
            Error::CapacityExceeded { .. } => 503,
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::CapacityExceeded { .. } => "capacity_exceeded",
            Error::Job(JobError::QuotaExceeded { .. }) => "quota_exceeded",
            Error::Job(JobError::InvalidState { .. }) => "invalid_state",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Archive(_) => "archive_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::CapacityExceeded { capacity, active } => Some(serde_json::json!({
                "capacity": capacity,
                "active": active,
            })),
            Error::NotFound(id) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Job(JobError::QuotaExceeded { id, limit }) => Some(serde_json::json!({
                "job_id": id,
                "limit": limit,
            })),
            Error::Job(JobError::InvalidState {
                id,
                operation,
                status,
            }) => Some(serde_json::json!({
                "job_id": id,
                "operation": operation,
                "status": status,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
