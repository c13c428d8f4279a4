//! Core types for bundle-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job status
///
/// Transitions are strictly forward: `Pending` → `Running` →
/// (`Completed` | `Failed`), with `Cancel` forcing `Failed` from any
/// non-terminal state. Terminal states are never left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Admitted, accepting resources, orchestration not started
    Pending,
    /// Orchestration in progress
    Running,
    /// All resources fetched and archived without error
    Completed,
    /// At least one resource failed, or the job was cancelled
    Failed,
}

impl Status {
    /// Whether this status is terminal (no transition leaves it)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

/// Coherent point-in-time view of a job
///
/// Produced under the job's lock, so the field combination is never torn:
/// `result_location` is present exactly when `status` is `Completed`, and a
/// non-empty `errors` list never accompanies `Completed`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Unique job identifier
    pub id: JobId,

    /// Current lifecycle status
    pub status: Status,

    /// Locators attached so far, in attachment order
    pub resources: Vec<String>,

    /// Per-resource failure descriptions, in completion order
    pub errors: Vec<String>,

    /// Address of the produced archive (set only when `Completed`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_location: Option<String>,

    /// When the job was admitted
    pub created_at: DateTime<Utc>,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job admitted into the registry
    JobAdmitted {
        /// Job ID
        id: JobId,
    },

    /// Resource locator attached to a pending job
    ResourceAttached {
        /// Job ID
        id: JobId,
        /// The attached locator
        locator: String,
    },

    /// Orchestration started
    JobStarted {
        /// Job ID
        id: JobId,
    },

    /// One resource failed during orchestration (siblings continue)
    ResourceFailed {
        /// Job ID
        id: JobId,
        /// The failing locator
        locator: String,
        /// Human-readable failure description
        error: String,
    },

    /// Job finished with every resource archived
    JobCompleted {
        /// Job ID
        id: JobId,
        /// Address of the produced archive
        result_location: String,
    },

    /// Job finished with at least one failure; no archive published
    JobFailed {
        /// Job ID
        id: JobId,
        /// Number of recorded per-resource failures
        error_count: usize,
    },

    /// Job cancelled by the caller
    JobCancelled {
        /// Job ID
        id: JobId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}
