//! Per-job state machine and fetch orchestration.

use crate::archive::{ArchiveStore, JobArchive};
use crate::config::Config;
use crate::error::{ArchiveError, FetchError, JobError, ResourceError};
use crate::fetcher::ResourceFetcher;
use crate::types::{Event, JobId, JobSnapshot, Status};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Mutable job fields, guarded by one lock
///
/// Every read and write of status/resources/errors/result_location goes
/// through this struct, so a snapshot is never torn.
pub(crate) struct JobState {
    pub(crate) status: Status,
    pub(crate) resources: Vec<String>,
    pub(crate) errors: Vec<String>,
    pub(crate) result_location: Option<String>,
}

/// Result of attaching a resource to a pending job
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AttachOutcome {
    /// Attached; quota not yet reached
    Accepted,
    /// Attached and the per-job quota is now full; orchestration should start
    QuotaReached,
}

/// One unit of work: a bounded set of resource locators mapped to one archive
pub(crate) struct Job {
    id: JobId,
    created_at: DateTime<Utc>,
    config: Arc<Config>,
    fetcher: Arc<dyn ResourceFetcher>,
    archives: Arc<dyn ArchiveStore>,
    event_tx: tokio::sync::broadcast::Sender<Event>,
    state: Mutex<JobState>,
    /// Job-scoped cancellation signal, passed explicitly into every fetch
    cancel: CancellationToken,
    /// Wakes the queue consumer once this job leaves `Pending`
    trigger: Notify,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        config: Arc<Config>,
        fetcher: Arc<dyn ResourceFetcher>,
        archives: Arc<dyn ArchiveStore>,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            config,
            fetcher,
            archives,
            event_tx,
            state: Mutex::new(JobState {
                status: Status::Pending,
                resources: Vec::new(),
                errors: Vec::new(),
                result_location: None,
            }),
            cancel: CancellationToken::new(),
            trigger: Notify::new(),
        }
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        // The lock is never held across an await point; poisoning can only
        // come from a panicking reader and leaves the state usable.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, event: Event) {
        // send() fails when no one subscribes, which is fine
        self.event_tx.send(event).ok();
    }

    /// Append a locator; valid only while the job is `Pending`
    pub(crate) fn attach(&self, locator: &str) -> Result<AttachOutcome, JobError> {
        let mut state = self.lock_state();

        if state.status != Status::Pending {
            return Err(JobError::InvalidState {
                id: self.id,
                operation: "attach resource".to_string(),
                status: state.status,
            });
        }

        let limit = self.config.max_resources_per_job;
        if state.resources.len() >= limit {
            return Err(JobError::QuotaExceeded { id: self.id, limit });
        }

        state.resources.push(locator.to_string());

        if state.resources.len() == limit {
            Ok(AttachOutcome::QuotaReached)
        } else {
            Ok(AttachOutcome::Accepted)
        }
    }

    /// Coherent point-in-time view of the job
    pub(crate) fn snapshot(&self) -> JobSnapshot {
        let state = self.lock_state();
        JobSnapshot {
            id: self.id,
            status: state.status,
            resources: state.resources.clone(),
            errors: state.errors.clone(),
            result_location: state.result_location.clone(),
            created_at: self.created_at,
        }
    }

    /// Start orchestration; a one-way gate
    ///
    /// The `Pending -> Running` transition happens under the lock, so of two
    /// concurrent callers exactly one runs the orchestration; the other (and
    /// any call on a terminal job) observes a no-op.
    pub(crate) async fn start(self: Arc<Self>) {
        let begun = {
            let mut state = self.lock_state();
            if state.status == Status::Pending {
                state.status = Status::Running;
                true
            } else {
                false
            }
        };

        // Wake the queue consumer whether or not we won the gate
        self.trigger.notify_waiters();

        if begun {
            self.run().await;
        }
    }

    /// Signal cancellation and force `Failed` unless already terminal
    ///
    /// Idempotent. In-flight fetches observe the token at their next
    /// checkpoint; entries already written are not rolled back.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();

        let newly_cancelled = {
            let mut state = self.lock_state();
            if state.status.is_terminal() {
                false
            } else {
                state.status = Status::Failed;
                true
            }
        };

        if newly_cancelled {
            tracing::info!(job_id = %self.id, "Job cancelled");
            self.emit(Event::JobCancelled { id: self.id });
        }

        self.trigger.notify_waiters();
    }

    /// Wait until this job leaves `Pending` (quota reached, explicit start,
    /// or cancellation). Used by the queue consumer.
    pub(crate) async fn wait_for_trigger(&self) {
        loop {
            let notified = self.trigger.notified();
            if self.lock_state().status != Status::Pending {
                return;
            }
            notified.await;
        }
    }

    /// Fetch every attached resource concurrently and seal the archive
    async fn run(self: Arc<Self>) {
        let resources = self.lock_state().resources.clone();

        tracing::info!(
            job_id = %self.id,
            resources = resources.len(),
            "Job orchestration started"
        );
        self.emit(Event::JobStarted { id: self.id });

        let archive = match self.archives.create(self.id) {
            Ok(archive) => archive,
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "Failed to create archive");
                self.lock_state().errors.push(format!("archive: {}", e));
                self.finish(None);
                return;
            }
        };

        let mut tasks = JoinSet::new();
        for locator in resources {
            let job = Arc::clone(&self);
            let archive = Arc::clone(&archive);
            tasks.spawn(async move { job.process_resource(&archive, locator).await });
        }

        // Join every per-resource task before evaluating the outcome
        while tasks.join_next().await.is_some() {}

        // Seal the container exactly once, successful entries or not
        let sealed = {
            let archive = Arc::clone(&archive);
            tokio::task::spawn_blocking(move || archive.finalize())
                .await
                .map_err(|e| {
                    ArchiveError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
                })
                .and_then(|result| result)
        };
        let location = match sealed {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "Failed to finalize archive");
                self.lock_state().errors.push(format!("archive: {}", e));
                None
            }
        };

        self.finish(location);
    }

    /// One resource: cancellation checkpoint, type validation, fetch, write
    ///
    /// Failures are recorded and never abort sibling resources. A fetch
    /// aborted by cancellation records nothing.
    async fn process_resource(&self, archive: &Arc<dyn JobArchive>, locator: String) {
        if self.cancel.is_cancelled() {
            tracing::debug!(job_id = %self.id, locator = %locator, "Skipping fetch: job cancelled");
            return;
        }

        let name = match entry_name(&locator) {
            Some(name) => name,
            None => {
                self.record_resource_failure(&locator, ResourceError::NoFileName);
                return;
            }
        };

        let ext = extension_of(&name).unwrap_or("(none)");
        if !self.config.is_allowed_extension(ext) {
            self.record_resource_failure(&locator, ResourceError::DisallowedType(ext.to_string()));
            return;
        }

        match self
            .fetcher
            .fetch(&locator, self.config.fetch_timeout, &self.cancel)
            .await
        {
            Ok(payload) => {
                tracing::debug!(
                    job_id = %self.id,
                    entry = %name,
                    bytes = payload.len(),
                    "Fetched resource"
                );
                if let Err(e) = write_entry(archive, name, payload).await {
                    self.record_resource_failure(&locator, ResourceError::Write(e));
                }
            }
            Err(FetchError::Cancelled) => {
                tracing::debug!(job_id = %self.id, locator = %locator, "Fetch cancelled");
            }
            Err(e) => {
                self.record_resource_failure(&locator, ResourceError::Fetch(e));
            }
        }
    }

    fn record_resource_failure(&self, locator: &str, error: ResourceError) {
        tracing::warn!(job_id = %self.id, locator = %locator, error = %error, "Resource failed");

        let description = format!("{}: {}", locator, error);
        self.lock_state().errors.push(description.clone());
        self.emit(Event::ResourceFailed {
            id: self.id,
            locator: locator.to_string(),
            error: description,
        });
    }

    /// Apply the terminal outcome under the lock
    ///
    /// A concurrent `cancel()` may have already forced `Failed`; the lock
    /// decides the winner and a terminal status is never overwritten.
    fn finish(&self, location: Option<String>) {
        let event = {
            let mut state = self.lock_state();
            if state.status != Status::Running {
                return;
            }

            if state.errors.is_empty() && location.is_some() {
                state.status = Status::Completed;
                state.result_location = location.clone();
                Event::JobCompleted {
                    id: self.id,
                    result_location: location.unwrap_or_default(),
                }
            } else {
                state.status = Status::Failed;
                Event::JobFailed {
                    id: self.id,
                    error_count: state.errors.len(),
                }
            }
        };

        match &event {
            Event::JobCompleted {
                result_location, ..
            } => {
                tracing::info!(job_id = %self.id, result_location = %result_location, "Job completed");
            }
            _ => {
                tracing::info!(job_id = %self.id, "Job failed");
            }
        }

        self.emit(event);
    }
}

/// Append one entry; compression and file I/O run on the blocking pool so
/// they never stall sibling fetch tasks on the async workers
async fn write_entry(
    archive: &Arc<dyn JobArchive>,
    name: String,
    payload: Vec<u8>,
) -> Result<(), ArchiveError> {
    let archive = Arc::clone(archive);
    tokio::task::spawn_blocking(move || archive.add_entry(&name, &payload))
        .await
        .map_err(|e| ArchiveError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

/// Derive the archive entry name from a locator's final path segment
pub(crate) fn entry_name(locator: &str) -> Option<String> {
    let url = Url::parse(locator).ok()?;
    let name = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(name.to_string())
}

/// The dot-prefixed extension of a file name, if any
pub(crate) fn extension_of(name: &str) -> Option<&str> {
    name.rfind('.').map(|idx| &name[idx..])
}
