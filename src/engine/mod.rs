//! Task execution engine: admission control, job registry, work queue.
//!
//! The `BundleEngine` struct and its operations are organized by concern:
//! - [`job`] - Per-job state machine and fetch orchestration
//! - [`admission`] - External operations (admit, attach, status, cancel)
//! - [`queue_processor`] - Background work-queue consumer

pub(crate) mod admission;
pub(crate) mod job;
mod queue_processor;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::archive::{ArchiveStore, ZipArchiveStore};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{HttpFetcher, ResourceFetcher};
use crate::types::{Event, JobId};
use job::Job;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Capacity of the lifecycle event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The fetch-and-bundle engine
///
/// Owns the process-wide job registry, enforces the global capacity ceiling,
/// and routes admitted jobs into a bounded work queue. Wrap it in an [`Arc`]
/// to share it with the API server and background tasks.
pub struct BundleEngine {
    /// Configuration (shared with every job)
    pub(crate) config: Arc<Config>,
    /// Network seam, injected into jobs
    pub(crate) fetcher: Arc<dyn ResourceFetcher>,
    /// Archive output seam, injected into jobs
    pub(crate) archives: Arc<dyn ArchiveStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Identifier -> job; entries are added on admission, never removed
    pub(crate) registry: Mutex<HashMap<JobId, Arc<Job>>>,
    /// Monotonic job identifier source
    pub(crate) next_job_id: AtomicI64,
    /// Cleared by `shutdown()`; admissions after that are refused
    pub(crate) accepting_new: AtomicBool,
    /// Work queue producer side, bounded by `max_jobs`
    pub(crate) work_tx: mpsc::Sender<Arc<Job>>,
    /// Work queue consumer side, taken once by `start_queue_processor`
    pub(crate) work_rx: Mutex<Option<mpsc::Receiver<Arc<Job>>>>,
}

impl BundleEngine {
    /// Create an engine with the production fetcher and ZIP archive store
    ///
    /// Validates the configuration and creates the archive directory.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let archives = Arc::new(ZipArchiveStore::new(&config.archive_dir)?);
        let fetcher = Arc::new(HttpFetcher::new());

        Self::with_components(config, fetcher, archives)
    }

    /// Create an engine around caller-provided fetcher and archive store
    ///
    /// The seam for embedding and testing: any [`ResourceFetcher`] and
    /// [`ArchiveStore`] implementation can stand in for the defaults.
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn ResourceFetcher>,
        archives: Arc<dyn ArchiveStore>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (work_tx, work_rx) = mpsc::channel(config.max_jobs);

        tracing::info!(
            max_jobs = config.max_jobs,
            max_resources_per_job = config.max_resources_per_job,
            "Engine initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            archives,
            event_tx,
            registry: Mutex::new(HashMap::new()),
            next_job_id: AtomicI64::new(1),
            accepting_new: AtomicBool::new(true),
            work_tx,
            work_rx: Mutex::new(Some(work_rx)),
        })
    }

    pub(crate) fn lock_registry(&self) -> MutexGuard<'_, HashMap<JobId, Arc<Job>>> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Subscribe to job lifecycle events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber that falls far behind observes a
    /// `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration (cheap Arc clone)
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Stop admissions and cancel every non-terminal job
    ///
    /// Idempotent. Jobs already terminal keep their outcome; everything else
    /// transitions to `Failed` through the normal cancellation path.
    pub async fn shutdown(&self) -> Result<()> {
        let first = self
            .accepting_new
            .swap(false, std::sync::atomic::Ordering::SeqCst);
        if first {
            tracing::info!("Shutdown initiated; cancelling active jobs");
        }

        let jobs: Vec<Arc<Job>> = self.lock_registry().values().cloned().collect();
        for job in jobs {
            job.cancel();
        }

        self.emit_event(Event::Shutdown);
        Ok(())
    }

    /// Spawn the REST API server in a background task
    ///
    /// Takes an owned handle; callers holding an `Arc` clone it cheaply.
    pub fn spawn_api_server(self: Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let config = self.get_config();

        tokio::spawn(async move { crate::api::start_api_server(self, config).await })
    }
}
