//! External engine operations: admit, attach, status, start, cancel.

use super::job::{AttachOutcome, Job};
use super::BundleEngine;
use crate::error::{Error, Result};
use crate::types::{Event, JobId, JobSnapshot};
use std::sync::atomic::Ordering;
use std::sync::Arc;

impl BundleEngine {
    /// Admit a new job against the global capacity ceiling
    ///
    /// Fails with [`Error::CapacityExceeded`] when the registry is full
    /// (admission is refused, never queued) and [`Error::ShuttingDown`]
    /// after [`shutdown`](Self::shutdown). On success the job starts in
    /// `Pending`, is registered, and is pushed onto the work queue.
    pub fn admit(&self) -> Result<JobId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let job = {
            let mut registry = self.lock_registry();

            if registry.len() >= self.config.max_jobs {
                return Err(Error::CapacityExceeded {
                    capacity: self.config.max_jobs,
                    active: registry.len(),
                });
            }

            let id = JobId(self.next_job_id.fetch_add(1, Ordering::SeqCst));
            let job = Arc::new(Job::new(
                id,
                Arc::clone(&self.config),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.archives),
                self.event_tx.clone(),
            ));
            registry.insert(id, Arc::clone(&job));
            job
        };

        let id = job.id();

        // The registry never shrinks and the queue capacity equals the
        // registry capacity, so the queue always has room for an admitted
        // job. Closed can only happen once the consumer side is gone.
        if let Err(e) = self.work_tx.try_send(job) {
            tracing::error!(job_id = %id, error = %e, "Failed to enqueue admitted job");
            self.lock_registry().remove(&id);
            return Err(Error::ShuttingDown);
        }

        tracing::info!(job_id = %id, "Job admitted");
        self.emit_event(Event::JobAdmitted { id });

        Ok(id)
    }

    /// Look up a job handle by identifier
    pub(crate) fn lookup(&self, id: JobId) -> Result<Arc<Job>> {
        self.lock_registry()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    /// Attach a resource locator to a pending job
    ///
    /// Fails with [`Error::NotFound`] for unknown jobs, `InvalidState` once
    /// the job has left `Pending`, and `QuotaExceeded` at the per-job limit.
    /// Reaching the quota triggers the job's orchestration.
    pub fn attach_resource(&self, id: JobId, locator: &str) -> Result<()> {
        let job = self.lookup(id)?;
        let outcome = job.attach(locator)?;

        tracing::debug!(job_id = %id, locator = %locator, "Resource attached");
        self.emit_event(Event::ResourceAttached {
            id,
            locator: locator.to_string(),
        });

        if outcome == AttachOutcome::QuotaReached {
            tracing::info!(job_id = %id, "Resource quota reached; starting orchestration");
            tokio::spawn(job.start());
        }

        Ok(())
    }

    /// Explicitly start a job that has not reached its resource quota
    ///
    /// Idempotent: starting a job that is already `Running` or terminal is
    /// a no-op. Not routed by the HTTP surface; quota-reached jobs start on
    /// their own.
    pub fn start(&self, id: JobId) -> Result<()> {
        let job = self.lookup(id)?;
        tokio::spawn(job.start());
        Ok(())
    }

    /// Snapshot a job's status, result location, and error list
    ///
    /// Never blocks on orchestration and never returns a torn combination
    /// of fields.
    pub fn status(&self, id: JobId) -> Result<JobSnapshot> {
        Ok(self.lookup(id)?.snapshot())
    }

    /// Cancel a job
    ///
    /// Idempotent. Signals the job-scoped cancellation token (aborting
    /// in-flight and not-yet-started fetches) and forces `Failed` unless the
    /// job is already terminal. Archive entries already written are not
    /// rolled back.
    pub fn cancel(&self, id: JobId) -> Result<()> {
        self.lookup(id)?.cancel();
        Ok(())
    }
}
