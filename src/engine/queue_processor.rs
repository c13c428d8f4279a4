//! Queue processor — the single background consumer of the work queue.

use super::BundleEngine;

impl BundleEngine {
    /// Start the work-queue consumer task
    ///
    /// A single long-lived task drains the queue in admission order. For
    /// each dequeued job it waits for the job's start trigger (resource
    /// quota reached, explicit start, or cancellation) and then invokes the
    /// orchestration entry point — a no-op for jobs whose orchestration
    /// already began because their quota was reached first.
    ///
    /// The queue decouples "admitted" from "started": resources can be
    /// attached to a job after admission and before orchestration, and the
    /// bounded channel caps admitted-but-unstarted work at the global
    /// capacity.
    ///
    /// Calling this more than once returns an immediately-finished handle;
    /// the receiver can only be taken once.
    pub fn start_queue_processor(&self) -> tokio::task::JoinHandle<()> {
        let receiver = {
            let mut slot = match self.work_rx.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };

        let Some(mut rx) = receiver else {
            tracing::warn!("Queue processor already started");
            return tokio::spawn(async {});
        };

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let id = job.id();
                tracing::debug!(job_id = %id, "Dequeued job; waiting for start trigger");

                job.wait_for_trigger().await;
                // No-op when the quota path already started this job, or
                // when cancellation made it terminal while still pending.
                job.start().await;
            }

            tracing::debug!("Work queue closed; queue processor exiting");
        })
    }
}
