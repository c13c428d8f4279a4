//! Shared test helpers for constructing engines with stubbed fetchers.

use crate::archive::ZipArchiveStore;
use crate::config::Config;
use crate::engine::BundleEngine;
use crate::error::FetchError;
use crate::fetcher::ResourceFetcher;
use crate::types::{JobId, JobSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scripted outcome for one locator
pub(crate) enum StubOutcome {
    /// Return this payload
    Ok(Vec<u8>),
    /// Fail with `FetchError::Timeout`
    Timeout,
    /// Fail with `FetchError::RejectedStatus`
    Rejected(u16),
    /// Fail with `FetchError::Transport`
    Transport,
    /// Block until the cancellation token fires, then report `Cancelled`
    HangUntilCancelled,
}

/// In-memory fetcher scripted per locator; unknown locators get a transport
/// error. Records every locator it is asked to fetch.
pub(crate) struct StubFetcher {
    outcomes: Mutex<HashMap<String, StubOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn stub(&self, locator: &str, outcome: StubOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(locator.to_string(), outcome);
    }

    /// Locators fetched so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceFetcher for StubFetcher {
    async fn fetch(
        &self,
        locator: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(locator.to_string());

        // Taking the outcome out keeps FetchError non-Clone friendly;
        // each locator is fetched at most once per job anyway.
        let outcome = self.outcomes.lock().unwrap().remove(locator);

        match outcome {
            Some(StubOutcome::Ok(payload)) => Ok(payload),
            Some(StubOutcome::Timeout) => Err(FetchError::Timeout { timeout }),
            Some(StubOutcome::Rejected(status)) => Err(FetchError::RejectedStatus { status }),
            Some(StubOutcome::Transport) | None => {
                Err(FetchError::Transport("connection refused".to_string()))
            }
            Some(StubOutcome::HangUntilCancelled) => {
                cancel.cancelled().await;
                Err(FetchError::Cancelled)
            }
        }
    }
}

/// Config suitable for tests: small limits, `.txt` only, tempdir archives
pub(crate) fn test_config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.max_jobs = 3;
    config.max_resources_per_job = 3;
    config.allowed_extensions = vec![".txt".to_string()];
    config.fetch_timeout = Duration::from_secs(5);
    config.archive_dir = dir.path().join("archives");
    config
}

/// Engine over a stub fetcher and a real ZIP store inside a tempdir.
/// The tempdir must be kept alive by the caller.
pub(crate) fn create_test_engine(
    config: Config,
    fetcher: Arc<StubFetcher>,
) -> (Arc<BundleEngine>, tokio::task::JoinHandle<()>) {
    let archives = Arc::new(ZipArchiveStore::new(&config.archive_dir).unwrap());
    let engine = Arc::new(BundleEngine::with_components(config, fetcher, archives).unwrap());
    let processor = engine.start_queue_processor();
    (engine, processor)
}

/// Poll a job until it reaches a terminal status
pub(crate) async fn wait_for_terminal(engine: &BundleEngine, id: JobId) -> JobSnapshot {
    for _ in 0..500 {
        let snapshot = engine.status(id).unwrap();
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal status in time", id);
}

/// Poll a job until a predicate on its snapshot holds
pub(crate) async fn wait_for_snapshot(
    engine: &BundleEngine,
    id: JobId,
    predicate: impl Fn(&JobSnapshot) -> bool,
) -> JobSnapshot {
    for _ in 0..500 {
        let snapshot = engine.status(id).unwrap();
        if predicate(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never matched the expected snapshot", id);
}
