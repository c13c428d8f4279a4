//! Resource fetching over HTTP
//!
//! The [`ResourceFetcher`] trait is the engine's seam to the network: one
//! call fetches one resource under a fixed deadline and a job-scoped
//! cancellation signal. [`HttpFetcher`] is the production implementation on
//! top of `reqwest`; tests substitute their own stub.

use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fetches a single remote resource
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `locator`, bounded by `timeout` and `cancel`
    ///
    /// Returns the full payload on success. The deadline covers the whole
    /// transfer including the body. Cancellation is honored promptly: when
    /// the token fires before or during the fetch, the call returns
    /// [`FetchError::Cancelled`] without completing the transfer.
    async fn fetch(
        &self,
        locator: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError>;
}

/// HTTP fetcher backed by a shared `reqwest` client
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(
        &self,
        locator: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let transfer = async {
            let response = self
                .client
                .get(locator)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::RejectedStatus {
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            Ok(body.to_vec())
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = tokio::time::timeout(timeout, transfer) => match result {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout { timeout }),
            },
        }
    }
}
