//! Tether HTTP Client
//!
//! Client side of a remote job-submission API: submit a job with bounded
//! retries, then follow it to a terminal state while tailing its output.
//!
//! # Example
//!
//! ```no_run
//! use tether_client::{JobManagerClient, OrchestratorConfig, TracingSink};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OrchestratorConfig::default();
//!     let client = JobManagerClient::with_config("http://localhost:8888", &config)?;
//!
//!     let outcome = client
//!         .submit_job("docq-run", "kubeflow", Default::default(), "launcher.py")
//!         .await;
//!     let Some(handle) = outcome.into_handle("docq-run", "kubeflow") else {
//!         anyhow::bail!("submission failed");
//!     };
//!
//!     let result = client
//!         .follow_execution(
//!             &handle,
//!             config.print_timeout,
//!             config.job_ready_timeout,
//!             &TracingSink,
//!             &CancellationToken::new(),
//!         )
//!         .await;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod follow;
mod jobs;
pub mod retry;
pub mod sink;

// Re-export commonly used types
pub use api::JobApi;
pub use config::OrchestratorConfig;
pub use error::{ClientError, Result};
pub use follow::{ExecutionFollower, FollowSettings};
pub use retry::{HttpReply, RetryPolicy};
pub use sink::{MemorySink, OutputSink, TracingSink};
pub use tether_core::domain::job::{JobHandle, JobInfo, JobStatus};
pub use tether_core::domain::outcome::{FollowOutcome, SubmissionOutcome};

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the job-submission API
///
/// Holds only immutable configuration and a reusable connection pool, so a
/// single client can be cloned and shared across concurrent follows.
#[derive(Debug, Clone)]
pub struct JobManagerClient {
    /// Base URL of the API server (e.g., "http://localhost:8888")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Retry policy for submissions
    retry: RetryPolicy,
    /// Deadline applied to every single HTTP call
    request_timeout: Duration,
    /// Poll interval and call deadline used by `follow_execution`, plus
    /// the configured default budgets
    follow_settings: FollowSettings,
}

impl JobManagerClient {
    /// Create a new client with default settings
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API server
    ///
    /// # Example
    /// ```
    /// use tether_client::JobManagerClient;
    ///
    /// let client = JobManagerClient::new("http://localhost:8888");
    /// assert_eq!(client.base_url(), "http://localhost:8888");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new(), &OrchestratorConfig::default())
    }

    /// Create a new client from validated orchestrator configuration
    pub fn with_config(base_url: impl Into<String>, config: &OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_client(base_url, Client::new(), config))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc. The per-call
    /// deadline from `config` is applied on top of the client's own settings.
    pub fn with_client(
        base_url: impl Into<String>,
        client: Client,
        config: &OrchestratorConfig,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry: config.retry_policy(),
            request_timeout: config.request_timeout,
            follow_settings: config.follow_settings(),
        }
    }

    /// Get the base URL of the API server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the retry policy used for submissions
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Get the settings used by `follow_execution`
    pub fn follow_settings(&self) -> &FollowSettings {
        &self.follow_settings
    }

    /// Base path of the submissions of one cluster
    fn submissions_url(&self, namespace: &str, name: &str) -> String {
        format!(
            "{}/apis/v1/namespaces/{}/jobsubmissions/{}",
            self.base_url, namespace, name
        )
    }

    // =============================================================================
    // Request Execution
    // =============================================================================

    /// Send a request built by `build`, retrying per the retry policy
    ///
    /// The body is read eagerly so that body read failures count as
    /// transport failures.
    async fn send_with_retries<F>(&self, label: &str, build: F) -> Result<HttpReply>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let build = &build;
        let client = &self.client;
        let timeout = self.request_timeout;

        self.retry
            .run(label, move || async move {
                let response = build(client)
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| e.to_string())?;
                let status = response.status().as_u16();
                let body = response.text().await.map_err(|e| e.to_string())?;
                Ok::<_, String>(HttpReply { status, body })
            })
            .await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content we care about
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}
