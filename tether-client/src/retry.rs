//! Bounded retry with backoff
//!
//! Transport errors and 5xx answers are retried. Any other answer, including
//! 4xx, is handed back on the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{ClientError, Result};

/// Default number of attempts for a retried request
pub const DEFAULT_HTTP_RETRIES: u32 = 5;

/// Default wait between attempts
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(2);

/// Status code and body of an HTTP answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// How a request is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_retries: u32,
    /// Wait between two attempts
    pub wait_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_RETRIES, DEFAULT_WAIT_INTERVAL)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, wait_interval: Duration) -> Self {
        Self {
            max_retries,
            wait_interval,
        }
    }

    /// Wait before the attempt following `attempt` (1-based)
    ///
    /// Constant for now; a growing schedule only needs to change this.
    pub fn delay_after(&self, _attempt: u32) -> Duration {
        self.wait_interval
    }

    /// Run `attempt` until it yields a non-retriable answer or the attempts
    /// are used up
    ///
    /// `attempt` resolves to the HTTP answer, or to a transport error
    /// message. Exhausting the attempts yields
    /// [`ClientError::TransportFailure`] carrying the last error.
    pub async fn run<F, Fut>(&self, label: &str, mut attempt: F) -> Result<HttpReply>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<HttpReply, String>>,
    {
        let max_attempts = self.max_retries.max(1);
        let mut last_error = String::new();

        for n in 1..=max_attempts {
            debug!("{}: attempt {}/{}", label, n, max_attempts);

            match attempt().await {
                Ok(reply) if reply.is_server_error() => {
                    last_error = format!("server error {}: {}", reply.status, reply.body);
                }
                Ok(reply) => return Ok(reply),
                Err(e) => last_error = e,
            }

            if n < max_attempts {
                let delay = self.delay_after(n);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label, n, max_attempts, last_error, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        error!(
            "{} failed after {} attempt(s): {}",
            label, max_attempts, last_error
        );
        Err(ClientError::TransportFailure {
            attempts: max_attempts,
            message: last_error,
        })
    }
}
