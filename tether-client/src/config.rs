//! Orchestrator configuration
//!
//! Retry, timeout and polling settings used by the submitter and the
//! follower. Settings are read from the driver's "additional parameters"
//! JSON mapping; missing keys fall back to the defaults below.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{ClientError, Result};
use crate::follow::FollowSettings;
use crate::retry::{DEFAULT_HTTP_RETRIES, DEFAULT_WAIT_INTERVAL, RetryPolicy};

/// Default staleness timeout ("print timeout")
pub const DEFAULT_PRINT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default readiness timeout ("job ready timeout")
pub const DEFAULT_JOB_READY_TIMEOUT: Duration = Duration::from_secs(600);

/// Default interval between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default deadline for a single HTTP call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Total submission attempts
    pub http_retries: u32,

    /// Wait between submission attempts
    pub wait_interval: Duration,

    /// Maximum time a running job may go without output or status change
    pub print_timeout: Duration,

    /// Maximum time between submission and the job starting
    pub job_ready_timeout: Duration,

    /// Interval between status polls
    pub poll_interval: Duration,

    /// Deadline for any single HTTP call
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            http_retries: DEFAULT_HTTP_RETRIES,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            print_timeout: DEFAULT_PRINT_TIMEOUT,
            job_ready_timeout: DEFAULT_JOB_READY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    /// Creates configuration from an additional-parameters mapping
    ///
    /// Recognized keys (all durations in seconds):
    /// - http_retries (default: 5)
    /// - wait_interval (default: 2)
    /// - wait_print_tmout (default: 120)
    /// - wait_job_ready_tmout (default: 600)
    /// - poll_interval (default: 5)
    /// - request_timeout (default: 30)
    ///
    /// Other keys are ignored.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self> {
        let defaults = Self::default();

        let http_retries = match params.get("http_retries") {
            Some(value) => {
                let retries = as_u64("http_retries", value)?;
                u32::try_from(retries).map_err(|_| {
                    ClientError::InvalidConfig(format!("http_retries out of range: {retries}"))
                })?
            }
            None => defaults.http_retries,
        };

        Ok(Self {
            http_retries,
            wait_interval: seconds(params, "wait_interval", defaults.wait_interval)?,
            print_timeout: seconds(params, "wait_print_tmout", defaults.print_timeout)?,
            job_ready_timeout: seconds(params, "wait_job_ready_tmout", defaults.job_ready_timeout)?,
            poll_interval: seconds(params, "poll_interval", defaults.poll_interval)?,
            request_timeout: seconds(params, "request_timeout", defaults.request_timeout)?,
        })
    }

    /// Parses a JSON object string and builds the configuration from it
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ClientError::InvalidConfig(format!("invalid JSON: {}", e)))?;

        match value {
            Value::Object(params) => Self::from_params(&params),
            other => Err(ClientError::InvalidConfig(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.http_retries == 0 {
            return Err(ClientError::InvalidConfig(
                "http_retries must be greater than 0".into(),
            ));
        }

        for (name, value) in [
            ("wait_interval", self.wait_interval),
            ("wait_print_tmout", self.print_timeout),
            ("wait_job_ready_tmout", self.job_ready_timeout),
            ("poll_interval", self.poll_interval),
            ("request_timeout", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ClientError::InvalidConfig(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Retry policy for submissions
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.http_retries, self.wait_interval)
    }

    /// Settings for following a submitted job
    pub fn follow_settings(&self) -> FollowSettings {
        FollowSettings {
            readiness_timeout: self.job_ready_timeout,
            staleness_timeout: self.print_timeout,
            poll_interval: self.poll_interval,
            request_timeout: self.request_timeout,
        }
    }
}

fn as_u64(key: &str, value: &Value) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| {
            ClientError::InvalidConfig(format!(
                "{} must be a non-negative integer, got {}",
                key, value
            ))
        })
}

fn seconds(params: &Map<String, Value>, key: &str, default: Duration) -> Result<Duration> {
    params
        .get(key)
        .map(|value| as_u64(key, value).map(Duration::from_secs))
        .unwrap_or(Ok(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.http_retries, 5);
        assert_eq!(config.wait_interval, Duration::from_secs(2));
        assert_eq!(config.print_timeout, Duration::from_secs(120));
        assert_eq!(config.job_ready_timeout, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_params_overrides_and_ignores_unknown_keys() {
        let params = json!({
            "http_retries": 3,
            "wait_interval": 1,
            "wait_job_ready_tmout": "5",
            "s3_bucket": "unrelated"
        });

        let config = OrchestratorConfig::from_params(params.as_object().unwrap()).unwrap();
        assert_eq!(config.http_retries, 3);
        assert_eq!(config.wait_interval, Duration::from_secs(1));
        assert_eq!(config.job_ready_timeout, Duration::from_secs(5));
        assert_eq!(config.print_timeout, DEFAULT_PRINT_TIMEOUT);
    }

    #[test]
    fn test_from_params_rejects_bad_values() {
        let params = json!({ "wait_print_tmout": "soon" });
        let err = OrchestratorConfig::from_params(params.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("wait_print_tmout"));

        let params = json!({ "http_retries": -1 });
        assert!(OrchestratorConfig::from_params(params.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_from_json() {
        let config = OrchestratorConfig::from_json("{}").unwrap();
        assert_eq!(config, OrchestratorConfig::default());

        assert!(OrchestratorConfig::from_json("[1, 2]").is_err());
        assert!(OrchestratorConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());

        config.http_retries = 0;
        assert!(config.validate().is_err());

        config.http_retries = 1;
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.poll_interval = Duration::from_secs(1);
        assert!(config.validate().is_ok());

        config.wait_interval = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("wait_interval"));
    }

    #[test]
    fn test_follow_settings_mapping() {
        let config = OrchestratorConfig {
            print_timeout: Duration::from_secs(30),
            job_ready_timeout: Duration::from_secs(90),
            ..Default::default()
        };

        let settings = config.follow_settings();
        assert_eq!(settings.staleness_timeout, Duration::from_secs(30));
        assert_eq!(settings.readiness_timeout, Duration::from_secs(90));
    }
}
