//! Submission and follow outcomes
//!
//! Outcomes are plain values handed back to the caller. Timeouts and polling
//! failures are not errors: the caller decides what to do with a job that
//! never started or stopped making progress.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobHandle, JobStatus};

/// Result of submitting a job to the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// The control plane accepted the job
    Accepted { submission_id: String },
    /// The control plane refused the job; not retried
    Rejected { http_status: u16, message: String },
    /// The request never got a usable answer, even after retries
    TransportFailure { message: String },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_accepted()
    }

    /// The submission identifier, if accepted
    pub fn submission_id(&self) -> Option<&str> {
        match self {
            Self::Accepted { submission_id } => Some(submission_id),
            _ => None,
        }
    }

    /// Build the polling handle for an accepted submission
    ///
    /// Returns `None` for rejected or failed submissions, so a job that was
    /// not accepted can never be followed through this path.
    pub fn into_handle(
        self,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Option<JobHandle> {
        match self {
            Self::Accepted { submission_id } => {
                Some(JobHandle::new(name, namespace, submission_id))
            }
            _ => None,
        }
    }

    /// Flatten into `(status, error, submission_id)`
    ///
    /// `status` is 200 for accepted submissions, the HTTP status for
    /// rejections and 0 when no response was received.
    pub fn into_parts(self) -> (u16, String, String) {
        match self {
            Self::Accepted { submission_id } => (200, String::new(), submission_id),
            Self::Rejected {
                http_status,
                message,
            } => (http_status, message, String::new()),
            Self::TransportFailure { message } => (0, message, String::new()),
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted { submission_id } => write!(f, "accepted (submission id {submission_id})"),
            Self::Rejected {
                http_status,
                message,
            } => write!(f, "rejected with status {http_status}: {message}"),
            Self::TransportFailure { message } => write!(f, "transport failure: {message}"),
        }
    }
}

/// Result of following a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowOutcome {
    /// The job reached a terminal status
    Completed {
        final_status: JobStatus,
        message: Option<String>,
    },
    /// The job never left `Pending`/`Unknown` within the readiness budget
    ReadinessTimeout {
        waited: Duration,
        last_status: Option<JobStatus>,
    },
    /// The job was running but produced no output or status change
    StalenessTimeout {
        idle: Duration,
        last_status: JobStatus,
    },
    /// Status could not be read for a whole timeout window
    PollingError {
        message: String,
        last_status: Option<JobStatus>,
    },
    /// The caller aborted the follow
    Cancelled { last_status: Option<JobStatus> },
}

impl FollowOutcome {
    /// Anything other than a successful completion
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            Self::Completed {
                final_status: JobStatus::Succeeded,
                ..
            }
        )
    }

    /// Last status observed before the follow ended
    pub fn last_status(&self) -> Option<JobStatus> {
        match self {
            Self::Completed { final_status, .. } => Some(*final_status),
            Self::StalenessTimeout { last_status, .. } => Some(*last_status),
            Self::ReadinessTimeout { last_status, .. }
            | Self::PollingError { last_status, .. }
            | Self::Cancelled { last_status } => *last_status,
        }
    }
}

impl fmt::Display for FollowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed {
                final_status,
                message,
            } => {
                write!(f, "job completed with status {final_status}")?;
                if let Some(message) = message {
                    write!(f, ": {message}")?;
                }
                Ok(())
            }
            Self::ReadinessTimeout {
                waited,
                last_status,
            } => write!(
                f,
                "job did not start within {}s (last status {})",
                waited.as_secs(),
                status_or_none(*last_status)
            ),
            Self::StalenessTimeout { idle, last_status } => write!(
                f,
                "job produced no output or status change for {}s (last status {last_status})",
                idle.as_secs()
            ),
            Self::PollingError {
                message,
                last_status,
            } => write!(
                f,
                "unable to read job status: {message} (last status {})",
                status_or_none(*last_status)
            ),
            Self::Cancelled { last_status } => write!(
                f,
                "follow cancelled (last status {})",
                status_or_none(*last_status)
            ),
        }
    }
}

fn status_or_none(status: Option<JobStatus>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}
