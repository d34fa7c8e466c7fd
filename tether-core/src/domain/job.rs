//! Job domain types

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a live remote job
///
/// The handle is the polling key for the status and log endpoints. On the
/// driver path it is only produced from an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Logical job (cluster) name
    pub name: String,
    /// Namespace the job was submitted to
    pub namespace: String,
    /// Identifier returned by the control plane on submission
    pub submission_id: String,
}

impl JobHandle {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        submission_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            submission_id: submission_id.into(),
        }
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.name, self.submission_id)
    }
}

/// Job execution status as reported by the control plane
///
/// Any status string the control plane reports that is not listed here maps
/// to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Stopped,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether no further state changes can occur after this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Stopped)
    }

    /// Whether the job has left the queue (running or already finished)
    pub fn has_started(&self) -> bool {
        matches!(self, Self::Running) || self.is_terminal()
    }

    /// Wire representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status snapshot of a submitted job
///
/// Timestamps are milliseconds since the Unix epoch on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    #[serde(default)]
    pub submission_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl JobInfo {
    /// Snapshot with only a status, as produced by tests and fakes
    pub fn with_status(submission_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            submission_id: submission_id.into(),
            status,
            message: None,
            entrypoint: None,
            start_time: None,
            end_time: None,
            error_type: None,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time.and_then(millis_to_datetime)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.end_time.and_then(millis_to_datetime)
    }
}

// The control plane reports 0 for "not set"
fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_is_terminal_is_stable() {
        for status in [JobStatus::Pending, JobStatus::Running, JobStatus::Failed] {
            assert_eq!(status.is_terminal(), status.is_terminal());
        }
    }

    #[test]
    fn test_has_started() {
        assert!(JobStatus::Running.has_started());
        assert!(JobStatus::Succeeded.has_started());
        assert!(!JobStatus::Pending.has_started());
        assert!(!JobStatus::Unknown.has_started());
    }

    #[test]
    fn test_status_from_wire() {
        let status: JobStatus = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(status, JobStatus::Running);

        let status: JobStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);
    }

    #[test]
    fn test_job_info_from_wire() {
        let json = r#"{
            "submissionId": "raysubmit_123",
            "status": "SUCCEEDED",
            "message": "Job finished successfully.",
            "entrypoint": "python launcher.py",
            "startTime": 1700000000000,
            "endTime": 0
        }"#;

        let info: JobInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.submission_id, "raysubmit_123");
        assert_eq!(info.status, JobStatus::Succeeded);
        assert_eq!(info.message.as_deref(), Some("Job finished successfully."));
        assert!(info.started_at().is_some());
        assert!(info.ended_at().is_none());
        assert!(info.error_type.is_none());
    }

    #[test]
    fn test_handle_display() {
        let handle = JobHandle::new("cluster", "ns", "sub-1");
        assert_eq!(handle.to_string(), "ns/cluster/sub-1");
    }
}
