//! Job DTOs for the job-submission API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::job::JobInfo;

/// Request to submit a job to a cluster
///
/// Execution parameters are passed through to the entry point untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmissionRequest {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "entrypoint")]
    pub entry_point: String,
    #[serde(default)]
    pub execution_params: Map<String, Value>,
}

impl JobSubmissionRequest {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        entry_point: impl Into<String>,
        execution_params: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            entry_point: entry_point.into(),
            execution_params,
        }
    }
}

/// Body of a successful submission response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub submission_id: String,
}

/// Body of the job log endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobLogResponse {
    #[serde(default)]
    pub log: String,
}

/// Body of the submission listing endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobListResponse {
    #[serde(default)]
    pub submissions: Vec<JobInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submission_request_wire_shape() {
        let mut params = Map::new();
        params.insert("docq_ft_lang".to_string(), json!("en"));
        params.insert("runtime_num_workers".to_string(), json!(4));

        let request = JobSubmissionRequest::new("docq-run", "kubeflow", "launcher.py", params);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["name"], "docq-run");
        assert_eq!(value["namespace"], "kubeflow");
        assert_eq!(value["entrypoint"], "launcher.py");
        assert_eq!(value["executionParams"]["runtime_num_workers"], 4);
    }

    #[test]
    fn test_empty_list_response() {
        let list: JobListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.submissions.is_empty());
    }
}
