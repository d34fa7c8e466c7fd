//! Job-related API endpoints

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tether_core::domain::job::{JobHandle, JobInfo};
use tether_core::domain::outcome::{FollowOutcome, SubmissionOutcome};
use tether_core::dto::job::{
    JobListResponse, JobLogResponse, JobSubmissionRequest, SubmitJobResponse,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::JobManagerClient;
use crate::api::JobApi;
use crate::error::Result;
use crate::follow::{ExecutionFollower, FollowSettings};
use crate::sink::OutputSink;

impl JobManagerClient {
    // =============================================================================
    // Submission
    // =============================================================================

    /// Submit a job to a cluster
    ///
    /// # Arguments
    /// * `name` - Logical job (cluster) name
    /// * `namespace` - Namespace to submit to
    /// * `execution_params` - Parameters passed through to the entry point
    /// * `entry_point` - Script or identifier the cluster executes
    ///
    /// # Returns
    /// The submission outcome. Transport failures are retried per the
    /// client's retry policy; any answer other than 200 is a rejection.
    pub async fn submit_job(
        &self,
        name: &str,
        namespace: &str,
        execution_params: Map<String, Value>,
        entry_point: &str,
    ) -> SubmissionOutcome {
        let request = JobSubmissionRequest::new(name, namespace, entry_point, execution_params);
        self.submit(&request).await
    }

    /// Submit a prepared submission request
    pub async fn submit(&self, request: &JobSubmissionRequest) -> SubmissionOutcome {
        let url = self.submissions_url(&request.namespace, &request.name);
        info!(
            "Submitting job {} to namespace {} (entrypoint {})",
            request.name, request.namespace, request.entry_point
        );

        let reply = match self
            .send_with_retries("submit job", |client| client.post(&url).json(request))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                return SubmissionOutcome::TransportFailure {
                    message: e.to_string(),
                };
            }
        };

        if reply.status != 200 {
            warn!(
                "Submission of job {} rejected with status {}: {}",
                request.name, reply.status, reply.body
            );
            return SubmissionOutcome::Rejected {
                http_status: reply.status,
                message: reply.body,
            };
        }

        match serde_json::from_str::<SubmitJobResponse>(&reply.body) {
            Ok(body) if !body.submission_id.is_empty() => {
                info!(
                    "Job {} accepted with submission id {}",
                    request.name, body.submission_id
                );
                SubmissionOutcome::Accepted {
                    submission_id: body.submission_id,
                }
            }
            _ => SubmissionOutcome::Rejected {
                http_status: reply.status,
                message: format!("response carried no submission id: {}", reply.body),
            },
        }
    }

    // =============================================================================
    // Job Query
    // =============================================================================

    /// Get the status snapshot of a submission
    pub async fn job_info(&self, handle: &JobHandle) -> Result<JobInfo> {
        let url = self.submission_url(handle);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the full progress log of a submission
    pub async fn job_log(&self, handle: &JobHandle) -> Result<String> {
        let url = format!(
            "{}/log/{}",
            self.submissions_url(&handle.namespace, &handle.name),
            handle.submission_id
        );
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let body: JobLogResponse = self.handle_response(response).await?;
        Ok(body.log)
    }

    /// List all submissions of a cluster
    pub async fn list_jobs(&self, name: &str, namespace: &str) -> Result<Vec<JobInfo>> {
        let url = self.submissions_url(namespace, name);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let body: JobListResponse = self.handle_response(response).await?;
        Ok(body.submissions)
    }

    // =============================================================================
    // Job Control
    // =============================================================================

    /// Ask the cluster to stop a running submission
    pub async fn stop_job(&self, handle: &JobHandle) -> Result<()> {
        let url = self.submission_url(handle);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Delete a finished submission and its log
    pub async fn delete_job(&self, handle: &JobHandle) -> Result<()> {
        let url = self.submission_url(handle);
        let response = self
            .client
            .delete(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Follow
    // =============================================================================

    /// Follow a submission until it completes, a timeout fires or `cancel`
    /// is triggered
    ///
    /// `print_timeout` bounds the time without output once the job runs,
    /// `job_ready_timeout` the time for the job to start. Poll interval and
    /// per-call deadline come from the client's configuration.
    pub async fn follow_execution(
        &self,
        handle: &JobHandle,
        print_timeout: Duration,
        job_ready_timeout: Duration,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> FollowOutcome {
        let settings = FollowSettings {
            readiness_timeout: job_ready_timeout,
            staleness_timeout: print_timeout,
            ..self.follow_settings
        };

        ExecutionFollower::new(self)
            .follow(handle, &settings, sink, cancel)
            .await
    }

    fn submission_url(&self, handle: &JobHandle) -> String {
        format!(
            "{}/{}",
            self.submissions_url(&handle.namespace, &handle.name),
            handle.submission_id
        )
    }
}

#[async_trait]
impl JobApi for JobManagerClient {
    async fn job_info(&self, handle: &JobHandle) -> Result<JobInfo> {
        JobManagerClient::job_info(self, handle).await
    }

    async fn job_log(&self, handle: &JobHandle) -> Result<String> {
        JobManagerClient::job_log(self, handle).await
    }
}
