//! Submission ID resolver
//!
//! Resolves submission ID prefixes to full IDs by listing the submissions of
//! a cluster. This allows users to type short, unambiguous prefixes instead
//! of full submission IDs.

use anyhow::{Context, Result, anyhow};
use tether_client::{JobInfo, JobManagerClient};

/// Resolve a submission ID or prefix to a full submission ID
///
/// # Arguments
/// * `client` - The client used to list submissions
/// * `name` - Cluster (job) name
/// * `namespace` - Namespace of the cluster
/// * `id_or_prefix` - The ID or prefix to resolve
///
/// # Errors
/// Returns an error if:
/// - No submission matches the prefix
/// - Multiple submissions match the prefix (ambiguous)
/// - Listing submissions fails
pub async fn resolve_submission_id(
    client: &JobManagerClient,
    name: &str,
    namespace: &str,
    id_or_prefix: &str,
) -> Result<String> {
    let submissions = client
        .list_jobs(name, namespace)
        .await
        .context("Failed to fetch submissions for ID resolution")?;

    match_submission_id(&submissions, id_or_prefix)
}

/// Find the submission identified by `id_or_prefix`
///
/// An exact match wins over prefix matches.
fn match_submission_id(submissions: &[JobInfo], id_or_prefix: &str) -> Result<String> {
    if submissions.iter().any(|s| s.submission_id == id_or_prefix) {
        return Ok(id_or_prefix.to_string());
    }

    let matches: Vec<&str> = submissions
        .iter()
        .map(|s| s.submission_id.as_str())
        .filter(|id| id.starts_with(id_or_prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No submission found with ID starting with '{}'",
            id_or_prefix
        )),
        [only] => Ok(only.to_string()),
        _ => Err(anyhow!(
            "Ambiguous prefix '{}' matches multiple submissions: {}",
            id_or_prefix,
            matches.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_client::JobStatus;

    fn submissions() -> Vec<JobInfo> {
        vec![
            JobInfo::with_status("raysubmit_abc123", JobStatus::Succeeded),
            JobInfo::with_status("raysubmit_abd456", JobStatus::Running),
            JobInfo::with_status("raysubmit_x", JobStatus::Failed),
        ]
    }

    #[test]
    fn test_exact_match() {
        let id = match_submission_id(&submissions(), "raysubmit_x").unwrap();
        assert_eq!(id, "raysubmit_x");
    }

    #[test]
    fn test_unique_prefix() {
        let id = match_submission_id(&submissions(), "raysubmit_abd").unwrap();
        assert_eq!(id, "raysubmit_abd456");
    }

    #[test]
    fn test_ambiguous_prefix() {
        let err = match_submission_id(&submissions(), "raysubmit_ab").unwrap_err();
        assert!(err.to_string().contains("Ambiguous prefix"));
    }

    #[test]
    fn test_no_match() {
        let err = match_submission_id(&submissions(), "nope").unwrap_err();
        assert!(err.to_string().contains("No submission found"));
    }
}
