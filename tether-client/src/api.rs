//! Status and log reads used while following a job
//!
//! The follower polls through this trait so it can run against the HTTP
//! client or against a scripted fake.

use async_trait::async_trait;
use tether_core::domain::job::{JobHandle, JobInfo};

use crate::error::Result;

/// Read access to a submitted job
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Fetches the current status snapshot of the job
    async fn job_info(&self, handle: &JobHandle) -> Result<JobInfo>;

    /// Fetches the full progress log of the job
    ///
    /// The log is returned from its beginning on every call.
    async fn job_log(&self, handle: &JobHandle) -> Result<String>;
}

#[async_trait]
impl<T: JobApi + ?Sized> JobApi for &T {
    async fn job_info(&self, handle: &JobHandle) -> Result<JobInfo> {
        (**self).job_info(handle).await
    }

    async fn job_log(&self, handle: &JobHandle) -> Result<String> {
        (**self).job_log(handle).await
    }
}

#[async_trait]
impl<T: JobApi + ?Sized> JobApi for std::sync::Arc<T> {
    async fn job_info(&self, handle: &JobHandle) -> Result<JobInfo> {
        (**self).job_info(handle).await
    }

    async fn job_log(&self, handle: &JobHandle) -> Result<String> {
        (**self).job_log(handle).await
    }
}
