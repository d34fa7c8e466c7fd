//! Configuration module
//!
//! Handles CLI configuration: server URL, namespace and orchestrator settings.

use anyhow::{Context, Result};
use tether_client::{JobManagerClient, OrchestratorConfig};

use crate::namespace::{FixedNamespace, NamespaceResolver, ServiceAccountNamespace, resolve};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the job-submission API server
    pub server_url: String,
    /// Namespace given on the command line, if any
    pub namespace: Option<String>,
    /// Retry, timeout and polling settings
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            anyhow::bail!("server_url must start with http:// or https://");
        }

        self.orchestrator.validate()?;
        Ok(())
    }

    /// Builds a client for the configured server
    pub fn client(&self) -> Result<JobManagerClient> {
        JobManagerClient::with_config(&self.server_url, &self.orchestrator)
            .context("Failed to create job-submission client")
    }

    /// Resolves the namespace to work in
    ///
    /// An explicit namespace wins; otherwise the pod's service account is
    /// consulted. An empty namespace is an error.
    pub fn resolve_namespace(&self) -> Result<String> {
        let resolver: Box<dyn NamespaceResolver> = match &self.namespace {
            Some(namespace) => Box::new(FixedNamespace::new(namespace.clone())),
            None => Box::new(ServiceAccountNamespace::default()),
        };

        resolve(resolver.as_ref())
    }
}
