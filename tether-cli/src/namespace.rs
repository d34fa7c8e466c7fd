//! Namespace resolution
//!
//! Jobs are submitted to the namespace the driver runs in. Inside a pod that
//! is the namespace of its service account.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Where a pod's service account namespace is mounted
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Source of the namespace to submit jobs to
pub trait NamespaceResolver {
    fn namespace(&self) -> Result<String>;
}

/// A namespace given explicitly
#[derive(Debug, Clone)]
pub struct FixedNamespace(String);

impl FixedNamespace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self(namespace.into())
    }
}

impl NamespaceResolver for FixedNamespace {
    fn namespace(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Reads the namespace from the service account mount
#[derive(Debug, Clone)]
pub struct ServiceAccountNamespace {
    path: PathBuf,
}

impl ServiceAccountNamespace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ServiceAccountNamespace {
    fn default() -> Self {
        Self::new(SERVICE_ACCOUNT_NAMESPACE_PATH)
    }
}

impl NamespaceResolver for ServiceAccountNamespace {
    fn namespace(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read namespace from {}", self.path.display()))
    }
}

/// Resolves a namespace, failing when it is empty
pub fn resolve(resolver: &dyn NamespaceResolver) -> Result<String> {
    let namespace = resolver.namespace()?.trim().to_string();
    if namespace.is_empty() {
        anyhow::bail!("Failed to get namespace: resolved namespace is empty");
    }
    Ok(namespace)
}
