use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use flotilla_model::{ListQuery, PodDetails, PvcSpec};

/// Errors surfaced by a [`ClusterClient`] implementation.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The observed resource version is stale (optimistic-concurrency
    /// failure). The only retryable-with-refresh class.
    #[error("conflict updating {kind} '{name}': {message}")]
    Conflict {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("cluster api error: {0}")]
    Api(String),
}

impl ClusterError {
    /// Classification capability used by the engine; callers must never
    /// match on message text.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict { .. })
    }
}

/// Facade over the cluster API.
///
/// The engine and the handlers depend on this trait instead of a concrete
/// client, so tests can substitute a stub and error classification stays on
/// [`ClusterError`] rather than on backend error types. Implementations must
/// return promptly once the calling context is cancelled.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List pods in a namespace, filtered by the query selectors.
    async fn list_pods(
        &self,
        namespace: &str,
        query: &ListQuery,
    ) -> Result<Vec<PodDetails>, ClusterError>;

    /// Fetch the latest state of a single pod.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodDetails, ClusterError>;

    /// Replace a pod's label set.
    ///
    /// When `expected_version` is set, the update is rejected with a
    /// conflict if the stored resource version differs, instead of silently
    /// overwriting newer state.
    async fn update_pod_labels(
        &self,
        namespace: &str,
        name: &str,
        labels: &BTreeMap<String, String>,
        expected_version: Option<&str>,
    ) -> Result<(), ClusterError>;

    /// Set the replica count of a deployment.
    async fn scale_deployment(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), ClusterError>;

    /// Replace the image of one container in a deployment.
    async fn set_deployment_image(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        image: &str,
    ) -> Result<(), ClusterError>;

    /// Create a persistent volume claim.
    async fn create_pvc(&self, namespace: &str, claim: &PvcSpec) -> Result<(), ClusterError>;

    /// Replace the spec of an existing network policy.
    async fn update_network_policy(
        &self,
        namespace: &str,
        name: &str,
        spec: &Value,
    ) -> Result<(), ClusterError>;
}
