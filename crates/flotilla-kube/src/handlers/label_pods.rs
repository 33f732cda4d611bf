use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use flotilla_core::{ClusterClient, Handler, TaskError};
use flotilla_model::{keys, ListQuery, Parameters};

/// Writes a label onto one pod (`podName`) or onto every pod in the
/// namespace.
///
/// Single-pod updates carry the resource version pinned by the conflict
/// resolver when present, so a stale view surfaces as a task-level conflict
/// instead of clobbering newer state. Pods that already carry the label are
/// skipped.
pub struct LabelPodsHandler;

#[async_trait]
impl Handler for LabelPodsHandler {
    async fn run(
        &self,
        cancel: &CancellationToken,
        client: &dyn ClusterClient,
        namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        worker_index: usize,
    ) -> Result<(), TaskError> {
        let label_key = parameters.get_str(keys::LABEL_KEY)?.to_string();
        let label_value = parameters.get_str(keys::LABEL_VALUE)?.to_string();
        debug!(
            worker = worker_index,
            task = task_name,
            label_key,
            label_value,
            "labeling pods",
        );

        if let Some(pod_name) = parameters.get_str_opt(keys::POD_NAME)? {
            let pinned = parameters.get_str_opt(keys::RESOURCE_VERSION)?;
            return label_pod(client, namespace, pod_name, &label_key, &label_value, pinned).await;
        }

        let pods = client.list_pods(namespace, &ListQuery::default()).await?;
        for pod in &pods {
            if cancel.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            label_pod(client, namespace, &pod.name, &label_key, &label_value, None).await?;
        }
        Ok(())
    }
}

async fn label_pod(
    client: &dyn ClusterClient,
    namespace: &str,
    name: &str,
    key: &str,
    value: &str,
    pinned_version: Option<&str>,
) -> Result<(), TaskError> {
    let pod = client.get_pod(namespace, name).await?;
    if pod.labels.get(key).map(String::as_str) == Some(value) {
        trace!(pod = name, "label already present; skipping");
        return Ok(());
    }

    let mut labels = pod.labels.clone();
    labels.insert(key.to_string(), value.to_string());
    let version = pinned_version.unwrap_or(&pod.resource_version);
    client
        .update_pod_labels(namespace, name, &labels, Some(version))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::LabelPodsHandler;
    use crate::handlers::testsupport::{run_handler, RecordingCluster};
    use flotilla_core::TaskError;
    use flotilla_model::{keys, Parameters};

    fn label_params() -> Parameters {
        let mut params = Parameters::new();
        params.set(keys::LABEL_KEY, "fleet");
        params.set(keys::LABEL_VALUE, "alpha");
        params
    }

    #[tokio::test]
    async fn single_pod_update_carries_the_pinned_version() {
        let cluster =
            RecordingCluster::with_pods(vec![RecordingCluster::pod("p", "v1", &[])]);

        let mut params = label_params();
        params.set(keys::POD_NAME, "p");
        params.set(keys::RESOURCE_VERSION, "v9");

        run_handler(&LabelPodsHandler, &cluster, &params)
            .await
            .expect("labeling should succeed");

        let updates = cluster.label_updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 1);
        let (name, labels, version) = &updates[0];
        assert_eq!(name, "p");
        assert_eq!(labels.get("fleet").map(String::as_str), Some("alpha"));
        assert_eq!(version.as_deref(), Some("v9"));
    }

    #[tokio::test]
    async fn without_a_pinned_version_the_fetched_one_is_used() {
        let cluster =
            RecordingCluster::with_pods(vec![RecordingCluster::pod("p", "v1", &[])]);

        let mut params = label_params();
        params.set(keys::POD_NAME, "p");

        run_handler(&LabelPodsHandler, &cluster, &params)
            .await
            .expect("labeling should succeed");

        let updates = cluster.label_updates.lock().unwrap().clone();
        assert_eq!(updates[0].2.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn already_labeled_pods_are_left_alone() {
        let cluster = RecordingCluster::with_pods(vec![RecordingCluster::pod(
            "p",
            "v1",
            &[("fleet", "alpha")],
        )]);

        let mut params = label_params();
        params.set(keys::POD_NAME, "p");

        run_handler(&LabelPodsHandler, &cluster, &params)
            .await
            .expect("no-op labeling should succeed");
        assert!(cluster.label_updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn namespace_mode_labels_every_pod() {
        let cluster = RecordingCluster::with_pods(vec![
            RecordingCluster::pod("web-0", "1", &[]),
            RecordingCluster::pod("web-1", "2", &[("fleet", "alpha")]),
            RecordingCluster::pod("web-2", "3", &[]),
        ]);

        run_handler(&LabelPodsHandler, &cluster, &label_params())
            .await
            .expect("labeling should succeed");

        let updates = cluster.label_updates.lock().unwrap().clone();
        let updated: Vec<&str> = updates.iter().map(|(name, _, _)| name.as_str()).collect();
        assert_eq!(updated, vec!["web-0", "web-2"]);
    }

    #[tokio::test]
    async fn conflicts_surface_to_the_caller() {
        let cluster =
            RecordingCluster::with_pods(vec![RecordingCluster::pod("p", "v1", &[])]);
        cluster
            .conflicts
            .store(1, std::sync::atomic::Ordering::SeqCst);

        let mut params = label_params();
        params.set(keys::POD_NAME, "p");

        let err = run_handler(&LabelPodsHandler, &cluster, &params)
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "conflict must not be swallowed: {err}");
    }

    #[tokio::test]
    async fn missing_label_parameters_are_an_error() {
        let cluster = RecordingCluster::new();
        let res = run_handler(&LabelPodsHandler, &cluster, &Parameters::new()).await;
        assert!(matches!(res, Err(TaskError::Parameter(_))));
    }
}
