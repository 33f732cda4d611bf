use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flotilla_core::{ClusterClient, Handler, TaskError};
use flotilla_model::{ListQuery, Parameters};

/// Reports the health of every pod matching the task's selectors.
///
/// A pod counts as healthy when it is running and all of its containers
/// report ready.
pub struct CheckPodHealthHandler;

#[async_trait]
impl Handler for CheckPodHealthHandler {
    async fn run(
        &self,
        cancel: &CancellationToken,
        client: &dyn ClusterClient,
        namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        worker_index: usize,
    ) -> Result<(), TaskError> {
        info!(worker = worker_index, task = task_name, namespace, "checking pod health");
        let query = ListQuery::from_parameters(parameters)?;
        let pods = client.list_pods(namespace, &query).await?;

        for pod in &pods {
            if cancel.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            let health = if pod.ready { "healthy" } else { "not healthy" };
            info!(pod = %pod.name, phase = %pod.phase, health, "pod health");
        }
        Ok(())
    }
}
