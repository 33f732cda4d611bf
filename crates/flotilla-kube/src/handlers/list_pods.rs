use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use flotilla_core::{ClusterClient, Handler, TaskError};
use flotilla_model::{ListQuery, Parameters};

/// Lists pods matching the task's selectors and logs each one.
pub struct ListPodsHandler;

#[async_trait]
impl Handler for ListPodsHandler {
    async fn run(
        &self,
        cancel: &CancellationToken,
        client: &dyn ClusterClient,
        namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        worker_index: usize,
    ) -> Result<(), TaskError> {
        info!(worker = worker_index, task = task_name, namespace, "fetching pods");
        let query = ListQuery::from_parameters(parameters)?;

        if cancel.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        let pods = client.list_pods(namespace, &query).await?;

        for pod in &pods {
            info!(pod = %pod.name, phase = %pod.phase, "processing pod");
        }
        debug!(count = pods.len(), "pod listing complete");
        Ok(())
    }
}
