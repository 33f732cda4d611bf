use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flotilla_core::{ClusterClient, Handler, TaskError};
use flotilla_model::{keys, Parameters, PvcSpec};

/// Creates a persistent volume claim from the task parameters.
pub struct CreatePvcHandler;

#[async_trait]
impl Handler for CreatePvcHandler {
    async fn run(
        &self,
        cancel: &CancellationToken,
        client: &dyn ClusterClient,
        namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        worker_index: usize,
    ) -> Result<(), TaskError> {
        let claim = PvcSpec {
            name: parameters.get_str(keys::PVC_NAME)?.to_string(),
            storage_class: parameters.get_str(keys::STORAGE_CLASS_NAME)?.to_string(),
            storage_size: parameters.get_str(keys::STORAGE_SIZE)?.to_string(),
        };

        if cancel.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        client.create_pvc(namespace, &claim).await?;

        info!(
            worker = worker_index,
            task = task_name,
            pvc = %claim.name,
            size = %claim.storage_size,
            "volume claim created",
        );
        Ok(())
    }
}
