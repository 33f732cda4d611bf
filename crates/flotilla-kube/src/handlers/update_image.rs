use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flotilla_core::{ClusterClient, Handler, TaskError};
use flotilla_model::{keys, Parameters};

use super::retry_on_conflict;

/// Replaces the image of one container in a deployment, riding out
/// conflicts with the inner refetch-update loop.
pub struct UpdateImageHandler;

#[async_trait]
impl Handler for UpdateImageHandler {
    async fn run(
        &self,
        cancel: &CancellationToken,
        client: &dyn ClusterClient,
        namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        worker_index: usize,
    ) -> Result<(), TaskError> {
        let deployment = parameters.get_str(keys::DEPLOYMENT_NAME)?.to_string();
        let container = parameters.get_str(keys::CONTAINER_NAME)?.to_string();
        let image = parameters.get_str(keys::NEW_IMAGE)?.to_string();

        retry_on_conflict(cancel, || {
            client.set_deployment_image(namespace, &deployment, &container, &image)
        })
        .await?;

        info!(
            worker = worker_index,
            task = task_name,
            deployment,
            container,
            image,
            "deployment image updated",
        );
        Ok(())
    }
}
