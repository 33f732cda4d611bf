use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flotilla_core::{ClusterClient, Handler, TaskError};
use flotilla_model::{keys, Parameters};

use super::retry_on_conflict;

/// Scales a deployment to the requested replica count.
///
/// Conflicts are resolved by refetching and reapplying inside
/// [`retry_on_conflict`]; any other error surfaces immediately.
pub struct ScaleDeploymentHandler;

#[async_trait]
impl Handler for ScaleDeploymentHandler {
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
        let replicas = parameters.get_i32(keys::REPLICAS)?;

        retry_on_conflict(cancel, || {
            client.scale_deployment(namespace, &deployment, replicas)
        })
        .await?;

        info!(
            worker = worker_index,
            task = task_name,
            deployment,
            replicas,
            "deployment scaled",
        );
        Ok(())
    }
}
