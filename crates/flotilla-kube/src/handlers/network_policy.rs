use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flotilla_core::{ClusterClient, Handler, TaskError};
use flotilla_model::{keys, ModelError, Parameters};

use super::retry_on_conflict;

/// Replaces a network policy's spec with the one embedded in the task
/// parameters, riding out conflicts with the inner refetch-update loop.
pub struct UpdateNetworkPolicyHandler;

#[async_trait]
impl Handler for UpdateNetworkPolicyHandler {
    async fn run(
        &self,
        cancel: &CancellationToken,
        client: &dyn ClusterClient,
        namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        worker_index: usize,
    ) -> Result<(), TaskError> {
        let policy_name = parameters.get_str(keys::POLICY_NAME)?.to_string();
        if policy_name.is_empty() {
            return Err(TaskError::Parameter(ModelError::InvalidParameter {
                key: keys::POLICY_NAME.to_string(),
                reason: "must not be empty".to_string(),
            }));
        }
        let spec = parse_policy_spec(parameters.get_str(keys::POLICY_SPEC)?)?;

        retry_on_conflict(cancel, || {
            client.update_network_policy(namespace, &policy_name, &spec)
        })
        .await?;

        info!(
            worker = worker_index,
            task = task_name,
            policy = policy_name,
            "network policy updated",
        );
        Ok(())
    }
}

/// Parse the embedded spec string, accepting JSON first and YAML second.
fn parse_policy_spec(raw: &str) -> Result<Value, TaskError> {
    if let Ok(spec) = serde_json::from_str::<Value>(raw) {
        return Ok(spec);
    }
    serde_yaml::from_str::<Value>(raw).map_err(|e| {
        TaskError::Parameter(ModelError::InvalidParameter {
            key: keys::POLICY_SPEC.to_string(),
            reason: format!("expected JSON or YAML: {e}"),
        })
    })
}
