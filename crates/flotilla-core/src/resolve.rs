use tracing::debug;

use flotilla_model::{keys, Task};

use crate::{client::ClusterClient, error::TaskError};

/// Refresh the resource version of the pod a task is manipulating.
///
/// Fetches the latest pod named by the `podName` parameter and writes its
/// resource version back into the parameter map under `resourceVersion`, so
/// the next attempt operates on current state instead of the stale view that
/// caused the conflict. Only pods are refreshed here; deployment- and
/// policy-shaped handlers run their own refetch-update loop.
///
/// The task is mutated in place. The caller holds the claim, so this worker
/// is the only reader and writer of the parameter map.
pub async fn refresh_resource_version(
    client: &dyn ClusterClient,
    task: &mut Task,
) -> Result<(), TaskError> {
    let pod_name = task.parameters.get_str(keys::POD_NAME)?.to_string();
    let pod = client.get_pod(&task.ships_namespace, &pod_name).await?;

    debug!(
        task = %task.name,
        pod = %pod_name,
        resource_version = %pod.resource_version,
        "refreshed resource version after conflict",
    );
    task.parameters
        .set(keys::RESOURCE_VERSION, pod.resource_version);
    Ok(())
}
