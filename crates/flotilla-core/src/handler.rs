use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use flotilla_model::Parameters;

use crate::{client::ClusterClient, error::TaskError};

/// Runtime behavior bound to a task kind, invoked once per attempt.
///
/// Contract:
/// - extract required parameters through the typed accessors and return a
///   classified parameter error on missing or mistyped keys;
/// - perform cluster operations through the client facade; a handler may run
///   its own inner refetch-update loop for conflicts on its resource, or
///   surface the conflict outward to let the task-level resolver refresh;
/// - observe `cancel` at every I/O boundary and return promptly;
/// - return `Ok(())` iff the intended effect is observed.
///
/// Handlers never touch the claim set or the results channel; reporting is
/// the executor's job. Instances are constructed fresh per attempt and must
/// not carry state across invocations.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        client: &dyn ClusterClient,
        namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        worker_index: usize,
    ) -> Result<(), TaskError>;
}
