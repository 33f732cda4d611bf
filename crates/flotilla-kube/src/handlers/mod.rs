//! Built-in task handlers.
//!
//! Each handler extracts its parameters through the typed accessors,
//! performs its cluster operations through the facade and returns the first
//! non-retryable error. Handlers that update versioned resources other than
//! pods resolve conflicts themselves with [`retry_on_conflict`]; pod label
//! updates surface conflicts outward so the task-level resolver can refresh
//! the resource version.

mod label_pods;
mod list_pods;
mod network_policy;
mod pod_health;
mod pvc;
mod scale;
mod update_image;

pub use label_pods::LabelPodsHandler;
pub use list_pods::ListPodsHandler;
pub use network_policy::UpdateNetworkPolicyHandler;
pub use pod_health::CheckPodHealthHandler;
pub use pvc::CreatePvcHandler;
pub use scale::ScaleDeploymentHandler;
pub use update_image::UpdateImageHandler;

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use flotilla_core::{ClusterError, TaskError};

/// Inner retry budget for refetch-update loops on conflicting resources.
/// Mirrors the platform default of five short-spaced attempts.
const CONFLICT_RETRIES: u32 = 5;
const CONFLICT_BACKOFF: Duration = Duration::from_millis(10);

/// Run `op` until it stops conflicting, up to [`CONFLICT_RETRIES`] times.
///
/// Non-conflict errors surface immediately; once the budget is spent the
/// last conflict is returned as-is, so the caller still sees a conflict.
pub(crate) async fn retry_on_conflict<F, Fut>(
    cancel: &CancellationToken,
    mut op: F,
) -> Result<(), TaskError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ClusterError>>,
{
    let mut last = None;
    for round in 1..=CONFLICT_RETRIES {
        if cancel.is_cancelled() {
            return Err(TaskError::Canceled);
        }

        match op().await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_conflict() => {
                trace!(round, error = %err, "conflict on inner update; retrying");
                last = Some(err);
            }
            Err(err) => return Err(err.into()),
        }

        if round < CONFLICT_RETRIES {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TaskError::Canceled),
                _ = tokio::time::sleep(CONFLICT_BACKOFF) => {}
            }
        }
    }

    let last = last.expect("conflict retry always records an error");
    Err(TaskError::Cluster(last))
}
