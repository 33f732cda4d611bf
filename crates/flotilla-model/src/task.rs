use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::params::Parameters;

/// Declarative unit of work executed by the crew.
///
/// `Task` describes *what* should happen in the cluster and *how stubborn*
/// the engine should be about it.
///
/// Fields cover:
/// - identity and placement (`name`, `ships_namespace`)
/// - handler selection (`kind`, serialized as `type`)
/// - retry behavior (`max_retries`, `retry_delay`)
/// - handler input (`parameters`)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier within the batch.
    ///
    /// The claim set uses the name as claim identity, so duplicates would
    /// silently suppress work; the loader rejects them.
    pub name: String,
    /// Kubernetes namespace the task operates in. Opaque to the engine.
    pub ships_namespace: String,
    /// Handler kind selecting the runtime behavior.
    ///
    /// Must be registered before the captain launches; an unknown kind is a
    /// terminal error for this task only.
    #[serde(rename = "type")]
    pub kind: String,
    /// Total attempts allowed, not additional retries. At least 1.
    pub max_retries: u32,
    /// Human-readable delay between attempts, e.g. `"2s"` or `"500ms"`.
    pub retry_delay: String,
    /// Parsed form of `retry_delay`, filled in by the loader.
    #[serde(skip)]
    #[cfg_attr(feature = "schema", schemars(skip))]
    pub retry_delay_duration: Duration,
    /// Handler-specific parameters; the engine treats them as opaque except
    /// for the conflict resolver's `resourceVersion` write-back.
    pub parameters: Parameters,
}
