use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{error::ModelResult, keys, params::Parameters};

/// Minimal view of a pod, as seen by handlers and the conflict resolver.
///
/// The engine never touches backend API types directly; the cluster facade
/// maps whatever its client returns into this summary.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PodDetails {
    pub name: String,
    /// Lifecycle phase as reported by the API server (e.g. "Running").
    pub phase: String,
    /// True when the pod is running and every container reports ready.
    pub ready: bool,
    /// Version used for optimistic-concurrency checks on updates.
    pub resource_version: String,
    pub labels: BTreeMap<String, String>,
}

/// Selection criteria for pod list queries.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub label_selector: String,
    pub field_selector: String,
    /// Result cap; zero means no limit.
    pub limit: i64,
}

impl ListQuery {
    /// Build a query from the task parameters.
    ///
    /// All three keys are required; a list task that forgot its selectors is
    /// a parameter error, not an implicit list-everything.
    pub fn from_parameters(params: &Parameters) -> ModelResult<Self> {
        Ok(Self {
            label_selector: params.get_str(keys::LABEL_SELECTOR)?.to_string(),
            field_selector: params.get_str(keys::FIELD_SELECTOR)?.to_string(),
            limit: params.get_i64(keys::LIMIT)?,
        })
    }
}

/// Persistent volume claim request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PvcSpec {
    pub name: String,
    pub storage_class: String,
    /// Requested capacity in Kubernetes quantity notation (e.g. "10Gi").
    pub storage_size: String,
}
