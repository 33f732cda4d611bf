use thiserror::Error;

use flotilla_model::ModelError;

use crate::client::ClusterError;

/// Errors produced while driving a single task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// No handler constructor is registered for the task's `type`.
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    /// The governing context was cancelled before the task finished.
    #[error("context canceled")]
    Canceled,

    /// A required parameter is missing or mistyped.
    #[error(transparent)]
    Parameter(#[from] ModelError),

    /// The cluster client reported a failure.
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// The retry budget was consumed without success.
    #[error("failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        source: Box<TaskError>,
    },
}

impl TaskError {
    /// True when the error is an optimistic-concurrency conflict, looking
    /// through retry exhaustion to the underlying cause.
    ///
    /// Classification is on error identity only; no string matching.
    pub fn is_conflict(&self) -> bool {
        match self {
            TaskError::Cluster(e) => e.is_conflict(),
            TaskError::Exhausted { source, .. } => source.is_conflict(),
            _ => false,
        }
    }
}
