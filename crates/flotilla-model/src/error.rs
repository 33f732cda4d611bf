use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read task file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON task file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML task file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error("duration string is empty")]
    EmptyRetryDelay,

    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("failed to parse retry delay {value:?} for task '{task}': {reason}")]
    InvalidRetryDelay {
        task: String,
        value: String,
        reason: String,
    },

    #[error("task '{0}' must allow at least one attempt")]
    InvalidMaxRetries(String),

    #[error("duplicate task name: {0}")]
    DuplicateTaskName(String),

    #[error("parameter not found: {0}")]
    MissingParameter(String),

    #[error("parameter '{key}' must be a {expected}")]
    ParameterType { key: String, expected: &'static str },

    #[error("parameter '{key}' is invalid: {reason}")]
    InvalidParameter { key: String, reason: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
