mod cluster;
mod config;
mod error;
mod params;
mod task;

pub mod keys;

pub use cluster::{ListQuery, PodDetails, PvcSpec};
pub use config::{load_tasks, parse_retry_delay};
pub use error::{ModelError, ModelResult};
pub use params::Parameters;
pub use task::Task;

#[cfg(feature = "schema")]
pub use schemars::{schema_for, JsonSchema};

pub mod prelude {
    pub use crate::{ListQuery, Parameters, PodDetails, PvcSpec, Task};
    #[cfg(feature = "schema")]
    pub use schemars::{schema_for, JsonSchema};
}
