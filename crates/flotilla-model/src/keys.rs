//! Well-known parameter keys shared between the engine and the handlers.
//!
//! Keeping them here avoids scattering magic strings throughout the codebase.

/// Label selector for pod list queries.
pub const LABEL_SELECTOR: &str = "labelSelector";

/// Field selector for pod list queries.
pub const FIELD_SELECTOR: &str = "fieldSelector";

/// Result cap for pod list queries.
pub const LIMIT: &str = "limit";

/// Key of the label written by the labeling handler.
pub const LABEL_KEY: &str = "labelKey";

/// Value of the label written by the labeling handler.
pub const LABEL_VALUE: &str = "labelValue";

/// Pod targeted by single-pod operations and by the conflict resolver.
pub const POD_NAME: &str = "podName";

/// Deployment targeted by scale and image updates.
pub const DEPLOYMENT_NAME: &str = "deploymentName";

/// Desired replica count for scale operations.
pub const REPLICAS: &str = "replicas";

/// Container whose image is replaced by the image-update handler.
pub const CONTAINER_NAME: &str = "containerName";

/// Image reference applied by the image-update handler.
pub const NEW_IMAGE: &str = "newImage";

/// Storage class for volume claims.
pub const STORAGE_CLASS_NAME: &str = "storageClassName";

/// Name of the volume claim to create.
pub const PVC_NAME: &str = "pvcName";

/// Requested size of the volume claim (e.g. "10Gi").
pub const STORAGE_SIZE: &str = "storageSize";

/// Network policy targeted by policy updates.
pub const POLICY_NAME: &str = "policyName";

/// New network policy specification, as a JSON or YAML string.
pub const POLICY_SPEC: &str = "policySpec";

/// Fresh resource version written back by the conflict resolver.
pub const RESOURCE_VERSION: &str = "resourceVersion";
