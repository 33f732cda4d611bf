//! `kube`-backed cluster client and the built-in task handlers.

mod client;
pub mod handlers;

pub use client::KubeCluster;

use flotilla_core::HandlerRegistry;

use crate::handlers::{
    CheckPodHealthHandler, CreatePvcHandler, LabelPodsHandler, ListPodsHandler,
    ScaleDeploymentHandler, UpdateImageHandler, UpdateNetworkPolicyHandler,
};

/// Register every built-in handler kind.
///
/// This is the composition root for kind strings: call it once before the
/// captain launches. Kinds registered afterwards replace these (the registry
/// is last-write-wins), which is how applications add or override kinds.
pub fn register_default_handlers(registry: &mut HandlerRegistry) {
    registry.register("CrewGetPods", || Box::new(ListPodsHandler));
    registry.register("CrewCheckHealthPods", || Box::new(CheckPodHealthHandler));
    registry.register("CrewWriteLabelPods", || Box::new(LabelPodsHandler));
    registry.register("CrewScaleDeployments", || Box::new(ScaleDeploymentHandler));
    registry.register("CrewUpdateImageDeployments", || Box::new(UpdateImageHandler));
    registry.register("CrewCreatePVCStorage", || Box::new(CreatePvcHandler));
    registry.register("CrewUpdateNetworkPolicy", || {
        Box::new(UpdateNetworkPolicyHandler)
    });
}
