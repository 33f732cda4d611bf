use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{
            PersistentVolumeClaim, PersistentVolumeClaimSpec, Pod, VolumeResourceRequirements,
        },
        networking::v1::{NetworkPolicy, NetworkPolicySpec},
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
};
use kube::{
    api::{Api, ListParams, PostParams},
    Client,
};
use serde_json::Value;
use tracing::{debug, trace};

use flotilla_core::{ClusterClient, ClusterError};
use flotilla_model::{ListQuery, PodDetails, PvcSpec};

/// Cluster facade backed by a [`kube::Client`].
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using the ambient configuration: the in-cluster service
    /// account when running inside a pod, otherwise the local kubeconfig.
    pub async fn connect() -> Result<Self, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Api(format!("failed to build cluster client: {e}")))?;
        debug!("cluster client connected");
        Ok(Self { client })
    }

    /// Wrap an already-configured client (tests, custom auth).
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn volume_claims(&self, namespace: &str) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn network_policies(&self, namespace: &str) -> Api<NetworkPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a backend error onto the facade error, classifying by API status
/// code rather than by message text.
fn api_error(kind: &'static str, name: &str, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(resp) if resp.code == 409 => ClusterError::Conflict {
            kind,
            name: name.to_string(),
            message: resp.message,
        },
        kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound {
            kind,
            name: name.to_string(),
        },
        other => ClusterError::Api(other.to_string()),
    }
}

/// Reduce a full pod object to the summary the engine works with.
fn pod_details(pod: &Pod) -> PodDetails {
    let status = pod.status.as_ref();
    let phase = status
        .and_then(|s| s.phase.clone())
        .unwrap_or_default();
    let ready = phase == "Running"
        && status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|containers| containers.iter().all(|c| c.ready))
            .unwrap_or(false);

    PodDetails {
        name: pod.metadata.name.clone().unwrap_or_default(),
        phase,
        ready,
        resource_version: pod.metadata.resource_version.clone().unwrap_or_default(),
        labels: pod.metadata.labels.clone().unwrap_or_default(),
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list_pods(
        &self,
        namespace: &str,
        query: &ListQuery,
    ) -> Result<Vec<PodDetails>, ClusterError> {
        let mut params = ListParams::default();
        if !query.label_selector.is_empty() {
            params = params.labels(&query.label_selector);
        }
        if !query.field_selector.is_empty() {
            params = params.fields(&query.field_selector);
        }
        if query.limit > 0 {
            params = params.limit(query.limit as u32);
        }

        let pods = self
            .pods(namespace)
            .list(&params)
            .await
            .map_err(|e| api_error("pods", namespace, e))?;
        trace!(namespace, count = pods.items.len(), "listed pods");
        Ok(pods.items.iter().map(pod_details).collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodDetails, ClusterError> {
        let pod = self
            .pods(namespace)
            .get(name)
            .await
            .map_err(|e| api_error("pod", name, e))?;
        Ok(pod_details(&pod))
    }

    async fn update_pod_labels(
        &self,
        namespace: &str,
        name: &str,
        labels: &BTreeMap<String, String>,
        expected_version: Option<&str>,
    ) -> Result<(), ClusterError> {
        let api = self.pods(namespace);
        let mut pod = api
            .get(name)
            .await
            .map_err(|e| api_error("pod", name, e))?;

        pod.metadata.labels = Some(labels.clone());
        if let Some(version) = expected_version {
            // A stale version makes the replace fail with 409 instead of
            // silently overwriting a newer pod.
            pod.metadata.resource_version = Some(version.to_string());
        }

        api.replace(name, &PostParams::default(), &pod)
            .await
            .map_err(|e| api_error("pod", name, e))?;
        Ok(())
    }

    async fn scale_deployment(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), ClusterError> {
        let api = self.deployments(namespace);
        let mut deployment = api
            .get(name)
            .await
            .map_err(|e| api_error("deployment", name, e))?;

        if let Some(spec) = deployment.spec.as_mut() {
            spec.replicas = Some(replicas);
        }

        api.replace(name, &PostParams::default(), &deployment)
            .await
            .map_err(|e| api_error("deployment", name, e))?;
        Ok(())
    }

    async fn set_deployment_image(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        image: &str,
    ) -> Result<(), ClusterError> {
        let api = self.deployments(namespace);
        let mut deployment = api
            .get(name)
            .await
            .map_err(|e| api_error("deployment", name, e))?;

        let target = deployment
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
            .map(|pod_spec| &mut pod_spec.containers)
            .and_then(|containers| containers.iter_mut().find(|c| c.name == container));
        match target {
            Some(c) => c.image = Some(image.to_string()),
            None => {
                return Err(ClusterError::NotFound {
                    kind: "container",
                    name: container.to_string(),
                })
            }
        }

        api.replace(name, &PostParams::default(), &deployment)
            .await
            .map_err(|e| api_error("deployment", name, e))?;
        Ok(())
    }

    async fn create_pvc(&self, namespace: &str, claim: &PvcSpec) -> Result<(), ClusterError> {
        let pvc = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(claim.name.clone()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                storage_class_name: Some(claim.storage_class.clone()),
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(
                        [("storage".to_string(), Quantity(claim.storage_size.clone()))]
                            .into_iter()
                            .collect(),
                    ),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        self.volume_claims(namespace)
            .create(&PostParams::default(), &pvc)
            .await
            .map_err(|e| api_error("persistentvolumeclaim", &claim.name, e))?;
        Ok(())
    }

    async fn update_network_policy(
        &self,
        namespace: &str,
        name: &str,
        spec: &Value,
    ) -> Result<(), ClusterError> {
        let api = self.network_policies(namespace);
        let mut policy = api
            .get(name)
            .await
            .map_err(|e| api_error("networkpolicy", name, e))?;

        let parsed: NetworkPolicySpec = serde_json::from_value(spec.clone())
            .map_err(|e| ClusterError::Api(format!("invalid network policy spec: {e}")))?;
        policy.spec = Some(parsed);

        api.replace(name, &PostParams::default(), &policy)
            .await
            .map_err(|e| api_error("networkpolicy", name, e))?;
        Ok(())
    }
}
