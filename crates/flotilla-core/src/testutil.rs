//! Shared test doubles: a stub cluster and scriptable handlers.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use flotilla_model::{ListQuery, Parameters, PodDetails, PvcSpec, Task};

use crate::{
    client::{ClusterClient, ClusterError},
    error::TaskError,
    handler::Handler,
    registry::HandlerRegistry,
};

/// Cluster stub serving a single pod; every mutation succeeds.
pub(crate) struct StubCluster {
    pod: PodDetails,
}

impl StubCluster {
    pub(crate) fn with_pod(name: &str, resource_version: &str) -> Self {
        Self {
            pod: PodDetails {
                name: name.to_string(),
                phase: "Running".to_string(),
                ready: true,
                resource_version: resource_version.to_string(),
                labels: BTreeMap::new(),
            },
        }
    }
}

#[async_trait]
impl ClusterClient for StubCluster {
    async fn list_pods(
        &self,
        _namespace: &str,
        _query: &ListQuery,
    ) -> Result<Vec<PodDetails>, ClusterError> {
        Ok(vec![self.pod.clone()])
    }

    async fn get_pod(&self, _namespace: &str, name: &str) -> Result<PodDetails, ClusterError> {
        if name == self.pod.name {
            Ok(self.pod.clone())
        } else {
            Err(ClusterError::NotFound {
                kind: "pod",
                name: name.to_string(),
            })
        }
    }

    async fn update_pod_labels(
        &self,
        _namespace: &str,
        _name: &str,
        _labels: &BTreeMap<String, String>,
        _expected_version: Option<&str>,
    ) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn scale_deployment(
        &self,
        _namespace: &str,
        _name: &str,
        _replicas: i32,
    ) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn set_deployment_image(
        &self,
        _namespace: &str,
        _name: &str,
        _container: &str,
        _image: &str,
    ) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn create_pvc(&self, _namespace: &str, _claim: &PvcSpec) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn update_network_policy(
        &self,
        _namespace: &str,
        _name: &str,
        _spec: &Value,
    ) -> Result<(), ClusterError> {
        Ok(())
    }
}

/// One scripted outcome for a handler attempt.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Step {
    Succeed,
    FailTransient,
    Conflict,
}

/// Scriptable handler state shared across fresh handler instances.
///
/// Attempts consume the step sequence front to back and fall back to
/// `otherwise` once it is empty; every invocation is counted and its
/// parameter snapshot recorded.
pub(crate) struct Script {
    steps: Mutex<VecDeque<Step>>,
    otherwise: Step,
    calls: AtomicUsize,
    seen: Mutex<Vec<Parameters>>,
    pub(crate) constructions: Arc<AtomicUsize>,
}

impl Script {
    pub(crate) fn always(step: Step) -> Arc<Self> {
        Self::build(VecDeque::new(), step)
    }

    pub(crate) fn sequence(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Self::build(steps.into_iter().collect(), Step::Succeed)
    }

    fn build(steps: VecDeque<Step>, otherwise: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps),
            otherwise,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            constructions: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Register this script under `kind`; each resolve constructs a fresh
    /// handler sharing the script state.
    pub(crate) fn register(self: &Arc<Self>, registry: &mut HandlerRegistry, kind: &str) {
        let script = Arc::clone(self);
        registry.register(kind, move || {
            script.constructions.fetch_add(1, Ordering::SeqCst);
            Box::new(ScriptedHandler {
                script: Arc::clone(&script),
            }) as Box<dyn Handler>
        });
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<Parameters> {
        self.seen.lock().expect("seen mutex poisoned").clone()
    }

    fn next(&self) -> Step {
        self.steps
            .lock()
            .expect("steps mutex poisoned")
            .pop_front()
            .unwrap_or(self.otherwise)
    }
}

pub(crate) struct ScriptedHandler {
    script: Arc<Script>,
}

#[async_trait]
impl Handler for ScriptedHandler {
    async fn run(
        &self,
        _cancel: &CancellationToken,
        _client: &dyn ClusterClient,
        _namespace: &str,
        task_name: &str,
        parameters: &Parameters,
        _worker_index: usize,
    ) -> Result<(), TaskError> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .seen
            .lock()
            .expect("seen mutex poisoned")
            .push(parameters.clone());

        match self.script.next() {
            Step::Succeed => Ok(()),
            Step::FailTransient => Err(TaskError::Cluster(ClusterError::Api(format!(
                "transient failure for {task_name}"
            )))),
            Step::Conflict => Err(TaskError::Cluster(ClusterError::Conflict {
                kind: "pod",
                name: task_name.to_string(),
                message: "the object has been modified".to_string(),
            })),
        }
    }
}

/// Run a handler once against the stub cluster with empty parameters.
pub(crate) async fn run_handler(handler: &dyn Handler, task_name: &str) -> Result<(), TaskError> {
    let cancel = CancellationToken::new();
    let cluster = StubCluster::with_pod("p", "v2");
    let parameters = Parameters::new();
    handler
        .run(&cancel, &cluster, "default", task_name, &parameters, 0)
        .await
}

/// Build a task with the given retry settings and empty parameters.
pub(crate) fn task_named(name: &str, kind: &str, max_retries: u32, delay_ms: u64) -> Task {
    Task {
        name: name.to_string(),
        ships_namespace: "default".to_string(),
        kind: kind.to_string(),
        max_retries,
        retry_delay: format!("{delay_ms}ms"),
        retry_delay_duration: Duration::from_millis(delay_ms),
        parameters: Parameters::new(),
    }
}
