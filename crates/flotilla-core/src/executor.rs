use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use flotilla_model::Task;

use crate::{
    claims::ClaimSet,
    client::ClusterClient,
    error::TaskError,
    registry::HandlerRegistry,
    resolve::refresh_resource_version,
    retry::RetryPolicy,
};

/// Drive a single task to a terminal outcome: claim, dispatch, retry,
/// classify, emit.
///
/// The flow:
/// 1. claim the task name; losers return without a result;
/// 2. fail fast on unregistered kinds (every attempt would fail the same
///    way);
/// 3. run the handler under the task's retry policy;
/// 4. on a conflict, refresh the pod's resource version and restart the
///    policy from attempt one, at most `max_retries` refreshes;
/// 5. emit exactly one terminal line. Terminal errors release the claim so a
///    later run can pick the task up again; success and cancellation keep it.
#[instrument(level = "debug", skip_all, fields(task = %task.name, worker = worker_index))]
pub async fn process_task(
    cancel: &CancellationToken,
    client: &dyn ClusterClient,
    registry: &HandlerRegistry,
    claims: &ClaimSet,
    results: &mpsc::Sender<String>,
    task: &Task,
    worker_index: usize,
) {
    if !claims.claim(&task.name) {
        trace!("task already claimed; skipping");
        return;
    }

    if !registry.contains(&task.kind) {
        let err = TaskError::UnknownTaskType(task.kind.clone());
        claims.release(&task.name);
        emit(results, failure_line(worker_index, &task.name, &err)).await;
        return;
    }

    // The resolver mutates the parameter map between rounds; the claim makes
    // this worker the only reader, so a private copy is enough.
    let mut task = task.clone();
    let policy = RetryPolicy::for_task(&task);
    let mut refreshes = 0u32;

    loop {
        // Conflicts are intercepted inside the attempt so the retry policy
        // stays blind to error kinds: sleeping on a stale resource version
        // cannot help, the state has to be refreshed first.
        let conflict: Arc<Mutex<Option<TaskError>>> = Arc::new(Mutex::new(None));

        let outcome = policy
            .execute(cancel, || {
                let conflict = Arc::clone(&conflict);
                let task = &task;
                async move {
                    let handler = registry.resolve(&task.kind)?;
                    match handler
                        .run(
                            cancel,
                            client,
                            &task.ships_namespace,
                            &task.name,
                            &task.parameters,
                            worker_index,
                        )
                        .await
                    {
                        Err(err) if err.is_conflict() => {
                            *conflict.lock().expect("conflict slot mutex poisoned") = Some(err);
                            Ok(())
                        }
                        other => other,
                    }
                }
            })
            .await;

        match outcome {
            Ok(()) => {
                let conflict = conflict.lock().expect("conflict slot mutex poisoned").take();
                let Some(conflict_err) = conflict else {
                    emit(results, success_line(worker_index, &task.name)).await;
                    // Claim retained: other workers walking the same batch
                    // must not re-run a finished task.
                    return;
                };

                if refreshes >= policy.max_retries {
                    debug!(refreshes, "conflict refresh budget exhausted");
                    claims.release(&task.name);
                    emit(results, failure_line(worker_index, &task.name, &conflict_err)).await;
                    return;
                }
                refreshes += 1;
                debug!(refreshes, "conflict detected; refreshing resource version");
                if let Err(refresh_err) = refresh_resource_version(client, &mut task).await {
                    claims.release(&task.name);
                    emit(results, failure_line(worker_index, &task.name, &refresh_err)).await;
                    return;
                }
                // Fresh state in hand: restart the policy from attempt one.
            }
            Err(TaskError::Canceled) => {
                // Cancelled work is not rerunnable in this run; keep the
                // claim.
                emit(results, canceled_line(worker_index, &task.name)).await;
                return;
            }
            Err(err) => {
                claims.release(&task.name);
                emit(results, failure_line(worker_index, &task.name, &err)).await;
                return;
            }
        }
    }
}

fn success_line(worker: usize, name: &str) -> String {
    format!("Crew Worker {worker}: Task '{name}' completed successfully.")
}

fn failure_line(worker: usize, name: &str, err: &TaskError) -> String {
    format!("Crew Worker {worker}: Failed to complete task '{name}': {err}")
}

fn canceled_line(worker: usize, name: &str) -> String {
    format!("Crew Worker {worker}: Task '{name}' canceled: context canceled.")
}

/// Report a terminal line. The channel is sized for one terminal line per
/// task, so a send only fails once the consumer dropped the stream; the line
/// is dropped in that case.
async fn emit(results: &mpsc::Sender<String>, line: String) {
    let _ = results.send(line).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use flotilla_model::keys;

    use super::process_task;
    use crate::claims::ClaimSet;
    use crate::registry::HandlerRegistry;
    use crate::testutil::{task_named, Script, Step, StubCluster};

    struct Rig {
        cancel: CancellationToken,
        cluster: StubCluster,
        registry: HandlerRegistry,
        claims: ClaimSet,
        results: mpsc::Sender<String>,
        stream: mpsc::Receiver<String>,
    }

    impl Rig {
        fn new() -> Self {
            let (results, stream) = mpsc::channel(16);
            Self {
                cancel: CancellationToken::new(),
                cluster: StubCluster::with_pod("p", "v2"),
                registry: HandlerRegistry::new(),
                claims: ClaimSet::new(),
                results,
                stream,
            }
        }

        async fn run(&mut self, task: &flotilla_model::Task, worker_index: usize) {
            process_task(
                &self.cancel,
                &self.cluster,
                &self.registry,
                &self.claims,
                &self.results,
                task,
                worker_index,
            )
            .await;
        }

        fn lines(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            while let Ok(line) = self.stream.try_recv() {
                out.push(line);
            }
            out
        }
    }

    #[tokio::test]
    async fn happy_task_emits_one_success_line() {
        let mut rig = Rig::new();
        let script = Script::always(Step::Succeed);
        script.register(&mut rig.registry, "NoopOk");

        let task = task_named("t1", "NoopOk", 3, 10);
        rig.run(&task, 7).await;

        assert_eq!(script.calls(), 1);
        assert_eq!(
            rig.lines(),
            vec!["Crew Worker 7: Task 't1' completed successfully.".to_string()]
        );
        // Success retains the claim.
        assert!(!rig.claims.claim("t1"));
    }

    #[tokio::test]
    async fn terminal_failure_reports_the_attempt_count_and_releases() {
        let mut rig = Rig::new();
        let script = Script::always(Step::FailTransient);
        script.register(&mut rig.registry, "FailForever");

        let task = task_named("t2", "FailForever", 3, 1);
        rig.run(&task, 0).await;

        assert_eq!(script.calls(), 3);
        let lines = rig.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("'t2'"), "line: {}", lines[0]);
        assert!(lines[0].contains("3 attempts"), "line: {}", lines[0]);
        // Terminal failure releases the claim.
        assert!(rig.claims.claim("t2"));
    }

    #[tokio::test]
    async fn transient_then_success_uses_three_attempts() {
        let mut rig = Rig::new();
        let script = Script::sequence([Step::FailTransient, Step::FailTransient, Step::Succeed]);
        script.register(&mut rig.registry, "Flaky");

        let task = task_named("t3", "Flaky", 3, 1);
        rig.run(&task, 1).await;

        assert_eq!(script.calls(), 3);
        let lines = rig.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("completed successfully"), "line: {}", lines[0]);
    }

    #[tokio::test]
    async fn conflict_refresh_feeds_the_next_attempt() {
        let mut rig = Rig::new();
        let script = Script::sequence([Step::Conflict, Step::Succeed]);
        script.register(&mut rig.registry, "PodLabel");

        let mut task = task_named("t5", "PodLabel", 2, 1);
        task.parameters.set(keys::POD_NAME, "p");
        rig.run(&task, 0).await;

        assert_eq!(script.calls(), 2);
        let seen = script.seen();
        assert!(
            seen[0].get(keys::RESOURCE_VERSION).is_none(),
            "first attempt must run on the original parameters"
        );
        assert_eq!(
            seen[1].get_str(keys::RESOURCE_VERSION).unwrap(),
            "v2",
            "second attempt must observe the refreshed resource version"
        );
        let lines = rig.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("completed successfully"), "line: {}", lines[0]);
    }

    #[tokio::test]
    async fn persistent_conflicts_stop_at_the_refresh_budget() {
        let mut rig = Rig::new();
        let script = Script::always(Step::Conflict);
        script.register(&mut rig.registry, "PodLabel");

        let mut task = task_named("t5", "PodLabel", 2, 1);
        task.parameters.set(keys::POD_NAME, "p");
        rig.run(&task, 0).await;

        // One initial round plus `max_retries` refreshed rounds; a conflict
        // ends each round after a single invocation.
        assert_eq!(script.calls(), 3);
        let lines = rig.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("conflict"), "line: {}", lines[0]);
        assert!(rig.claims.claim("t5"), "terminal conflict must release");
    }

    #[tokio::test]
    async fn failed_refresh_is_terminal() {
        let mut rig = Rig::new();
        let script = Script::always(Step::Conflict);
        script.register(&mut rig.registry, "PodLabel");

        // No podName parameter: the resolver cannot refresh.
        let task = task_named("t6", "PodLabel", 2, 1);
        rig.run(&task, 0).await;

        assert_eq!(script.calls(), 1);
        let lines = rig.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("podName"), "line: {}", lines[0]);
    }

    #[tokio::test]
    async fn unknown_kind_fails_fast_without_attempts() {
        let mut rig = Rig::new();
        let task = task_named("t7", "NoSuchKind", 3, 1);
        rig.run(&task, 0).await;

        let lines = rig.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("unknown task type"), "line: {}", lines[0]);
        assert!(rig.claims.claim("t7"), "unknown kind must release");
    }

    #[tokio::test]
    async fn lost_claim_skips_without_a_result() {
        let mut rig = Rig::new();
        let script = Script::always(Step::Succeed);
        script.register(&mut rig.registry, "NoopOk");

        let task = task_named("t8", "NoopOk", 3, 1);
        assert!(rig.claims.claim("t8"));
        rig.run(&task, 0).await;

        assert_eq!(script.calls(), 0);
        assert!(rig.lines().is_empty());
    }

    #[tokio::test]
    async fn cancellation_emits_a_cancellation_line_and_keeps_the_claim() {
        let mut rig = Rig::new();
        let script = Script::always(Step::FailTransient);
        script.register(&mut rig.registry, "Slow");
        rig.cancel.cancel();

        let task = task_named("t9", "Slow", 5, 1_000);
        rig.run(&task, 2).await;

        assert_eq!(script.calls(), 0);
        let lines = rig.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("canceled"), "line: {}", lines[0]);
        assert!(!rig.claims.claim("t9"), "cancelled task keeps its claim");
    }

    #[tokio::test]
    async fn handlers_are_constructed_fresh_per_attempt() {
        let mut rig = Rig::new();
        let script = Script::sequence([Step::FailTransient, Step::Succeed]);
        let constructions = Arc::clone(&script.constructions);
        script.register(&mut rig.registry, "Flaky");

        let task = task_named("t10", "Flaky", 3, 1);
        rig.run(&task, 0).await;

        assert_eq!(script.calls(), 2);
        assert_eq!(
            constructions.load(std::sync::atomic::Ordering::SeqCst),
            2,
            "each attempt resolves a fresh handler"
        );
    }
}
