//! Worker-pool entry point.
//!
//! Responsibilities:
//! - derives a cancellable child context from the caller's token;
//! - fans the task batch out across a fixed number of crew workers;
//! - hands the caller a results stream plus a shutdown handle that closes
//!   the stream exactly once, after every worker returned.

use std::sync::{Arc, Mutex};

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use flotilla_model::Task;

use crate::{
    claims::ClaimSet, client::ClusterClient, executor::process_task, registry::HandlerRegistry,
};

/// Handle returned by [`captain`]; cancels the crew and closes the stream.
pub struct Shutdown {
    cancel: CancellationToken,
    crew: Mutex<Option<Crew>>,
}

struct Crew {
    /// Keeps the results channel open until shutdown is requested; worker
    /// senders alone would close it as soon as the batch drains.
    keeper: mpsc::Sender<String>,
    workers: Vec<JoinHandle<()>>,
}

impl Shutdown {
    /// Trigger a graceful shutdown.
    ///
    /// Safe to call concurrently and more than once; only the first call has
    /// effect. Cancels the worker context, then waits for the crew in the
    /// background and closes the results channel once every worker returned,
    /// so the consumer can keep draining until the stream ends.
    pub fn shutdown(&self) {
        self.cancel.cancel();

        let crew = self.crew.lock().expect("shutdown mutex poisoned").take();
        if let Some(crew) = crew {
            tokio::spawn(async move {
                for worker in crew.workers {
                    let _ = worker.await;
                }
                debug!("all crew workers returned; closing the results channel");
                drop(crew.keeper);
            });
        }
    }
}

/// Launch `worker_count` crew workers over the task batch.
///
/// Every worker walks the full batch in input order; the claim set
/// guarantees each task is driven by exactly one of them. Results (one
/// terminal line per claimed task) arrive on the returned stream in
/// completion order, not input order.
///
/// The channel is bounded to one line per task plus slack, so producers
/// never block on a stalled consumer and the shutdown path cannot deadlock;
/// the stream stays open until [`Shutdown::shutdown`] is called, even after
/// the whole batch has completed.
///
/// Must be called from within a Tokio runtime.
pub fn captain(
    parent: &CancellationToken,
    client: Arc<dyn ClusterClient>,
    registry: Arc<HandlerRegistry>,
    tasks: Vec<Task>,
    worker_count: usize,
) -> (mpsc::Receiver<String>, Shutdown) {
    let cancel = parent.child_token();
    let (results, stream) = mpsc::channel(tasks.len() + worker_count + 1);
    let claims = Arc::new(ClaimSet::new());
    let tasks = Arc::new(tasks);

    let mut workers = Vec::with_capacity(worker_count);
    for worker_index in 0..worker_count {
        let cancel = cancel.clone();
        let client = Arc::clone(&client);
        let registry = Arc::clone(&registry);
        let claims = Arc::clone(&claims);
        let tasks = Arc::clone(&tasks);
        let results = results.clone();
        workers.push(tokio::spawn(async move {
            crew_worker(cancel, client, registry, claims, tasks, results, worker_index).await;
        }));
    }
    info!(
        workers = worker_count,
        tasks = tasks.len(),
        "crew launched"
    );

    let shutdown = Shutdown {
        cancel,
        crew: Mutex::new(Some(Crew {
            keeper: results,
            workers,
        })),
    };
    (stream, shutdown)
}

/// One concurrent agent: walks the batch in order and drives each task,
/// checking for cancellation between tasks.
async fn crew_worker(
    cancel: CancellationToken,
    client: Arc<dyn ClusterClient>,
    registry: Arc<HandlerRegistry>,
    claims: Arc<ClaimSet>,
    tasks: Arc<Vec<Task>>,
    results: mpsc::Sender<String>,
    worker_index: usize,
) {
    for task in tasks.iter() {
        if cancel.is_cancelled() {
            debug!(worker = worker_index, "context cancelled; crew worker stops");
            return;
        }
        process_task(
            &cancel,
            client.as_ref(),
            &registry,
            &claims,
            &results,
            task,
            worker_index,
        )
        .await;
    }
}
