use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use flotilla_core::{captain, HandlerRegistry};
use flotilla_kube::{register_default_handlers, KubeCluster};
use flotilla_model::load_tasks;
use flotilla_observe::{init_logger, LoggerConfig};

/// Crew runner: dispatches declarative Kubernetes tasks across a fixed pool
/// of workers and reports each task's outcome.
#[derive(Parser, Debug)]
#[command(name = "flotilla-agentd", version, about)]
struct Args {
    /// Path to the task file (.json, .yaml or .yml).
    #[arg(long)]
    tasks: PathBuf,

    /// Number of crew workers to launch.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Log level filter (e.g. "info", "flotilla_core=debug,info").
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: text, json or journald.
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logger = LoggerConfig {
        level: args.log_level.parse()?,
        format: args.log_format.parse()?,
        ..LoggerConfig::default()
    };
    init_logger(&logger)?;

    let tasks = load_tasks(&args.tasks)
        .with_context(|| format!("loading tasks from {}", args.tasks.display()))?;
    let total = tasks.len();
    info!(count = total, "tasks loaded");

    let client = Arc::new(
        KubeCluster::connect()
            .await
            .context("connecting to the cluster")?,
    );

    let mut registry = HandlerRegistry::new();
    register_default_handlers(&mut registry);

    let root = CancellationToken::new();
    let (mut results, shutdown) = captain(&root, client, Arc::new(registry), tasks, args.workers);
    let shutdown = Arc::new(shutdown);

    // First ctrl-c starts the graceful path; the loop below then drains the
    // stream to close. Calling shutdown twice is harmless.
    let interrupt = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; shutting down the crew");
            interrupt.shutdown();
        }
    });

    if total == 0 {
        shutdown.shutdown();
    }

    let mut reported = 0usize;
    while let Some(line) = results.recv().await {
        info!("{line}");
        reported += 1;
        if reported == total {
            info!("all tasks reported; shutting down the crew");
            shutdown.shutdown();
        }
    }

    info!(reported, "results channel closed");
    Ok(())
}
