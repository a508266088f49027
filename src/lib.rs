// src/lib.rs

pub mod adapters;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod reload;
pub mod types;
pub mod watch;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::ConfigFile;
use crate::config::loader::load_or_default;
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::ActionExecutor;
use crate::fs::{RealFileSystem, expand_globs};
use crate::reload::ReloadNotifier;
use crate::types::{ExitStatus, PipelineMode, TaskName};
use crate::watch::{ContentFilter, Debouncer, WatchSubscriptions, spawn_watcher};

/// Name of the task `build --clean` runs first.
const CLEAN_TASK: &str = "clean";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - scheduler / executor / runtime
/// - (serve only) file watcher, debouncer, live-reload and HTTP servers
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<ExitStatus> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading pipeline from {}", config_path.display()))?;
    let root = config_root_dir(&config_path);

    match args.command {
        Command::Plan => {
            print_plan(&cfg);
            Ok(ExitStatus::Success)
        }
        Command::Build { clean, targets } => {
            let targets = pick_targets(targets, cfg.targets());
            run_build(&cfg, &root, clean, targets).await
        }
        Command::Serve { targets } => {
            let targets = pick_targets(targets, cfg.serve_targets());
            run_serve(&cfg, &root, targets).await
        }
    }
}

fn pick_targets(cli: Vec<String>, configured: &[TaskName]) -> BTreeSet<TaskName> {
    if cli.is_empty() {
        configured.iter().cloned().collect()
    } else {
        cli.into_iter().collect()
    }
}

fn make_scheduler(cfg: &ConfigFile, root: &Path) -> Arc<Scheduler> {
    let executor = Arc::new(ActionExecutor::new(root));
    Arc::new(Scheduler::new(
        cfg.graph().clone(),
        executor,
        cfg.config.effective_concurrency(),
    ))
}

async fn run_build(
    cfg: &ConfigFile,
    root: &Path,
    clean: bool,
    targets: BTreeSet<TaskName>,
) -> Result<ExitStatus> {
    if clean && !cfg.graph().contains(CLEAN_TASK) {
        bail!("--clean requested but the pipeline has no '{CLEAN_TASK}' task");
    }

    let scheduler = make_scheduler(cfg, root);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    spawn_ctrl_c(rt_tx.clone());

    if clean {
        rt_tx
            .send(RuntimeEvent::RebuildRequested {
                targets: BTreeSet::from([CLEAN_TASK.to_string()]),
                reason: TriggerReason::Manual,
            })
            .await?;
    }
    info!(?targets, concurrency = scheduler.concurrency(), "building");
    rt_tx
        .send(RuntimeEvent::RebuildRequested {
            targets,
            reason: TriggerReason::Initial,
        })
        .await?;

    let core = CoreRuntime::new(RuntimeOptions {
        mode: PipelineMode::BuildOnce,
    });
    let runtime = Runtime::new(core, rt_tx, rt_rx, scheduler).with_size_report(root);
    Ok(runtime.run().await)
}

async fn run_serve(
    cfg: &ConfigFile,
    root: &Path,
    targets: BTreeSet<TaskName>,
) -> Result<ExitStatus> {
    let scheduler = make_scheduler(cfg, root);
    let closure = cfg.graph().closure(&targets)?;
    let subscriptions = WatchSubscriptions::from_graph(cfg.graph(), &closure)?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    spawn_ctrl_c(rt_tx.clone());

    // Live reload: WebSocket clients + static HTTP server.
    let notifier = Arc::new(ReloadNotifier::new(cfg.serve.roots.clone()));
    let (listener, livereload_port) = reload::server::bind(cfg.serve.livereload_port)?;
    info!(port = livereload_port, "live-reload server listening");
    let _accept = reload::server::spawn_accept_loop(listener, notifier.clone());

    let served: Vec<PathBuf> = cfg.serve.roots.iter().map(|r| root.join(r)).collect();
    let mounts = cfg
        .serve
        .mounts
        .iter()
        .map(|(prefix, dir)| (prefix.clone(), root.join(dir)))
        .collect();
    let (addr, _http) =
        reload::http::spawn_server(served, mounts, cfg.serve.port, livereload_port).await?;
    info!(url = %format!("http://{addr}/"), "serving");

    // Watch + debounce.
    let (change_tx, change_rx) = mpsc::unbounded_channel();
    let watcher = match spawn_watcher(root, &subscriptions.watch_roots(), change_tx) {
        Ok(handle) => Some(handle),
        Err(err) => {
            rt_tx
                .send(RuntimeEvent::WatchFailed {
                    error: err.to_string(),
                })
                .await?;
            None
        }
    };

    let window = Duration::from_millis(cfg.config.debounce_ms);
    let mut debouncer = Debouncer::new(root, subscriptions.clone(), window);
    if cfg.config.skip_unchanged {
        debouncer = debouncer.with_content_filter(prime_filter(root, &subscriptions));
    }
    let _debounce = debouncer.spawn(change_rx, rt_tx.clone());

    rt_tx
        .send(RuntimeEvent::RebuildRequested {
            targets,
            reason: TriggerReason::Initial,
        })
        .await?;

    let core = CoreRuntime::new(RuntimeOptions {
        mode: PipelineMode::Watch,
    });
    let runtime = Runtime::new(core, rt_tx, rt_rx, scheduler).with_notifier(notifier);
    let status = runtime.run().await;
    drop(watcher);
    Ok(status)
}

/// Hash every currently watched file so the first save with identical
/// content is already filtered.
fn prime_filter(root: &Path, subscriptions: &WatchSubscriptions) -> ContentFilter {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut filter = ContentFilter::new();
    for sub in subscriptions.iter() {
        match expand_globs(&RealFileSystem, &root, sub.patterns()) {
            Ok(files) => files.iter().for_each(|f| filter.prime(&f.path)),
            Err(err) => warn!(task = sub.task(), error = %err, "could not prime content hashes"),
        }
    }
    filter
}

fn spawn_ctrl_c(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetpipe.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print tasks, dependencies, inputs and layers; runs nothing.
fn print_plan(cfg: &ConfigFile) {
    let graph = cfg.graph();
    println!("assetpipe plan");
    println!("  config.debounce_ms = {}", cfg.config.debounce_ms);
    println!(
        "  config.concurrency = {}",
        cfg.config.effective_concurrency()
    );
    println!("  targets = {:?}", cfg.targets());
    println!("  serve.targets = {:?}", cfg.serve_targets());
    println!();

    println!("tasks ({}):", graph.len());
    for name in graph.topological_order() {
        let Some(task) = graph.task(name) else {
            continue;
        };
        println!("  - {name} ({})", task.kind().as_str());
        let deps = graph.dependencies_of(name);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
        if !task.inputs.is_empty() {
            println!("      inputs: {:?}", task.inputs);
        }
        if !task.entries.is_empty() {
            println!("      entries: {:?}", task.entries);
        }
        if let Some(output) = &task.output {
            println!("      output: {}", output.display());
        }
    }
    println!();

    println!("layers:");
    for (i, layer) in graph.layers().iter().enumerate() {
        println!("  {i}: {}", layer.join(", "));
    }

    debug!("plan complete (no execution)");
}
