// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::graph::BuildGraph;
use crate::dag::run::{BuildRun, TaskOutcome};
use crate::errors::{ConfigError, Diagnostic};
use crate::exec::TaskExecutor;
use crate::types::TaskName;

/// Executes build runs over a finalized [`BuildGraph`].
///
/// The scheduler is responsible for:
/// - planning the closure of the requested targets
/// - dispatching tasks whose dependencies all succeeded
/// - bounding the number of tasks executing at once
/// - skipping dependents of failed tasks
///
/// Runs are independent: each call to [`Scheduler::run`] builds its own
/// [`BuildRun`], so nothing leaks from one run into the next.
pub struct Scheduler {
    graph: Arc<BuildGraph>,
    executor: Arc<dyn TaskExecutor>,
    permits: Arc<Semaphore>,
    concurrency: usize,
    /// Monotonically increasing run ID.
    run_counter: AtomicU64,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.graph.len())
            .field("concurrency", &self.concurrency)
            .field("run_counter", &self.run_counter)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// `concurrency` of zero is treated as one.
    pub fn new(graph: Arc<BuildGraph>, executor: Arc<dyn TaskExecutor>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            graph,
            executor,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            run_counter: AtomicU64::new(0),
        }
    }

    pub fn graph(&self) -> &Arc<BuildGraph> {
        &self.graph
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Plan a run without executing it.
    pub fn plan<I, S>(&self, targets: I) -> Result<BuildRun, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;
        BuildRun::plan(&self.graph, id, targets)
    }

    /// Run the closure of `targets` to completion.
    ///
    /// Returns `Err` only when a target is unknown; task failures are
    /// recorded in the returned [`BuildRun`].
    pub async fn run<I, S>(&self, targets: I) -> Result<BuildRun, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let mut run = self.plan(targets)?;
        info!(run_id = run.id(), tasks = run.len(), "starting build run");

        let mut in_flight: JoinSet<TaskOutcome> = JoinSet::new();
        let mut names: HashMap<tokio::task::Id, TaskName> = HashMap::new();

        loop {
            for name in run.start_ready() {
                self.dispatch(&mut in_flight, &mut names, run.id(), name);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            let (name, outcome) = match joined {
                Ok((id, outcome)) => (names.remove(&id), outcome),
                Err(err) => {
                    let outcome = TaskOutcome::Failed(Diagnostic::new(format!(
                        "task execution aborted: {err}"
                    )));
                    (names.remove(&err.id()), outcome)
                }
            };

            let Some(name) = name else {
                warn!(run_id = run.id(), "completion for unknown worker; ignoring");
                continue;
            };

            match &outcome {
                TaskOutcome::Succeeded { written } => {
                    debug!(run_id = run.id(), task = %name, written = written.len(), "task succeeded");
                }
                TaskOutcome::Failed(diagnostic) => {
                    warn!(run_id = run.id(), task = %name, error = %diagnostic, "task failed");
                }
            }

            let skipped = run.record_outcome(&name, outcome);
            if !skipped.is_empty() {
                debug!(run_id = run.id(), upstream = %name, ?skipped, "skipped dependents");
            }
        }

        info!(run_id = run.id(), summary = %run, "build run finished");
        Ok(run)
    }

    fn dispatch(
        &self,
        in_flight: &mut JoinSet<TaskOutcome>,
        names: &mut HashMap<tokio::task::Id, TaskName>,
        run_id: u64,
        name: TaskName,
    ) {
        let task = self.graph.task(&name).cloned();
        let executor = Arc::clone(&self.executor);
        let permits = Arc::clone(&self.permits);
        let task_name = name.clone();

        let handle = in_flight.spawn(async move {
            let Some(task) = task else {
                return TaskOutcome::Failed(Diagnostic::new(format!(
                    "task '{task_name}' is not part of the graph"
                )));
            };
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return TaskOutcome::Failed(Diagnostic::new("worker pool closed"));
                }
            };
            debug!(run_id, task = %task_name, "executing task");
            executor.execute(task).await
        });

        names.insert(handle.id(), name);
    }
}
