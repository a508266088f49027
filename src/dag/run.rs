// src/dag/run.rs

//! Per-run task state: one scheduled execution attempt over a target closure.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::dag::graph::BuildGraph;
use crate::errors::{ConfigError, Diagnostic};
use crate::types::TaskName;

/// Status of a task inside a single [`BuildRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStatus {
    /// Waiting on dependencies (or on a worker).
    Pending,
    /// Dispatched to the executor.
    Running,
    Succeeded,
    Failed,
    /// Never started because a dependency failed.
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

/// What the executor reports for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Paths (relative to the project root) of the artifacts produced.
    Succeeded { written: Vec<PathBuf> },
    Failed(Diagnostic),
}

/// Final (or current) state of one task in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub status: TaskStatus,
    pub written: Vec<PathBuf>,
    pub diagnostic: Option<Diagnostic>,
}

#[derive(Debug, Clone)]
struct RunEntry {
    deps: Vec<TaskName>,
    dependents: Vec<TaskName>,
    report: TaskReport,
}

/// One invocation of the scheduler for a target task set.
///
/// Covers exactly the transitive closure of `requested` over `depends_on`.
/// Transitions are `Pending -> Running -> Succeeded | Failed`, or
/// `Pending -> Skipped` once any dependency fails.
#[derive(Debug, Clone)]
pub struct BuildRun {
    id: u64,
    requested: BTreeSet<TaskName>,
    entries: BTreeMap<TaskName, RunEntry>,
}

impl BuildRun {
    /// Plan a run: compute the closure of `requested` and mark it `Pending`.
    pub fn plan<I, S>(graph: &BuildGraph, id: u64, requested: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let requested: BTreeSet<TaskName> = requested.into_iter().map(Into::into).collect();
        let closure = graph.closure(&requested)?;

        let entries = closure
            .iter()
            .map(|name| {
                let entry = RunEntry {
                    deps: graph.dependencies_of(name).to_vec(),
                    dependents: graph
                        .dependents_of(name)
                        .iter()
                        .filter(|d| closure.contains(*d))
                        .cloned()
                        .collect(),
                    report: TaskReport {
                        status: TaskStatus::Pending,
                        written: Vec::new(),
                        diagnostic: None,
                    },
                };
                (name.clone(), entry)
            })
            .collect();

        debug!(run_id = id, ?requested, closure = closure.len(), "planned build run");

        Ok(Self {
            id,
            requested,
            entries,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Task names explicitly asked for.
    pub fn requested(&self) -> &BTreeSet<TaskName> {
        &self.requested
    }

    /// Every task participating in this run.
    pub fn closure(&self) -> BTreeSet<TaskName> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.entries.get(task).map(|e| e.report.status)
    }

    pub fn report(&self, task: &str) -> Option<&TaskReport> {
        self.entries.get(task).map(|e| &e.report)
    }

    /// `(name, report)` pairs ordered by task name.
    pub fn reports(&self) -> impl Iterator<Item = (&str, &TaskReport)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), &e.report))
    }

    /// Names of tasks currently in `status`.
    pub fn with_status(&self, status: TaskStatus) -> BTreeSet<TaskName> {
        self.entries
            .iter()
            .filter(|(_, e)| e.report.status == status)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.entries.values().all(|e| e.report.status.is_terminal())
    }

    pub fn has_failures(&self) -> bool {
        self.entries
            .values()
            .any(|e| e.report.status == TaskStatus::Failed)
    }

    /// Mark every `Pending` task whose dependencies all succeeded as
    /// `Running` and return their names.
    pub fn start_ready(&mut self) -> Vec<TaskName> {
        let ready: Vec<TaskName> = self
            .entries
            .iter()
            .filter(|(_, e)| e.report.status == TaskStatus::Pending)
            .filter(|(_, e)| {
                e.deps.iter().all(|dep| {
                    self.entries
                        .get(dep)
                        .is_some_and(|d| d.report.status == TaskStatus::Succeeded)
                })
            })
            .map(|(n, _)| n.clone())
            .collect();

        for name in ready.iter() {
            if let Some(entry) = self.entries.get_mut(name) {
                entry.report.status = TaskStatus::Running;
                debug!(run_id = self.id, task = %name, "dependencies satisfied; marking Running");
            }
        }

        ready
    }

    /// Record the outcome of a running task.
    ///
    /// On failure every pending dependent in this run is transitively marked
    /// `Skipped`; their names are returned.
    pub fn record_outcome(&mut self, task: &str, outcome: TaskOutcome) -> Vec<TaskName> {
        let Some(entry) = self.entries.get_mut(task) else {
            warn!(run_id = self.id, task = %task, "outcome for task outside this run; ignoring");
            return Vec::new();
        };

        if entry.report.status != TaskStatus::Running {
            warn!(
                run_id = self.id,
                task = %task,
                status = ?entry.report.status,
                "outcome for task that is not running; ignoring"
            );
            return Vec::new();
        }

        match outcome {
            TaskOutcome::Succeeded { written } => {
                entry.report.status = TaskStatus::Succeeded;
                entry.report.written = written;
                Vec::new()
            }
            TaskOutcome::Failed(diagnostic) => {
                entry.report.status = TaskStatus::Failed;
                entry.report.diagnostic = Some(diagnostic);
                self.skip_dependents_of(task)
            }
        }
    }

    fn skip_dependents_of(&mut self, failed: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self
            .entries
            .get(failed)
            .map(|e| e.dependents.clone())
            .unwrap_or_default();
        let mut skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(entry) = self.entries.get_mut(&name) {
                if entry.report.status == TaskStatus::Pending {
                    entry.report.status = TaskStatus::Skipped;
                    debug!(
                        run_id = self.id,
                        task = %name,
                        upstream = %failed,
                        "skipping task due to upstream failure"
                    );
                    stack.extend(entry.dependents.iter().cloned());
                    skipped.push(name);
                }
            }
        }

        skipped
    }
}

impl fmt::Display for BuildRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |status| self.entries.values().filter(|e| e.report.status == status).count();
        write!(
            f,
            "run {}: {} succeeded, {} failed, {} skipped",
            self.id,
            count(TaskStatus::Succeeded),
            count(TaskStatus::Failed),
            count(TaskStatus::Skipped),
        )?;
        let unfinished = count(TaskStatus::Pending) + count(TaskStatus::Running);
        if unfinished > 0 {
            write!(f, ", {unfinished} unfinished")?;
        }
        Ok(())
    }
}
