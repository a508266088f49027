// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::dag::BuildRun;
use crate::engine::queue::RebuildQueue;
use crate::engine::{RuntimeOptions, TriggerReason};
use crate::errors::ConfigError;
use crate::types::{ExitStatus, PipelineMode, TaskName};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Start a scheduler run over the closure of these targets.
    StartRun {
        targets: BTreeSet<TaskName>,
        reason: TriggerReason,
    },
    /// Log the outcome of a finished run.
    Report(Arc<BuildRun>),
    /// Forward a finished run to the reload notifier.
    Notify(Arc<BuildRun>),
    /// Stop the runtime with this status.
    RequestExit(ExitStatus),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn exit(mut commands: Vec<CoreCommand>, status: ExitStatus) -> Self {
        commands.push(CoreCommand::RequestExit(status));
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Mutable orchestration state shared by the handlers.
#[derive(Debug, Default)]
pub(crate) struct CoreState {
    pub(crate) queue: RebuildQueue,
    /// Whether a run is currently executing.
    pub(crate) running: bool,
    pub(crate) runs_finished: u64,
    pub(crate) any_failed: bool,
}

impl CoreState {
    fn exit_status(&self) -> ExitStatus {
        if self.any_failed {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }
}

/// Handle a rebuild request.
///
/// - If no run is active, start one immediately.
/// - Otherwise merge the request into the queued batch; it runs once the
///   current run finishes. Runs are never interrupted.
pub(crate) fn handle_rebuild_request(
    state: &mut CoreState,
    targets: BTreeSet<TaskName>,
    reason: TriggerReason,
) -> CoreStep {
    if targets.is_empty() {
        return CoreStep::continue_with(Vec::new());
    }

    if state.running {
        info!(?targets, ?reason, "build in progress; deferring rebuild request");
        state.queue.record(targets, reason);
        return CoreStep::continue_with(Vec::new());
    }

    state.running = true;
    CoreStep::continue_with(vec![CoreCommand::StartRun { targets, reason }])
}

/// Handle a finished run: report it, notify clients in watch mode, then
/// either start the queued batch or (build-once) exit when idle.
pub(crate) fn handle_run_finished(
    state: &mut CoreState,
    options: &RuntimeOptions,
    run: Arc<BuildRun>,
) -> CoreStep {
    state.running = false;
    state.runs_finished += 1;
    state.any_failed |= run.has_failures();

    let mut commands = vec![CoreCommand::Report(Arc::clone(&run))];
    if options.mode == PipelineMode::Watch {
        commands.push(CoreCommand::Notify(run));
    }

    finish_step(state, options, commands)
}

/// Handle a run that could not be planned.
pub(crate) fn handle_run_rejected(
    state: &mut CoreState,
    options: &RuntimeOptions,
    targets: BTreeSet<TaskName>,
    err: ConfigError,
) -> CoreStep {
    error!(?targets, error = %err, "build run rejected");
    state.running = false;
    state.any_failed = true;
    finish_step(state, options, Vec::new())
}

/// Handle a watcher failure. Watching cannot continue, so the runtime stops.
pub(crate) fn handle_watch_failed(state: &mut CoreState, error: String) -> CoreStep {
    error!(error = %error, "file watcher failed; stopping");
    state.any_failed = true;
    CoreStep::exit(Vec::new(), ExitStatus::Failure)
}

/// Handle a shutdown request.
pub(crate) fn handle_shutdown(state: &mut CoreState, options: &RuntimeOptions) -> CoreStep {
    info!("shutdown requested");
    let status = match options.mode {
        // Ctrl-C while watching is a normal way to stop.
        PipelineMode::Watch => ExitStatus::Success,
        PipelineMode::BuildOnce => {
            if state.running {
                warn!("shutdown requested before the build finished");
                ExitStatus::Failure
            } else {
                state.exit_status()
            }
        }
    };
    CoreStep::exit(Vec::new(), status)
}

fn finish_step(
    state: &mut CoreState,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    if let Some((targets, reason)) = state.queue.drain() {
        state.running = true;
        commands.push(CoreCommand::StartRun { targets, reason });
        return CoreStep::continue_with(commands);
    }

    if options.mode == PipelineMode::BuildOnce {
        return CoreStep::exit(commands, state.exit_status());
    }

    CoreStep::continue_with(commands)
}
