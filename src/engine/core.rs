// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for
//! running the scheduler, pushing reload messages and handling Ctrl+C.
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use crate::engine::event_handlers::{
    CoreState, CoreStep, handle_rebuild_request, handle_run_finished, handle_run_rejected,
    handle_shutdown, handle_watch_failed,
};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::{ExitStatus, TaskName};

/// Pure core runtime state.
///
/// It has no channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    state: CoreState,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            state: CoreState::default(),
            options,
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Whether no run is executing.
    pub fn is_idle(&self) -> bool {
        !self.state.running
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.state.queue.is_empty()
    }

    /// Targets merged into the queued batch, if any.
    pub fn queued_targets(&self) -> Option<Vec<TaskName>> {
        self.state
            .queue
            .pending_targets()
            .map(|t| t.iter().cloned().collect())
    }

    pub fn runs_finished(&self) -> u64 {
        self.state.runs_finished
    }

    /// Status the process would exit with right now.
    pub fn exit_status(&self) -> ExitStatus {
        if self.state.any_failed {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::RebuildRequested { targets, reason } => {
                handle_rebuild_request(&mut self.state, targets, reason)
            }
            RuntimeEvent::RunFinished(run) => {
                handle_run_finished(&mut self.state, &self.options, run)
            }
            RuntimeEvent::RunRejected { targets, error } => {
                handle_run_rejected(&mut self.state, &self.options, targets, error)
            }
            RuntimeEvent::WatchFailed { error } => handle_watch_failed(&mut self.state, error),
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.state, &self.options),
        }
    }
}
