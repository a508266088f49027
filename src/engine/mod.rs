// src/engine/mod.rs

//! Pipeline orchestration.
//!
//! This module ties together:
//! - the scheduler (one `BuildRun` at a time)
//! - the rebuild queue (what happens when changes arrive while a run is
//!   active)
//! - the live-reload notifier
//! - the main runtime event loop that reacts to:
//!   - initial and file-watch rebuild requests
//!   - finished runs
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::dag::BuildRun;
use crate::errors::ConfigError;
use crate::types::{PipelineMode, TaskName};

/// Why a rebuild was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Startup build of the configured targets.
    Initial,
    /// Debounced filesystem changes.
    FileWatch,
    /// Explicit request (e.g. `build --clean`).
    Manual,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// `BuildOnce` exits once idle with nothing queued; `Watch` runs until
    /// shutdown and never exits on task failure.
    pub mode: PipelineMode,
}

/// Events flowing into the runtime from the watcher, scheduler runs, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Build the closure of these tasks.
    RebuildRequested {
        targets: BTreeSet<TaskName>,
        reason: TriggerReason,
    },
    /// A build run reached a terminal state for every task.
    RunFinished(Arc<BuildRun>),
    /// A run could not be planned (e.g. unknown target).
    RunRejected {
        targets: BTreeSet<TaskName>,
        error: ConfigError,
    },
    /// The file watcher stopped working.
    WatchFailed { error: String },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod report;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::RebuildQueue;
pub use runtime::Runtime;
