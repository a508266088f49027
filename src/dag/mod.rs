// src/dag/mod.rs

//! Task registry, dependency graph and scheduling.
//!
//! - [`task`] defines a task and the action it runs.
//! - [`registry`] collects tasks and validates them into a [`BuildGraph`].
//! - [`graph`] is the immutable, acyclic task graph.
//! - [`run`] holds the per-run state machine.
//! - [`scheduler`] executes runs with bounded concurrency.

pub mod graph;
pub mod registry;
pub mod run;
pub mod scheduler;
pub mod task;

pub use graph::BuildGraph;
pub use registry::TaskRegistry;
pub use run::{BuildRun, TaskOutcome, TaskReport, TaskStatus};
pub use scheduler::Scheduler;
pub use task::{ActionKind, Task, TaskAction};
