// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `TaskExecutor` trait and the production
//!   `ActionExecutor`, which dispatches a task's action to a compiler
//!   adapter on the blocking pool.
//! - [`command`] runs shell-command tasks with `tokio::process`.

pub mod backend;
pub mod command;

pub use backend::{ActionExecutor, ExecFuture, TaskExecutor};
pub use command::run_command;
