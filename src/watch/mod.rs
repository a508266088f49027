// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - compiling each task's input globs into a [`WatchSubscription`]
//! - wiring up a cross-platform filesystem watcher (`notify`), with a
//!   polling fallback
//! - debouncing bursts of changes into a single rebuild request
//! - (optionally) dropping events whose file content did not change
//!
//! It does not know about dependencies; it only turns filesystem changes
//! into the set of tasks to rebuild.

pub mod debounce;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::Debouncer;
pub use hash::{ContentFilter, compute_file_hash};
pub use patterns::{WatchSubscription, WatchSubscriptions};
pub use watcher::{WatcherHandle, change_events, spawn_watcher};
