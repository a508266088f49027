// src/exec/backend.rs

//! Pluggable task executor abstraction.
//!
//! The scheduler talks to a `TaskExecutor` instead of calling adapters
//! directly. Production code uses [`ActionExecutor`]; tests provide a fake
//! that records which tasks ran and scripts their outcomes.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::{self, Compilers, NativeCompilers};
use crate::dag::{Task, TaskAction, TaskOutcome};
use crate::errors::{CompilationError, Diagnostic};
use crate::fs::{FileSystem, RealFileSystem, expand_globs};

use super::command::run_command;

pub type ExecFuture = Pin<Box<dyn Future<Output = TaskOutcome> + Send + 'static>>;

/// Trait abstracting how a single task is executed.
///
/// Compilation problems are reported as [`TaskOutcome::Failed`], never as a
/// panic or an `Err`.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Arc<Task>) -> ExecFuture;
}

/// Runs a task's action against the real filesystem.
#[derive(Clone)]
pub struct ActionExecutor {
    root: PathBuf,
    compilers: Arc<dyn Compilers>,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ActionExecutor {
    /// Executor rooted at `root` using the in-process compilers.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Self {
            root: root.into(),
            compilers: Arc::new(NativeCompilers::new(Arc::clone(&fs))),
            fs,
        }
    }

    pub fn with_compilers(mut self, compilers: Arc<dyn Compilers>) -> Self {
        self.compilers = compilers;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TaskExecutor for ActionExecutor {
    fn execute(&self, task: Arc<Task>) -> ExecFuture {
        let this = self.clone();

        Box::pin(async move {
            info!(task = %task.name, action = task.kind().as_str(), "running task");

            match &task.action {
                TaskAction::Group => return TaskOutcome::Succeeded { written: Vec::new() },
                TaskAction::Command { cmd } => return run_command(&task.name, cmd, &this.root).await,
                _ => {}
            }

            let name = task.name.clone();
            match tokio::task::spawn_blocking(move || this.run_blocking(&task)).await {
                Ok(Ok(written)) => TaskOutcome::Succeeded { written },
                Ok(Err(err)) => TaskOutcome::Failed(err.diagnostic),
                Err(join_err) => TaskOutcome::Failed(Diagnostic::new(format!(
                    "task '{name}' panicked: {join_err}"
                ))),
            }
        })
    }
}

impl ActionExecutor {
    fn run_blocking(&self, task: &Task) -> Result<Vec<PathBuf>, CompilationError> {
        let fs = self.fs.as_ref();

        if let TaskAction::Clean { paths } = &task.action {
            for path in paths.iter() {
                let dir = self.root.join(path);
                debug!(task = %task.name, ?dir, "removing directory");
                fs.remove_dir_all(&dir)
                    .map_err(|e| CompilationError::at(&dir, e))?;
            }
            return Ok(Vec::new());
        }

        let sources = expand_globs(fs, &self.root, task.source_globs())
            .map_err(|e| CompilationError::from(Diagnostic::new(format!("{e:#}"))))?;
        let dest = match &task.output {
            Some(dir) => self.root.join(dir),
            None => {
                return Err(Diagnostic::new(format!(
                    "task '{}' has no output directory",
                    task.name
                ))
                .into());
            }
        };
        debug!(task = %task.name, sources = sources.len(), ?dest, "expanded inputs");

        let written = match &task.action {
            TaskAction::Styles(opts) => {
                let mut opts = opts.clone();
                opts.include_paths = self.rooted(&opts.include_paths);
                self.compilers.compile_styles(&sources, &dest, &opts)?
            }
            TaskAction::Scripts(opts) => self.compilers.bundle_scripts(&sources, &dest, opts)?,
            TaskAction::Images(opts) => self.compilers.optimize_images(&sources, &dest, opts)?,
            TaskAction::Copy => adapters::copy::copy(fs, &sources, &dest)?,
            TaskAction::Vendor(opts) => {
                let mut opts = opts.clone();
                opts.files = self.rooted(&opts.files);
                adapters::vendor::bundle(fs, &sources, &dest, &opts)?
            }
            TaskAction::Html(opts) => {
                let mut opts = opts.clone();
                opts.search_paths = self.rooted(&opts.search_paths);
                adapters::html::build(fs, &sources, &dest, &opts)?
            }
            TaskAction::Clean { .. } | TaskAction::Command { .. } | TaskAction::Group => Vec::new(),
        };

        Ok(written
            .into_iter()
            .map(|p| p.strip_prefix(&self.root).map(Path::to_path_buf).unwrap_or(p))
            .collect())
    }

    fn rooted(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|p| self.root.join(p)).collect()
    }
}
