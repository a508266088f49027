// src/errors.rs

//! Crate-wide error types.
//!
//! Structural problems (`ConfigError`) are fatal and surface at startup.
//! `CompilationError`s are captured per task inside a `BuildRun` and never
//! cross component boundaries as `Err`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate task '{0}'")]
    DuplicateTask(TaskName),

    #[error("task '{task}' has unknown dependency '{dependency}'")]
    InvalidDependency {
        task: TaskName,
        dependency: TaskName,
    },

    #[error("cycle detected in task graph involving: {}", members.join(", "))]
    CyclicDependency { members: Vec<TaskName> },

    #[error("unknown target task '{0}'")]
    UnknownTarget(TaskName),

    #[error("pipeline must contain at least one [task.<name>] section")]
    EmptyPipeline,

    #[error("tasks '{first}' and '{second}' both write into {dir:?} with no dependency between them")]
    SharedOutputDir {
        first: TaskName,
        second: TaskName,
        dir: PathBuf,
    },

    #[error("invalid glob '{pattern}' in task '{task}': {reason}")]
    InvalidGlob {
        task: TaskName,
        pattern: String,
        reason: String,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Structured report of a source-level problem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub path: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}", path.display())?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
                if let Some(column) = self.column {
                    write!(f, ":{column}")?;
                }
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.message)
    }
}

/// An adapter reported a problem with its sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{diagnostic}")]
pub struct CompilationError {
    pub diagnostic: Diagnostic,
}

impl From<Diagnostic> for CompilationError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self { diagnostic }
    }
}

impl CompilationError {
    /// Wrap any error as a diagnostic, attributing it to `path`.
    pub fn at(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        Diagnostic::new(err.to_string()).with_path(path).into()
    }
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("file watcher backend failed: {0}")]
    Backend(#[from] notify::Error),

    #[error("watch root {0:?} does not exist")]
    MissingRoot(PathBuf),
}

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("push to client {client} failed: {reason}")]
    Push { client: u64, reason: String },

    #[error("live-reload handshake failed: {0}")]
    Handshake(String),

    #[error("failed to encode reload message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Compilation error: {0}")]
    Compilation(#[from] CompilationError),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
