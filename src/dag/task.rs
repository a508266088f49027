// src/dag/task.rs

//! Task definitions: a named unit of build work plus the action it runs.

use std::path::PathBuf;

use serde::Deserialize;

use crate::adapters::{HtmlOptions, ImageOptions, ScriptOptions, StyleOptions, VendorOptions};
use crate::types::TaskName;

/// What a task does when the scheduler runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Remove the listed directories (relative to the project root).
    Clean { paths: Vec<PathBuf> },
    Styles(StyleOptions),
    Scripts(ScriptOptions),
    Images(ImageOptions),
    /// Copy matched inputs verbatim, preserving their path below the glob root.
    Copy,
    Vendor(VendorOptions),
    Html(HtmlOptions),
    /// Run a shell command; a non-zero exit is a compilation failure.
    Command { cmd: String },
    /// No-op aggregate (e.g. `build`).
    Group,
}

/// Discriminant of [`TaskAction`], as written in the pipeline file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Clean,
    Styles,
    Scripts,
    Images,
    Copy,
    Vendor,
    Html,
    Command,
    Group,
}

impl ActionKind {
    /// Whether tasks of this kind write artifacts into an output directory.
    pub fn writes_output(self) -> bool {
        matches!(
            self,
            ActionKind::Styles
                | ActionKind::Scripts
                | ActionKind::Images
                | ActionKind::Copy
                | ActionKind::Vendor
                | ActionKind::Html
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Clean => "clean",
            ActionKind::Styles => "styles",
            ActionKind::Scripts => "scripts",
            ActionKind::Images => "images",
            ActionKind::Copy => "copy",
            ActionKind::Vendor => "vendor",
            ActionKind::Html => "html",
            ActionKind::Command => "command",
            ActionKind::Group => "group",
        }
    }
}

impl TaskAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            TaskAction::Clean { .. } => ActionKind::Clean,
            TaskAction::Styles(_) => ActionKind::Styles,
            TaskAction::Scripts(_) => ActionKind::Scripts,
            TaskAction::Images(_) => ActionKind::Images,
            TaskAction::Copy => ActionKind::Copy,
            TaskAction::Vendor(_) => ActionKind::Vendor,
            TaskAction::Html(_) => ActionKind::Html,
            TaskAction::Command { .. } => ActionKind::Command,
            TaskAction::Group => ActionKind::Group,
        }
    }
}

/// A named, dependency-aware unit of build work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    /// Tasks that must succeed before this one may start.
    pub depends_on: Vec<TaskName>,
    /// Globs (relative to the project root) this task reads. Entries starting
    /// with `!` exclude matches.
    pub inputs: Vec<String>,
    /// Optional subset of `inputs` actually compiled (e.g. a single stylesheet
    /// entry point while every partial is watched).
    pub entries: Vec<String>,
    /// Directory (relative to the project root) this task writes into.
    pub output: Option<PathBuf>,
    pub action: TaskAction,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, action: TaskAction) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            inputs: Vec::new(),
            entries: Vec::new(),
            output: None,
            action,
        }
    }

    pub fn after(mut self, dependency: impl Into<TaskName>) -> Self {
        let dependency = dependency.into();
        if !self.depends_on.contains(&dependency) {
            self.depends_on.push(dependency);
        }
        self
    }

    pub fn with_inputs<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(globs.into_iter().map(Into::into));
        self
    }

    pub fn with_entries<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.extend(globs.into_iter().map(Into::into));
        self
    }

    pub fn with_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = Some(dir.into());
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Globs that select the files handed to the action: `entries` when
    /// given, otherwise `inputs`.
    pub fn source_globs(&self) -> &[String] {
        if self.entries.is_empty() {
            &self.inputs
        } else {
            &self.entries
        }
    }
}
