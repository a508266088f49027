// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{
    Bundler, HtmlOptions, ImageOptions, ScriptOptions, StyleOptions, VendorOptions,
};
use crate::dag::{ActionKind, BuildGraph, Task, TaskAction};
use crate::errors::ConfigError;
use crate::types::TaskName;

/// Pipeline file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// debounce_ms = 200
///
/// [serve]
/// roots = [".tmp", "app"]
///
/// [task.styles]
/// action = "styles"
/// inputs = ["app/assets/sass/**/*.scss"]
/// entries = ["app/assets/sass/screen.scss"]
/// output = ".tmp/styles"
/// ```
///
/// All sections are optional and have reasonable defaults; an empty task
/// table is rejected by validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub serve: ServeSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Quiet period after the last relevant change before a rebuild starts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of tasks executing at once. Defaults to the number of
    /// available CPUs.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Drop change events whose file content hash did not change.
    #[serde(default)]
    pub skip_unchanged: bool,

    /// Tasks built by `build`. Defaults to every task nothing depends on.
    #[serde(default)]
    pub targets: Vec<TaskName>,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            concurrency: None,
            skip_unchanged: false,
            targets: Vec::new(),
        }
    }
}

impl ConfigSection {
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    /// Static HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket port for live-reload clients.
    #[serde(default = "default_livereload_port")]
    pub livereload_port: u16,

    /// Directories served, first match wins.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Extra directories served under a URL prefix, e.g.
    /// `"/bower_components" = "bower_components"`.
    #[serde(default)]
    pub mounts: BTreeMap<String, PathBuf>,

    /// Tasks built and watched by `serve`. Defaults to `[config].targets`.
    #[serde(default)]
    pub targets: Vec<TaskName>,
}

fn default_port() -> u16 {
    9000
}

fn default_livereload_port() -> u16 {
    35729
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".tmp"), PathBuf::from("app")]
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            livereload_port: default_livereload_port(),
            roots: default_roots(),
            mounts: BTreeMap::new(),
            targets: Vec::new(),
        }
    }
}

/// `[task.<name>]` section.
///
/// One flat table for every action; fields that do not apply to the
/// task's `action` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub action: ActionKind,

    /// Globs this task reads and is rebuilt for. `!` prefixes exclude.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Subset of files handed to the action (defaults to `inputs`).
    #[serde(default)]
    pub entries: Vec<String>,

    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<TaskName>,

    #[serde(default)]
    pub minify: bool,

    /// `styles`: extra import directories.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,

    /// `scripts`: `"concat"` (default) or `"esbuild"`.
    #[serde(default)]
    pub bundler: Bundler,

    /// `scripts` / `vendor`: single output file name.
    #[serde(default)]
    pub outfile: Option<String>,

    /// `vendor`: files in bundle order.
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// `html`: where build-block references are looked up.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// `command`: shell command line.
    #[serde(default)]
    pub cmd: Option<String>,

    /// `clean`: directories to remove.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// `images`: JPEG quality.
    #[serde(default)]
    pub quality: Option<u8>,
}

impl TaskConfig {
    /// Build the [`Task`] this table describes.
    pub fn to_task(&self, name: &str) -> Result<Task, ConfigError> {
        let invalid = |msg: &str| ConfigError::Invalid(format!("task '{name}': {msg}"));

        let action = match self.action {
            ActionKind::Clean => {
                if self.paths.is_empty() {
                    return Err(invalid("`clean` requires `paths`"));
                }
                TaskAction::Clean {
                    paths: self.paths.clone(),
                }
            }
            ActionKind::Styles => TaskAction::Styles(StyleOptions {
                minify: self.minify,
                include_paths: self.include_paths.clone(),
            }),
            ActionKind::Scripts => TaskAction::Scripts(ScriptOptions {
                bundler: self.bundler,
                minify: self.minify,
                outfile: self.outfile.clone(),
            }),
            ActionKind::Images => {
                let quality = self.quality.unwrap_or(ImageOptions::default().quality);
                if !(1..=100).contains(&quality) {
                    return Err(invalid("`quality` must be between 1 and 100"));
                }
                TaskAction::Images(ImageOptions { quality })
            }
            ActionKind::Copy => TaskAction::Copy,
            ActionKind::Vendor => TaskAction::Vendor(VendorOptions {
                files: self.files.clone(),
                outfile: self.outfile.clone(),
                minify: self.minify,
            }),
            ActionKind::Html => TaskAction::Html(HtmlOptions {
                search_paths: self.search_paths.clone(),
                minify: self.minify,
            }),
            ActionKind::Command => match self.cmd.as_deref().map(str::trim) {
                Some(cmd) if !cmd.is_empty() => TaskAction::Command {
                    cmd: cmd.to_string(),
                },
                _ => return Err(invalid("`command` requires a non-empty `cmd`")),
            },
            ActionKind::Group => TaskAction::Group,
        };

        if self.action.writes_output() && self.output.is_none() {
            return Err(invalid("an `output` directory is required"));
        }

        let mut task = Task::new(name, action)
            .with_inputs(self.inputs.iter().cloned())
            .with_entries(self.entries.iter().cloned());
        if let Some(output) = &self.output {
            task = task.with_output(output.clone());
        }
        for dep in self.after.iter() {
            task = task.after(dep.clone());
        }
        Ok(task)
    }
}

/// Validated pipeline: the finalized graph plus resolved settings.
///
/// Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub serve: ServeSection,
    graph: Arc<BuildGraph>,
    targets: Vec<TaskName>,
    serve_targets: Vec<TaskName>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        serve: ServeSection,
        graph: Arc<BuildGraph>,
        targets: Vec<TaskName>,
        serve_targets: Vec<TaskName>,
    ) -> Self {
        Self {
            config,
            serve,
            graph,
            targets,
            serve_targets,
        }
    }

    pub fn graph(&self) -> &Arc<BuildGraph> {
        &self.graph
    }

    /// Effective `build` targets.
    pub fn targets(&self) -> &[TaskName] {
        &self.targets
    }

    /// Effective `serve` targets.
    pub fn serve_targets(&self) -> &[TaskName] {
        &self.serve_targets
    }
}
