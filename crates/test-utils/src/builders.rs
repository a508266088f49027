#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use assetpipe::adapters::Bundler;
use assetpipe::config::{ConfigFile, ConfigSection, RawConfigFile, ServeSection, TaskConfig};
use assetpipe::dag::{ActionKind, BuildGraph, Task, TaskAction, TaskRegistry};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                serve: ServeSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.config.config.targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_serve_targets(mut self, targets: &[&str]) -> Self {
        self.config.serve.targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.config.config.concurrency = Some(n);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(action: ActionKind) -> Self {
        Self {
            task: TaskConfig {
                action,
                inputs: vec![],
                entries: vec![],
                output: None,
                after: vec![],
                minify: false,
                include_paths: vec![],
                bundler: Bundler::default(),
                outfile: None,
                files: vec![],
                search_paths: vec![],
                cmd: None,
                paths: vec![],
                quality: None,
            },
        }
    }

    pub fn command(cmd: &str) -> Self {
        Self::new(ActionKind::Command).cmd(cmd)
    }

    pub fn group() -> Self {
        Self::new(ActionKind::Group)
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.task.inputs.push(pattern.to_string());
        self
    }

    pub fn entry(mut self, pattern: &str) -> Self {
        self.task.entries.push(pattern.to_string());
        self
    }

    pub fn output(mut self, dir: &str) -> Self {
        self.task.output = Some(PathBuf::from(dir));
        self
    }

    pub fn outfile(mut self, name: &str) -> Self {
        self.task.outfile = Some(name.to_string());
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.task.cmd = Some(cmd.to_string());
        self
    }

    pub fn path(mut self, dir: &str) -> Self {
        self.task.paths.push(PathBuf::from(dir));
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.task.quality = Some(quality);
        self
    }

    pub fn minify(mut self) -> Self {
        self.task.minify = true;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// A `group` task depending on `after`.
pub fn group(name: &str, after: &[&str]) -> Task {
    after
        .iter()
        .fold(Task::new(name, TaskAction::Group), |task, dep| task.after(*dep))
}

/// Register `tasks` and finalize; panics on configuration errors.
pub fn graph_of(tasks: Vec<Task>) -> Arc<BuildGraph> {
    let mut registry = TaskRegistry::new();
    for task in tasks {
        registry.register(task).expect("register task");
    }
    Arc::new(registry.finalize().expect("finalize registry"))
}

/// `names[0] <- names[1] <- ...`: each task depends on the previous one.
pub fn linear_chain(names: &[&str]) -> Arc<BuildGraph> {
    let mut tasks = Vec::new();
    let mut previous: Option<&str> = None;
    for name in names {
        let deps: Vec<&str> = previous.into_iter().collect();
        tasks.push(group(name, &deps));
        previous = Some(*name);
    }
    graph_of(tasks)
}
