// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use globset::{GlobSet, GlobSetBuilder};

use crate::dag::BuildGraph;
use crate::errors::ConfigError;
use crate::fs::glob::{build_glob, exclusion_set};
use crate::fs::static_base;
use crate::types::TaskName;

/// Compiled input globs for a single task.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"app/assets/sass/screen.scss"`) into [`matches`](Self::matches).
#[derive(Clone)]
pub struct WatchSubscription {
    task: TaskName,
    patterns: Vec<String>,
    include: GlobSet,
    exclude: GlobSet,
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("task", &self.task)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl WatchSubscription {
    pub fn new(task: impl Into<TaskName>, patterns: &[String]) -> Result<Self, ConfigError> {
        let task = task.into();
        let invalid = |pattern: &str, err: globset::Error| ConfigError::InvalidGlob {
            task: task.clone(),
            pattern: pattern.to_string(),
            reason: err.kind().to_string(),
        };

        let mut include = GlobSetBuilder::new();
        for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
            include.add(build_glob(pattern).map_err(|e| invalid(pattern, e))?);
        }
        let include = include.build().map_err(|e| invalid("<set>", e))?;
        let exclude = exclusion_set(patterns).map_err(|e| invalid("<exclusions>", e))?;

        Ok(Self {
            task,
            patterns: patterns.to_vec(),
            include,
            exclude,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a change to `rel_path` concerns this task.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path) && !self.exclude.is_match(rel_path)
    }
}

/// The subscriptions of every task that declares inputs.
#[derive(Debug, Clone, Default)]
pub struct WatchSubscriptions {
    subscriptions: Vec<WatchSubscription>,
}

impl WatchSubscriptions {
    /// Subscriptions for the tasks in `graph` restricted to `tasks`.
    ///
    /// Tasks outside `tasks` and tasks without inputs are not watched.
    pub fn from_graph(graph: &BuildGraph, tasks: &BTreeSet<TaskName>) -> Result<Self, ConfigError> {
        let subscriptions = graph
            .tasks()
            .filter(|task| tasks.contains(&task.name))
            .filter(|task| !task.inputs.is_empty())
            .map(|task| WatchSubscription::new(task.name.clone(), &task.inputs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { subscriptions })
    }

    pub fn new(subscriptions: Vec<WatchSubscription>) -> Self {
        Self { subscriptions }
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchSubscription> {
        self.subscriptions.iter()
    }

    /// Every task subscribed to `rel_path`.
    pub fn tasks_for(&self, rel_path: &str) -> BTreeSet<TaskName> {
        self.subscriptions
            .iter()
            .filter(|s| s.matches(rel_path))
            .map(|s| s.task.clone())
            .collect()
    }

    /// Minimal set of directories (relative to the root) covering every
    /// subscribed pattern: the static prefixes of the globs, with nested
    /// directories folded into their ancestors.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let bases: BTreeSet<PathBuf> = self
            .subscriptions
            .iter()
            .flat_map(|s| s.patterns.iter())
            .filter(|p| !p.starts_with('!'))
            .map(|p| static_base(p))
            .collect();

        let mut roots: Vec<PathBuf> = Vec::new();
        for base in bases {
            if let Some(last) = roots.last()
                && base.starts_with(last)
            {
                continue;
            }
            roots.push(base);
        }
        roots
    }
}
