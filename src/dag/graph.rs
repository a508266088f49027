// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::dag::task::{ActionKind, Task};
use crate::errors::ConfigError;
use crate::types::TaskName;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// The finalized, acyclic set of tasks plus derived topological layers.
///
/// Only [`TaskRegistry::finalize`](crate::dag::TaskRegistry::finalize) can
/// produce one, so holding a `BuildGraph` means the dependency relation has
/// already been checked. It is immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    tasks: BTreeMap<TaskName, Arc<Task>>,
    nodes: HashMap<TaskName, DagNode>,
    order: Vec<TaskName>,
    layers: Vec<Vec<TaskName>>,
}

impl BuildGraph {
    /// Assemble a graph from validated tasks and a topological order.
    ///
    /// Assumes that:
    /// - all `depends_on` references are valid
    /// - `order` lists every task after all of its dependencies
    pub(crate) fn from_sorted(tasks: BTreeMap<TaskName, Task>, order: Vec<TaskName>) -> Self {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();

        for (name, task) in tasks.iter() {
            nodes.entry(name.clone()).or_default().deps = task.depends_on.clone();
            for dep in task.depends_on.iter() {
                nodes
                    .entry(dep.clone())
                    .or_default()
                    .dependents
                    .push(name.clone());
            }
        }

        // Layer of a task = 1 + deepest layer among its dependencies.
        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut layers: Vec<Vec<TaskName>> = Vec::new();
        for name in order.iter() {
            let level = tasks[name]
                .depends_on
                .iter()
                .filter_map(|dep| depth.get(dep.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(name.as_str(), level);
            if layers.len() <= level {
                layers.resize_with(level + 1, Vec::new);
            }
            layers[level].push(name.clone());
        }
        for layer in layers.iter_mut() {
            layer.sort();
        }

        let tasks = tasks
            .into_iter()
            .map(|(name, task)| (name, Arc::new(task)))
            .collect();

        Self {
            tasks,
            nodes,
            order,
            layers,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    /// All tasks, ordered by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// One valid execution order: every task appears after its dependencies.
    pub fn topological_order(&self) -> &[TaskName] {
        &self.order
    }

    /// Groups of tasks with no dependency relation between them.
    pub fn layers(&self) -> &[Vec<TaskName>] {
        &self.layers
    }

    /// Whether `task` depends on `ancestor`, directly or transitively.
    pub fn depends_transitively(&self, task: &str, ancestor: &str) -> bool {
        let mut stack: Vec<&str> = self.dependencies_of(task).iter().map(|s| s.as_str()).collect();
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.dependencies_of(current).iter().map(|s| s.as_str()));
            }
        }

        false
    }

    /// Transitive closure of `targets` over `depends_on`.
    pub fn closure<I, S>(&self, targets: I) -> Result<BTreeSet<TaskName>, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<TaskName> = Vec::new();

        for target in targets {
            let target = target.as_ref();
            if !self.contains(target) {
                return Err(ConfigError::UnknownTarget(target.to_string()));
            }
            stack.push(target.to_string());
        }

        while let Some(name) = stack.pop() {
            if closure.insert(name.clone()) {
                stack.extend(self.dependencies_of(&name).iter().cloned());
            }
        }

        Ok(closure)
    }

    /// Targets used when none are configured: every task nothing depends on,
    /// except `clean` tasks, which only run when asked for by name.
    pub fn default_targets(&self) -> Vec<TaskName> {
        self.tasks
            .values()
            .filter(|task| self.dependents_of(&task.name).is_empty())
            .filter(|task| task.kind() != ActionKind::Clean)
            .map(|task| task.name.clone())
            .collect()
    }
}
