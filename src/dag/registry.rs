// src/dag/registry.rs

//! Explicit task registry: collects task definitions, then validates and
//! freezes them into a [`BuildGraph`].

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::dag::graph::BuildGraph;
use crate::dag::task::Task;
use crate::errors::ConfigError;
use crate::types::TaskName;

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task definition. Dependencies may reference tasks registered
    /// later; they are only resolved by [`finalize`](Self::finalize).
    pub fn register(&mut self, task: Task) -> Result<(), ConfigError> {
        if self.tasks.contains_key(&task.name) {
            return Err(ConfigError::DuplicateTask(task.name));
        }
        debug!(task = %task.name, kind = task.kind().as_str(), "registered task");
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Validate the dependency relation and freeze the registry.
    ///
    /// Fails with:
    /// - `InvalidDependency` for a `depends_on` entry that was never registered
    /// - `CyclicDependency` naming every task on a cycle
    /// - `SharedOutputDir` when two writers share an output directory without
    ///   a dependency path ordering them
    pub fn finalize(self) -> Result<BuildGraph, ConfigError> {
        for (name, task) in self.tasks.iter() {
            for dep in task.depends_on.iter() {
                if !self.tasks.contains_key(dep) {
                    return Err(ConfigError::InvalidDependency {
                        task: name.clone(),
                        dependency: dep.clone(),
                    });
                }
                if dep == name {
                    return Err(ConfigError::CyclicDependency {
                        members: vec![name.clone()],
                    });
                }
            }
        }

        let order = self.topological_order()?;
        let built = BuildGraph::from_sorted(self.tasks, order);
        check_output_partitioning(&built)?;

        debug!(
            tasks = built.len(),
            layers = built.layers().len(),
            "task registry finalized"
        );
        Ok(built)
    }

    fn topological_order(&self) -> Result<Vec<TaskName>, ConfigError> {
        // Edge direction: dep -> task.
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index: BTreeMap<&str, NodeIndex> = BTreeMap::new();
        for name in self.tasks.keys() {
            index.insert(name.as_str(), graph.add_node(name.as_str()));
        }
        for (name, task) in self.tasks.iter() {
            for dep in task.depends_on.iter() {
                graph.add_edge(index[dep.as_str()], index[name.as_str()], ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|ix| graph[ix].to_string()).collect()),
            Err(cycle) => Err(ConfigError::CyclicDependency {
                members: cycle_members(&graph, cycle.node_id()),
            }),
        }
    }
}

/// Names of the tasks in the strongly connected component containing `node`.
fn cycle_members(graph: &DiGraph<&str, ()>, node: NodeIndex) -> Vec<TaskName> {
    let mut members = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.len() > 1 && scc.contains(&node))
        .map(|scc| scc.into_iter().map(|ix| graph[ix].to_string()).collect::<Vec<_>>())
        .unwrap_or_else(|| vec![graph[node].to_string()]);
    members.sort();
    members
}

fn check_output_partitioning(graph: &BuildGraph) -> Result<(), ConfigError> {
    let writers: Vec<(&str, PathBuf)> = graph
        .tasks()
        .filter(|task| task.kind().writes_output())
        .filter_map(|task| {
            task.output
                .as_deref()
                .map(|dir| (task.name.as_str(), normalize(dir)))
        })
        .collect();

    for (i, (first, dir)) in writers.iter().enumerate() {
        for (second, other) in writers.iter().skip(i + 1) {
            if dir != other {
                continue;
            }
            let ordered = graph.depends_transitively(first, second)
                || graph.depends_transitively(second, first);
            if !ordered {
                return Err(ConfigError::SharedOutputDir {
                    first: first.to_string(),
                    second: second.to_string(),
                    dir: dir.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Lexical normalization so `public`, `./public` and `public/` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
