// src/config/validate.rs

use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::{BuildGraph, TaskRegistry};
use crate::errors::ConfigError;
use crate::types::TaskName;
use crate::watch::WatchSubscription;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_global_config(&raw)?;
        validate_globs(&raw)?;

        let mut registry = TaskRegistry::new();
        for (name, task) in raw.task.iter() {
            registry.register(task.to_task(name)?)?;
        }
        let graph = registry.finalize()?;

        let targets = resolve_targets(&graph, &raw.config.targets, graph.default_targets())?;
        let serve_targets = resolve_targets(&graph, &raw.serve.targets, targets.clone())?;
        debug!(?targets, ?serve_targets, "resolved pipeline targets");

        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.serve,
            Arc::new(graph),
            targets,
            serve_targets,
        ))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.task.is_empty() {
        return Err(ConfigError::EmptyPipeline);
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.config.concurrency == Some(0) {
        return Err(ConfigError::Invalid(
            "[config].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.debounce_ms == 0 {
        return Err(ConfigError::Invalid(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.serve.roots.is_empty() {
        return Err(ConfigError::Invalid(
            "[serve].roots must list at least one directory".to_string(),
        ));
    }
    for prefix in cfg.serve.mounts.keys() {
        let valid = prefix.len() > 1
            && prefix.starts_with('/')
            && !prefix.ends_with('/')
            && !prefix.contains(['*', '{', '}']);
        if !valid {
            return Err(ConfigError::Invalid(format!(
                "[serve.mounts] prefix '{prefix}' must look like \"/name\""
            )));
        }
    }
    Ok(())
}

fn validate_globs(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    for (name, task) in cfg.task.iter() {
        WatchSubscription::new(name.clone(), &task.inputs)?;
        WatchSubscription::new(name.clone(), &task.entries)?;
    }
    Ok(())
}

/// `configured` when non-empty, otherwise `fallback`; every name must exist.
fn resolve_targets(
    graph: &BuildGraph,
    configured: &[TaskName],
    fallback: Vec<TaskName>,
) -> Result<Vec<TaskName>, ConfigError> {
    let targets = if configured.is_empty() {
        fallback
    } else {
        configured.to_vec()
    };
    if targets.is_empty() {
        return Err(ConfigError::Invalid("no build targets".to_string()));
    }
    graph.closure(&targets)?;
    Ok(targets)
}
