// src/reload/decision.rs

use std::path::PathBuf;

use crate::dag::{BuildGraph, BuildRun, TaskStatus};

/// What a finished run means for connected browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadDecision {
    /// Nothing to push.
    None,
    Reload,
    /// Only stylesheets changed: these files can be injected in place.
    InjectStyle(Vec<PathBuf>),
}

/// Decide which message (if any) a completed run warrants.
///
/// - Any failed task: no message, so the browser keeps the last good page.
/// - Every task that writes output is a style task: inject the written
///   stylesheets.
/// - Otherwise, if anything succeeded: full reload.
///
/// Tasks that produce no artifacts (clean, group, command) never decide the
/// kind of message on their own.
pub fn decide(run: &BuildRun, graph: &BuildGraph) -> ReloadDecision {
    if run.has_failures() {
        return ReloadDecision::None;
    }

    let succeeded: Vec<_> = run
        .reports()
        .filter(|(_, report)| report.status == TaskStatus::Succeeded)
        .collect();
    if succeeded.is_empty() {
        return ReloadDecision::None;
    }

    let writers: Vec<_> = succeeded
        .iter()
        .filter_map(|(name, report)| graph.task(name).map(|t| (t, report)))
        .filter(|(task, _)| task.kind().writes_output())
        .collect();

    let styles_only = !writers.is_empty()
        && writers
            .iter()
            .all(|(task, _)| task.kind() == crate::dag::ActionKind::Styles);

    if styles_only {
        let paths: Vec<PathBuf> = writers
            .iter()
            .flat_map(|(_, report)| report.written.iter().cloned())
            .filter(|p| p.extension().is_some_and(|ext| ext == "css"))
            .collect();
        if !paths.is_empty() {
            return ReloadDecision::InjectStyle(paths);
        }
    }

    ReloadDecision::Reload
}
