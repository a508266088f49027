// src/engine/report.rs

//! Human-facing summaries of finished runs.

use std::path::Path;

use tracing::{error, info, warn};

use crate::dag::{BuildRun, TaskStatus};
use crate::fs::FileSystem;

/// Log the overall result plus one line per failed or skipped task.
pub fn log_run(run: &BuildRun) {
    for (name, report) in run.reports() {
        match report.status {
            TaskStatus::Failed => {
                let diagnostic = report
                    .diagnostic
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unknown error".to_string());
                error!(run_id = run.id(), task = %name, "{diagnostic}");
            }
            TaskStatus::Skipped => {
                warn!(run_id = run.id(), task = %name, "skipped because a dependency failed");
            }
            _ => {}
        }
    }

    if run.has_failures() {
        warn!(run_id = run.id(), "{run}");
    } else {
        info!(run_id = run.id(), "{run}");
    }
}

/// Per-task size of the artifacts written in `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeLine {
    pub task: String,
    pub files: usize,
    pub bytes: u64,
}

/// Collect artifact sizes for every task that wrote files.
pub fn size_report(fs: &dyn FileSystem, root: &Path, run: &BuildRun) -> Vec<SizeLine> {
    run.reports()
        .filter(|(_, report)| !report.written.is_empty())
        .map(|(name, report)| SizeLine {
            task: name.to_string(),
            files: report.written.len(),
            bytes: report
                .written
                .iter()
                .filter_map(|p| fs.file_size(&root.join(p)).ok())
                .sum(),
        })
        .collect()
}

pub fn log_sizes(lines: &[SizeLine]) {
    let mut total = 0u64;
    for line in lines {
        total += line.bytes;
        info!(task = %line.task, files = line.files, size = %human_size(line.bytes), "build output");
    }
    if !lines.is_empty() {
        info!(size = %human_size(total), "build total");
    }
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
