// src/exec/command.rs

//! Shell command tasks (linters and the like).

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::dag::TaskOutcome;
use crate::errors::Diagnostic;

/// Run `cmd` through the platform shell in `cwd`.
///
/// A non-zero exit becomes a failed outcome whose diagnostic is the
/// command's stderr (or stdout when stderr is empty).
pub async fn run_command(task: &str, cmd: &str, cwd: &Path) -> TaskOutcome {
    info!(task = %task, cmd = %cmd, "starting task process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    let output = command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            warn!(task = %task, error = %err, "failed to spawn task process");
            return TaskOutcome::Failed(Diagnostic::new(format!(
                "spawning process for task '{task}': {err}"
            )));
        }
    };

    let code = output.status.code().unwrap_or(-1);
    info!(task = %task, exit_code = code, success = output.status.success(), "task process exited");

    if output.status.success() {
        return TaskOutcome::Succeeded { written: Vec::new() };
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    for line in text.lines() {
        debug!(task = %task, "output: {}", line);
    }

    let message = match text.trim() {
        "" => format!("command exited with status {code}"),
        trimmed => trimmed.to_string(),
    };
    TaskOutcome::Failed(Diagnostic::new(message))
}
