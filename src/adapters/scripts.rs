// src/adapters/scripts.rs

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::{AdapterResult, Bundler, ScriptOptions, commit, diagnostics, strip_js};
use crate::errors::{CompilationError, Diagnostic};
use crate::fs::{FileSystem, SourceFile};

const DEFAULT_OUTFILE: &str = "main.js";

pub fn bundle(
    fs: &dyn FileSystem,
    entries: &[SourceFile],
    dest: &Path,
    options: &ScriptOptions,
) -> AdapterResult {
    let mut bundles: Vec<(PathBuf, String)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let code = match options.bundler {
            Bundler::Concat => fs
                .read_to_string(&entry.path)
                .map_err(|e| CompilationError::at(&entry.path, e))?,
            Bundler::Esbuild => esbuild(&entry.path, options.minify)?,
        };
        bundles.push((dest.join(&entry.relative).with_extension("js"), code));
    }

    let outputs = match options.bundler {
        // Always a single file.
        Bundler::Concat => {
            let name = options.outfile.as_deref().unwrap_or(DEFAULT_OUTFILE);
            vec![(dest.join(name), join(bundles, options.minify))]
        }
        Bundler::Esbuild => match options.outfile.as_deref() {
            Some(name) => vec![(dest.join(name), join(bundles, false))],
            None => bundles,
        },
    };

    commit(
        fs,
        outputs
            .into_iter()
            .map(|(path, code)| (path, code.into_bytes()))
            .collect(),
    )
}

fn join(bundles: Vec<(PathBuf, String)>, minify: bool) -> String {
    let joined = bundles
        .into_iter()
        .map(|(_, code)| code)
        .collect::<Vec<_>>()
        .join("\n");
    if minify { strip_js(&joined) } else { joined }
}

fn esbuild(entry: &Path, minify: bool) -> Result<String, CompilationError> {
    debug!(?entry, "bundling with esbuild");

    let mut cmd = Command::new("esbuild");
    cmd.arg(entry).arg("--bundle").arg("--log-level=error");
    if minify {
        cmd.arg("--minify");
    }

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            CompilationError::from(
                Diagnostic::new(format!("failed to invoke esbuild: {e}")).with_path(entry),
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(diagnostics::from_esbuild(entry, &stderr).into());
    }

    String::from_utf8(output.stdout).map_err(|e| CompilationError::at(entry, e))
}
