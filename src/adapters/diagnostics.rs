// src/adapters/diagnostics.rs

//! Pull line/column positions out of compiler error text.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::Diagnostic;

static SASS_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(\d+):(\d+)\s+root stylesheet").expect("valid regex")
});

static ESBUILD_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*([^\s:][^:\n]*):(\d+):(\d+):").expect("valid regex")
});

/// Diagnostic for a grass error message.
pub fn from_sass(path: &Path, message: &str) -> Diagnostic {
    let summary = first_line(message)
        .trim_start_matches("Error: ")
        .to_string();
    let diagnostic = Diagnostic::new(summary).with_path(path);
    match SASS_POSITION.captures(message) {
        Some(caps) => match (caps[1].parse(), caps[2].parse()) {
            (Ok(line), Ok(column)) => diagnostic.with_position(line, column),
            _ => diagnostic,
        },
        None => diagnostic,
    }
}

/// Diagnostic for esbuild's stderr, which reports `file:line:col: message`.
pub fn from_esbuild(entry: &Path, stderr: &str) -> Diagnostic {
    let message = stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("✘") || l.contains("error"))
        .map(|l| l.trim_start_matches("✘").trim().trim_start_matches("[ERROR]").trim())
        .unwrap_or_else(|| first_line(stderr))
        .to_string();

    match ESBUILD_POSITION.captures(stderr) {
        Some(caps) => {
            let diagnostic = Diagnostic::new(message).with_path(caps[1].trim());
            match (caps[2].parse(), caps[3].parse()) {
                (Ok(line), Ok(column)) => diagnostic.with_position(line, column),
                _ => diagnostic,
            }
        }
        None => Diagnostic::new(message).with_path(entry),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("unknown error")
}
