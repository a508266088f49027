// src/fs/glob.rs

//! Expanding task input globs into concrete source files.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::MatchOptions;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use super::FileSystem;

/// A matched input file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Location on disk (root joined with the relative pattern match).
    pub path: PathBuf,
    /// Path below the static base of the pattern that matched it.
    pub relative: PathBuf,
}

fn is_glob_component(part: &str) -> bool {
    part.contains(['*', '?', '[', '{'])
}

/// Leading path components of `pattern` that contain no glob syntax.
///
/// For a pattern without any glob syntax this is its parent directory.
pub fn static_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let glob_at = parts.iter().position(|p| is_glob_component(p));
    let take = match glob_at {
        Some(idx) => idx,
        None => parts.len().saturating_sub(1),
    };
    parts[..take]
        .iter()
        .filter(|p| !p.is_empty() && **p != ".")
        .collect::<PathBuf>()
}

pub(crate) fn build_glob(pattern: &str) -> std::result::Result<Glob, globset::Error> {
    GlobBuilder::new(pattern.trim_start_matches("./"))
        .literal_separator(true)
        .build()
}

/// Compile the `!`-prefixed patterns into a single exclusion set.
pub(crate) fn exclusion_set(patterns: &[String]) -> std::result::Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.iter().filter_map(|p| p.strip_prefix('!')) {
        builder.add(build_glob(pattern)?);
    }
    builder.build()
}

/// Expand `patterns` (relative to `root`) into existing files.
///
/// Patterns starting with `!` exclude matches of the others. Results keep
/// pattern order, are sorted within one pattern, and contain each file once.
/// Files reached through more than one path (symlinked directories,
/// including ones that loop back on themselves) are reported under the
/// first path in sorted order.
pub fn expand_globs(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<SourceFile>> {
    let exclude = exclusion_set(patterns).context("compiling exclusion globs")?;
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();

    for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
        let matcher = build_glob(pattern)
            .with_context(|| format!("compiling glob '{pattern}'"))?
            .compile_matcher();
        let base = static_base(pattern);
        let base_dir = root.join(&base);
        if !fs.is_dir(&base_dir) {
            continue;
        }

        let mut matched = candidates(fs, root, &base_dir)?
            .into_iter()
            .filter(|rel| matcher.is_match(rel) && !exclude.is_match(rel))
            .collect::<Vec<_>>();
        matched.sort();

        for rel in matched {
            let path = root.join(&rel);
            let identity = fs.canonicalize(&path).unwrap_or_else(|_| path.clone());
            if !seen.insert(identity) {
                continue;
            }
            let relative = rel.strip_prefix(&base).unwrap_or(&rel).to_path_buf();
            out.push(SourceFile { path, relative });
        }
    }

    Ok(out)
}

/// Every file below `dir`, relative to `root`.
fn candidates(fs: &dyn FileSystem, root: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut out = Vec::new();
    for entry in glob::glob_with(&pattern, options)
        .with_context(|| format!("walking '{}'", dir.display()))?
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable path");
                continue;
            }
        };
        if !fs.is_file(&entry) {
            continue;
        }
        let Ok(rel) = entry.strip_prefix(root) else {
            continue;
        };
        out.push(
            rel.components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect(),
        );
    }
    Ok(out)
}
