// src/adapters/styles.rs

use std::path::Path;

use grass::{Options, OutputStyle};
use tracing::debug;

use super::{AdapterResult, StyleOptions, commit, diagnostics};
use crate::errors::CompilationError;
use crate::fs::{FileSystem, SourceFile};

/// Sass partials (`_name.scss`) are only reachable through `@import`.
fn is_partial(source: &SourceFile) -> bool {
    source
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compile every non-partial stylesheet to `dest/<relative>.css`.
///
/// Nothing is written unless all sources compile.
pub fn compile(
    fs: &dyn FileSystem,
    sources: &[SourceFile],
    dest: &Path,
    options: &StyleOptions,
) -> AdapterResult {
    let style = if options.minify {
        OutputStyle::Compressed
    } else {
        OutputStyle::Expanded
    };
    let opts = Options::default()
        .style(style)
        .load_paths(&options.include_paths);

    let mut outputs = Vec::new();
    for source in sources.iter().filter(|s| !is_partial(s)) {
        debug!(path = ?source.path, "compiling stylesheet");
        let css = grass::from_path(&source.path, &opts)
            .map_err(|err| CompilationError::from(diagnostics::from_sass(&source.path, &err.to_string())))?;
        let out = dest.join(&source.relative).with_extension("css");
        outputs.push((out, css.into_bytes()));
    }

    commit(fs, outputs)
}
