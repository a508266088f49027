// src/adapters/vendor.rs

use std::path::{Path, PathBuf};

use super::{AdapterResult, VendorOptions, commit, strip_js};
use crate::errors::CompilationError;
use crate::fs::{FileSystem, SourceFile};

const DEFAULT_OUTFILE: &str = "vendor.js";

/// Concatenate third-party scripts into one file, in the configured order.
///
/// `options.files` must already be resolved against the project root.
pub fn bundle(
    fs: &dyn FileSystem,
    sources: &[SourceFile],
    dest: &Path,
    options: &VendorOptions,
) -> AdapterResult {
    let files: Vec<PathBuf> = if options.files.is_empty() {
        sources.iter().map(|s| s.path.clone()).collect()
    } else {
        options.files.clone()
    };

    let mut parts = Vec::with_capacity(files.len());
    for file in files.iter() {
        let code = fs
            .read_to_string(file)
            .map_err(|e| CompilationError::at(file, e))?;
        parts.push(code);
    }

    let mut joined = parts.join(";\n");
    if options.minify {
        joined = strip_js(&joined);
    }

    let name = options.outfile.as_deref().unwrap_or(DEFAULT_OUTFILE);
    commit(fs, vec![(dest.join(name), joined.into_bytes())])
}
