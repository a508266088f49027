// src/adapters/copy.rs

use std::path::Path;

use super::{AdapterResult, commit};
use crate::errors::CompilationError;
use crate::fs::{FileSystem, SourceFile};

/// Copy each source to `dest/<relative>`.
pub fn copy(fs: &dyn FileSystem, sources: &[SourceFile], dest: &Path) -> AdapterResult {
    let outputs = sources
        .iter()
        .map(|source| {
            fs.read(&source.path)
                .map(|bytes| (dest.join(&source.relative), bytes))
                .map_err(|e| CompilationError::at(&source.path, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    commit(fs, outputs)
}
