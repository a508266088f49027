// src/adapters/mod.rs

//! Compiler adapters: uniform wrappers around style compilation, script
//! bundling and image optimization, plus the file-level actions (copy,
//! vendor bundles, HTML build blocks) the default pipeline needs.
//!
//! Every adapter takes already-expanded [`SourceFile`]s and a destination
//! directory, and returns the paths it wrote. Outputs are replaced
//! atomically, so a failing adapter leaves the previous artifacts in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::CompilationError;
use crate::fs::{FileSystem, SourceFile};

pub mod copy;
pub mod diagnostics;
pub mod html;
pub mod images;
pub mod scripts;
pub mod styles;
pub mod vendor;

pub type AdapterResult = Result<Vec<PathBuf>, CompilationError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOptions {
    pub minify: bool,
    /// Extra `@import` search directories.
    pub include_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bundler {
    /// Join sources in order.
    #[default]
    Concat,
    /// Shell out to `esbuild --bundle` per entry.
    Esbuild,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOptions {
    pub bundler: Bundler,
    pub minify: bool,
    /// Single output file; when unset each entry gets its own bundle.
    pub outfile: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// JPEG re-encoding quality, 1..=100.
    pub quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { quality: 85 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorOptions {
    /// Files in bundle order; falls back to the task inputs when empty.
    pub files: Vec<PathBuf>,
    pub outfile: Option<String>,
    pub minify: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Directories searched, in order, for assets referenced in build blocks.
    pub search_paths: Vec<PathBuf>,
    pub minify: bool,
}

/// Capability contract for the third-party compilers.
///
/// Implementations must be deterministic for identical inputs.
pub trait Compilers: Send + Sync {
    fn compile_styles(
        &self,
        sources: &[SourceFile],
        dest: &Path,
        options: &StyleOptions,
    ) -> AdapterResult;

    fn bundle_scripts(
        &self,
        entries: &[SourceFile],
        dest: &Path,
        options: &ScriptOptions,
    ) -> AdapterResult;

    fn optimize_images(
        &self,
        sources: &[SourceFile],
        dest: &Path,
        options: &ImageOptions,
    ) -> AdapterResult;
}

/// In-process compilers: grass for SCSS, image for PNG/JPEG and
/// concatenation or an `esbuild` subprocess for scripts.
#[derive(Debug, Clone)]
pub struct NativeCompilers {
    fs: Arc<dyn FileSystem>,
}

impl NativeCompilers {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Compilers for NativeCompilers {
    fn compile_styles(
        &self,
        sources: &[SourceFile],
        dest: &Path,
        options: &StyleOptions,
    ) -> AdapterResult {
        styles::compile(self.fs.as_ref(), sources, dest, options)
    }

    fn bundle_scripts(
        &self,
        entries: &[SourceFile],
        dest: &Path,
        options: &ScriptOptions,
    ) -> AdapterResult {
        scripts::bundle(self.fs.as_ref(), entries, dest, options)
    }

    fn optimize_images(
        &self,
        sources: &[SourceFile],
        dest: &Path,
        options: &ImageOptions,
    ) -> AdapterResult {
        images::optimize(self.fs.as_ref(), sources, dest, options)
    }
}

/// Write every `(path, bytes)` pair, after all of them have been produced.
pub(crate) fn commit(fs: &dyn FileSystem, outputs: Vec<(PathBuf, Vec<u8>)>) -> AdapterResult {
    let mut written = Vec::with_capacity(outputs.len());
    for (path, bytes) in outputs {
        crate::fs::write_atomic(fs, &path, &bytes).map_err(|e| CompilationError::at(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

/// Line-level minification for JavaScript: trims lines and drops blank
/// lines and `//` line comments.
pub(crate) fn strip_js(source: &str) -> String {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}
