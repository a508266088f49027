// src/adapters/html.rs

//! Build-block rewriting for HTML pages.
//!
//! ```html
//! <!-- build:css styles/main.css -->
//! <link rel="stylesheet" href="styles/screen.css">
//! <!-- endbuild -->
//! ```
//!
//! Every file referenced inside a block is concatenated into the block's
//! target (under the output directory) and the block collapses to one tag.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use super::{AdapterResult, HtmlOptions, commit};
use crate::errors::{CompilationError, Diagnostic};
use crate::fs::{FileSystem, SourceFile};

static BUILD_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*build:(css|js)\s+(\S+)\s*-->(.*?)<!--\s*endbuild\s*-->")
        .expect("valid regex")
});

static ASSET_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:href|src)\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--(.*?)-->").expect("valid regex"));

static INTER_TAG_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));

/// A concatenated asset produced from one build block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBlock {
    pub kind: BlockKind,
    /// Target path as written in the block, relative to the output dir.
    pub target: String,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Css,
    Js,
}

impl BlockKind {
    fn tag(self, target: &str) -> String {
        match self {
            BlockKind::Css => format!(r#"<link rel="stylesheet" href="{target}">"#),
            BlockKind::Js => format!(r#"<script src="{target}"></script>"#),
        }
    }

    fn separator(self) -> &'static str {
        match self {
            BlockKind::Css => "\n",
            BlockKind::Js => ";\n",
        }
    }
}

/// Every build block in `html`, in document order.
pub fn parse_blocks(html: &str) -> Vec<BuildBlock> {
    BUILD_BLOCK
        .captures_iter(html)
        .map(|caps| BuildBlock {
            kind: if &caps[1] == "css" {
                BlockKind::Css
            } else {
                BlockKind::Js
            },
            target: caps[2].to_string(),
            references: ASSET_REF
                .captures_iter(&caps[3])
                .map(|r| r[1].to_string())
                .collect(),
        })
        .collect()
}

/// Replace each build block with a single tag pointing at its target.
pub fn rewrite_blocks(html: &str) -> String {
    BUILD_BLOCK
        .replace_all(html, |caps: &Captures| {
            let kind = if &caps[1] == "css" {
                BlockKind::Css
            } else {
                BlockKind::Js
            };
            kind.tag(&caps[2])
        })
        .into_owned()
}

/// Drop non-conditional comments and whitespace between tags.
pub fn minify(html: &str) -> String {
    let without_comments = COMMENT.replace_all(html, |caps: &Captures| {
        let body = caps[1].trim();
        if body.starts_with('[') || body.ends_with(']') {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    INTER_TAG_SPACE
        .replace_all(without_comments.trim(), "><")
        .into_owned()
}

fn resolve(fs: &dyn FileSystem, reference: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    let reference = reference.trim_start_matches('/');
    search_paths
        .iter()
        .map(|base| base.join(reference))
        .find(|candidate| fs.is_file(candidate))
}

/// Process every page, writing pages and their bundles under `dest`.
pub fn build(
    fs: &dyn FileSystem,
    pages: &[SourceFile],
    dest: &Path,
    options: &HtmlOptions,
) -> AdapterResult {
    let mut outputs: Vec<(PathBuf, Vec<u8>)> = Vec::new();

    for page in pages {
        let html = fs
            .read_to_string(&page.path)
            .map_err(|e| CompilationError::at(&page.path, e))?;

        for block in parse_blocks(&html) {
            let target = dest.join(block.target.trim_start_matches('/'));
            if outputs.iter().any(|(p, _)| *p == target) {
                continue;
            }

            let mut parts = Vec::with_capacity(block.references.len());
            for reference in block.references.iter() {
                let path = resolve(fs, reference, &options.search_paths).ok_or_else(|| {
                    CompilationError::from(
                        Diagnostic::new(format!(
                            "asset '{reference}' referenced by build block '{}' not found",
                            block.target
                        ))
                        .with_path(&page.path),
                    )
                })?;
                debug!(page = ?page.path, asset = ?path, "bundling build-block asset");
                parts.push(
                    fs.read_to_string(&path)
                        .map_err(|e| CompilationError::at(&path, e))?,
                );
            }

            outputs.push((target, parts.join(block.kind.separator()).into_bytes()));
        }

        let mut rewritten = rewrite_blocks(&html);
        if options.minify {
            rewritten = minify(&rewritten);
        }
        outputs.push((dest.join(&page.relative), rewritten.into_bytes()));
    }

    commit(fs, outputs)
}
