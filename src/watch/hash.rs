// src/watch/hash.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::types::{ChangeEvent, ChangeKind};

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Drops modify events whose file content did not actually change.
///
/// Editors often touch a file (or write identical bytes) on save; with the
/// filter enabled such events never reach the debouncer.
#[derive(Debug, Default)]
pub struct ContentFilter {
    hashes: HashMap<PathBuf, String>,
}

impl ContentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content hash of `path` without filtering.
    pub fn prime(&mut self, path: &Path) {
        if let Ok(hash) = compute_file_hash(path) {
            self.hashes.insert(path.to_path_buf(), hash);
        }
    }

    /// Whether `event` reflects a real content change.
    pub fn is_change(&mut self, event: &ChangeEvent) -> bool {
        match event.kind {
            ChangeKind::Deleted => {
                self.hashes.remove(&event.path);
                true
            }
            ChangeKind::Created | ChangeKind::Modified => {
                let hash = match compute_file_hash(&event.path) {
                    Ok(hash) => hash,
                    // Unreadable (e.g. mid-rename): let the rebuild decide.
                    Err(_) => return true,
                };
                match self.hashes.insert(event.path.clone(), hash.clone()) {
                    Some(previous) if previous == hash => {
                        debug!(path = ?event.path, "content unchanged; dropping event");
                        false
                    }
                    _ => true,
                }
            }
        }
    }
}
