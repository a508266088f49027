// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::defaults::DEFAULT_PIPELINE;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Name of the pipeline file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Assetpipe.toml";

/// Load a pipeline file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does not perform semantic
/// validation (graph correctness, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_raw(&contents)
}

pub fn parse_raw(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Parse and validate a pipeline given as TOML text.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile> {
    Ok(ConfigFile::try_from(parse_raw(contents)?)?)
}

/// Load a pipeline file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for unknown `after` references, cycles, invalid globs, shared
///   output directories and basic global config sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    Ok(ConfigFile::try_from(raw_config)?)
}

/// Like [`load_and_validate`], but falls back to the built-in pipeline when
/// `path` is the default location and does not exist.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
        info!(path = ?path, "no pipeline file; using the built-in default pipeline");
        return parse_and_validate(DEFAULT_PIPELINE);
    }
    load_and_validate(path)
}
