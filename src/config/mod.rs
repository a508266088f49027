// src/config/mod.rs

//! Pipeline configuration: TOML model, validation into a [`BuildGraph`]
//! and the built-in default pipeline.
//!
//! [`BuildGraph`]: crate::dag::BuildGraph

pub mod defaults;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DEFAULT_CONFIG_FILE, load_and_validate, load_or_default, parse_and_validate,
};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, ServeSection, TaskConfig};
