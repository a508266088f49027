// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build front-end assets from a dependency-ordered task pipeline.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    ///
    /// Default: `Assetpipe.toml` in the current working directory. When that
    /// file does not exist the built-in default pipeline is used.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build the targets once; exit non-zero if any task failed.
    Build {
        /// Run the `clean` task as its own run before building.
        #[arg(long)]
        clean: bool,

        /// Build only these tasks (and their dependencies).
        #[arg(long = "target", value_name = "NAME")]
        targets: Vec<String>,
    },
    /// Build, then watch sources, rebuild on change and live-reload browsers.
    Serve {
        /// Build and watch only these tasks (and their dependencies).
        #[arg(long = "target", value_name = "NAME")]
        targets: Vec<String>,
    },
    /// Print the build graph without running anything.
    Plan,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
