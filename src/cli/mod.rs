//! CLI command definitions for simple-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::{ConfigLoader, Format};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect how layered configuration files resolve
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Logical configuration name (file stem and environment prefix)
    #[arg(short, long, global = true, default_value = "config")]
    pub name: String,

    /// Additional search path, searched after the current directory (repeatable)
    #[arg(short, long = "path", value_name = "DIR", global = true)]
    pub paths: Vec<PathBuf>,

    /// Also search the platform user config directory, after all --path entries
    #[arg(long, global = true)]
    pub user_dir: bool,

    /// File format / extension: json, yaml
    #[arg(short, long, default_value = "json", global = true)]
    pub format: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the merged file configuration as JSON (default if no subcommand given)
    Show,

    /// List candidate files in precedence order
    Paths,
}

impl Cli {
    /// Build a loader from the command-line options.
    pub fn loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new(&self.name);
        loader.set_format(Format::from(self.format.as_str()));
        for path in &self.paths {
            loader.add_search_path(path);
        }
        if self.user_dir {
            loader.add_user_config_dir();
        }
        loader
    }
}
