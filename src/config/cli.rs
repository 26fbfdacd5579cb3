//! Command line definition

use crate::logging::LogFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Replicate a directory tree into another folder, skipping content the
/// destination already holds anywhere.
#[derive(Debug, Parser)]
#[command(name = "sparsync", version, about, long_about = None)]
pub struct Cli {
    /// Source directory for the copy
    #[arg(short, long, global = true, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Destination directory for the copy
    #[arg(short, long, global = true, value_name = "PATH")]
    pub destination: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long = "conf", global = true, value_name = "PATH")]
    pub conf: Option<PathBuf>,

    /// Do not ignore dotfiles
    #[arg(short = 'i', long = "no-ignore-dotfiles", global = true)]
    pub no_ignore_dotfiles: bool,

    /// Path to leave out of both walks (repeatable)
    #[arg(long = "ignore", global = true, value_name = "PATH")]
    pub ignore: Vec<PathBuf>,

    /// Write through a temporary file, verify, then rename
    #[arg(long, global = true)]
    pub safe: bool,

    /// Number of concurrent copy workers
    #[arg(short = 'j', long, global = true, value_name = "N")]
    pub threads: Option<usize>,

    /// Hash at most this many leading bytes of each file
    #[arg(long, global = true, value_name = "BYTES")]
    pub max_hash_bytes: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Operation to run
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Copy everything the destination does not already hold
    Backup,

    /// Show what `backup` would copy without writing anything
    Status {
        /// Print the marked source tree as JSON
        #[arg(long)]
        json: bool,
    },
}
