//! CLI argument definitions using clap derive.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// shed is a CLI for easily managing Go tool dependencies.
///
/// Tools are pinned in a shed.lock lockfile committed with the project and
/// installed into a per-user cache, so every contributor runs identical
/// versions of linters, code generators, and other build-time helpers.
#[derive(Parser, Debug)]
#[command(name = "shed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// When to show a progress spinner
    #[arg(long, global = true, value_enum, default_value_t = ProgressMode::Auto)]
    pub progress: ProgressMode,

    /// Path to the lockfile to use instead of searching for one
    #[arg(long, global = true, env = "SHED_LOCKFILE")]
    pub lockfile: Option<PathBuf>,

    /// Directory to cache installed tools in
    #[arg(long, global = true, env = "SHED_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install Go tools and record them in the lockfile
    Get(GetArgs),

    /// Generate a lockfile in the current directory
    Init,

    /// List the tools specified in the lockfile
    List(ListArgs),

    /// Run an installed tool
    Run(RunArgs),

    /// Manage the tool cache
    Cache(CacheArgs),
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Tools to install: import paths with optional '@version' suffixes.
    /// The special suffix '@none' uninstalls a tool. With no tools, every
    /// tool in the lockfile is installed.
    pub tools: Vec<String>,

    /// Update tools to the latest available version
    #[arg(short, long)]
    pub update: bool,

    /// Number of installs to run concurrently (defaults to the number of CPUs)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show the latest available version for each tool
    #[arg(short = 'u', long = "updates")]
    pub updates: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The tool to run: a binary name, or a full import path if the binary
    /// name is ambiguous
    pub tool: String,

    /// Arguments passed to the tool as-is
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print the path to the shed cache directory
    Dir,

    /// Remove all installed tools from the cache
    Clean,
}

/// Progress spinner mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// Always show a spinner
    On,
    /// Never show a spinner
    Off,
    /// Show a spinner when stderr is a terminal
    Auto,
}

impl ProgressMode {
    /// Whether a spinner should be drawn.
    pub fn interactive(self) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Auto => std::io::stderr().is_terminal(),
        }
    }
}
