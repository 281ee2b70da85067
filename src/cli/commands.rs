//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Public API catalog harvester
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override `api.base_url`
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override `api.max_attempts`
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Override `load.chunk_size`
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Override `database.path` (DuckDB file or `:memory:`)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write debug-level logs to this file (truncated on start)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Walk the catalog, reload staging and sync the warehouse
    Run,

    /// Print harvested records without touching the database
    Walk {
        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Walk the catalog and reload the staging table only
    Stage,

    /// Upsert the current staging contents into the warehouse
    Sync,

    /// Create the schema, staging and warehouse tables
    Init,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
