//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Blockflow - queue-driven ETL dispatch pipeline
#[derive(Parser, Debug)]
#[command(
    name = "blockflow",
    author,
    version,
    about = "Queue-driven ETL dispatch and reconciliation pipeline",
    long_about = "A continuous-running ETL engine.\n\n\
                  Drains a work queue of source-block notifications, routes each to \n\
                  its configured transform actions, reconciles produced artifacts \n\
                  against prior runs, and fans produced keys back onto the queue for \n\
                  downstream pipeline stages."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BLOCKFLOW_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BLOCKFLOW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ETL engine
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "BLOCKFLOW_CONFIG")]
    pub config: PathBuf,

    /// Reprocess a single key (exact, or unique prefix in the first
    /// worker's source bucket) and exit when drained
    #[arg(long)]
    pub id: Option<String>,

    /// Override worker thread count from configuration
    #[arg(long, env = "BLOCKFLOW_THREADS")]
    pub threads: Option<usize>,

    /// Force drain mode: stop when the queue is empty
    #[arg(long)]
    pub drain: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "BLOCKFLOW_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running the engine
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed worker information
    #[arg(long)]
    pub workers: bool,

    /// Show destination sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
