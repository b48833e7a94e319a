//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Change Dispatcher - publishes production area changes to a topic
#[derive(Parser, Debug)]
#[command(
    name = "change-dispatcher",
    author,
    version,
    about = "Production area change dispatcher",
    long_about = "Ordered, retrying delivery of production area changes to a publish/subscribe topic.\n\n\
                  Validates service configuration and runs the dispatcher against an \n\
                  in-process broker to observe retry and ordering behaviour."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CHANGE_DISPATCHER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CHANGE_DISPATCHER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    Validate(ValidateArgs),

    /// Feed synthetic changes through the dispatcher
    Simulate(SimulateArgs),
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml", env = "CHANGE_DISPATCHER_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "CHANGE_DISPATCHER_CONFIG")]
    pub config: PathBuf,

    /// Transport to publish to
    #[arg(long, value_enum, default_value = "memory")]
    pub transport: TransportKind,

    /// Number of units of work to trigger
    #[arg(long, default_value = "10")]
    pub changes: usize,

    /// Number of distinct stores the areas belong to
    #[arg(long, default_value = "3")]
    pub stores: usize,

    /// Number of initial sends the broker rejects (memory transport only)
    #[arg(long, default_value = "0")]
    pub fail_first: usize,

    /// Report scripted failures as connectivity problems
    #[arg(long)]
    pub connectivity: bool,

    /// Override retry base delay in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub retry_base_ms: Option<u64>,

    /// Give up waiting for delivery after this many seconds (0 = wait forever)
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CHANGE_DISPATCHER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Transport used by `simulate`
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportKind {
    /// In-process broker with scripted failures
    #[default]
    Memory,
    /// Log every message via tracing
    Log,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
