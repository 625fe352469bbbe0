//! CLI arguments and subcommands for procpulse.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Reader selection on the command line
#[derive(Debug, Clone, ValueEnum)]
pub enum ReaderArg {
    Auto,
    Procfs,
    Fixed,
}

impl ReaderArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderArg::Auto => "auto",
            ReaderArg::Procfs => "procfs",
            ReaderArg::Fixed => "fixed",
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "procpulse",
    about = "Linux resource counters as JSON over HTTP or a live terminal dashboard",
    long_about = "Linux resource counters as JSON over HTTP or a live terminal dashboard.\n\n\
                  Reads CPU, memory, disk, network, process, socket, file descriptor, pressure, \
                  vmstat, SNMP and netstat counters from procfs and turns them into rates and \
                  percentages. Runs the HTTP server when no subcommand is given.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Counter source: procfs, fixed values, or auto-detect
    #[arg(long, value_enum)]
    pub reader: Option<ReaderArg>,

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Pause between the two reads of a one-shot sample (ms)
    #[arg(long)]
    pub sample_pause_ms: Option<u64>,

    /// Upper bound for one collecting request (ms)
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Processes returned by /api/topcpu and /api/topram
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Parallel process-scan threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Include only processes matching these names (comma-separated)
    #[arg(long)]
    pub include_names: Option<String>,

    /// Exclude processes matching these names (comma-separated)
    #[arg(long)]
    pub exclude_names: Option<String>,

    /// Disable the /api/gpu endpoint
    #[arg(long)]
    pub disable_gpu: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive terminal dashboard
    Dashboard {
        /// Refresh interval in milliseconds (override config)
        #[arg(long)]
        tick_ms: Option<u64>,
    },

    /// Take one sample and print it
    Snapshot {
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: ConfigFormat,

        /// Pause between the two reads in milliseconds (override config)
        #[arg(long)]
        pause_ms: Option<u64>,

        /// Include the full process list
        #[arg(long)]
        verbose: bool,
    },

    /// Probe every kernel source and report availability
    Check {
        /// Also probe the GPU tool
        #[arg(long)]
        gpu: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}
