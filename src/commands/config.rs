//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("procpulse.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# procpulse Configuration
# ========================
#
# Server
# ------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 5001                   # HTTP port
# enable_health: true          # Enable /health endpoint
# enable_gpu: true             # Enable /api/gpu (needs nvidia-smi)
#
# Counter sources
# ---------------
# reader: "auto"               # auto, procfs or fixed
# proc_root: "/proc"           # Root of the proc filesystem
# parallelism: null            # Process-scan threads (null = auto)
#
# Sampling
# --------
# sample_pause_ms: 500         # Pause between the two reads of one sample
# request_timeout_ms: 5000     # Upper bound for one collecting request
# dashboard_tick_ms: 1000      # Dashboard refresh interval
#
# Process ranking
# ---------------
# top_n: 5                     # Processes in /api/topcpu and /api/topram
# include_names: null          # Include only processes matching these names
# exclude_names: null          # Exclude processes matching these names
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
# log_file: null               # Log file path (null = stdout)
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false            # Enable HTTPS (default: false)
# tls_cert_path: null          # Path to TLS certificate (PEM format)
# tls_key_path: null           # Path to TLS private key (PEM format)
"#;

    format!("{comments}\n{yaml}")
}
