//! Configuration management for procpulse.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use procpulse::reader::{ReaderMode, DEFAULT_PROC_ROOT};
use procpulse::ProcessFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_SAMPLE_PAUSE_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_DASHBOARD_TICK_MS: u64 = 1000;

/// Enhanced configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
    #[serde(alias = "log-file")]
    pub log_file: Option<PathBuf>,

    // Counter sources
    /// "auto" | "procfs" | "fixed"
    pub reader: Option<String>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    pub parallelism: Option<usize>,

    // Sampling
    #[serde(alias = "sample-pause-ms")]
    pub sample_pause_ms: Option<u64>,
    #[serde(alias = "request-timeout-ms")]
    pub request_timeout_ms: Option<u64>,
    #[serde(alias = "dashboard-tick-ms")]
    pub dashboard_tick_ms: Option<u64>,

    // Process ranking
    #[serde(alias = "top-n")]
    pub top_n: Option<usize>,
    #[serde(alias = "include-names")]
    pub include_names: Option<Vec<String>>,
    #[serde(alias = "exclude-names")]
    pub exclude_names: Option<Vec<String>>,

    // Feature flags
    #[serde(alias = "enable-gpu")]
    pub enable_gpu: Option<bool>,
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            log_level: Some("info".into()),
            log_file: None,
            reader: Some("auto".into()),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            parallelism: None,
            sample_pause_ms: Some(DEFAULT_SAMPLE_PAUSE_MS),
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
            dashboard_tick_ms: Some(DEFAULT_DASHBOARD_TICK_MS),
            top_n: Some(DEFAULT_TOP_N),
            include_names: None,
            exclude_names: None,
            enable_gpu: Some(true),
            enable_health: Some(true),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn reader_mode(&self) -> Result<ReaderMode, String> {
        self.reader.as_deref().unwrap_or("auto").parse()
    }

    pub fn proc_root(&self) -> &Path {
        self.proc_root
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PROC_ROOT))
    }

    pub fn sample_pause(&self) -> Duration {
        Duration::from_millis(self.sample_pause_ms.unwrap_or(DEFAULT_SAMPLE_PAUSE_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn dashboard_tick(&self) -> Duration {
        Duration::from_millis(self.dashboard_tick_ms.unwrap_or(DEFAULT_DASHBOARD_TICK_MS))
    }

    pub fn top_n(&self) -> usize {
        self.top_n.unwrap_or(DEFAULT_TOP_N)
    }

    pub fn process_filter(&self) -> ProcessFilter {
        ProcessFilter::new(
            self.include_names.clone().unwrap_or_default(),
            self.exclude_names.clone().unwrap_or_default(),
        )
    }

    pub fn gpu_enabled(&self) -> bool {
        self.enable_gpu.unwrap_or(true)
    }

    pub fn health_enabled(&self) -> bool {
        self.enable_health.unwrap_or(true)
    }

    pub fn tls_enabled(&self) -> bool {
        self.enable_tls.unwrap_or(false)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    cfg.reader_mode()?;

    if let Some(level) = cfg.log_level.as_deref() {
        match level.to_ascii_lowercase().as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(format!(
                    "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                    other
                )
                .into());
            }
        }
    }

    // Sampling intervals
    if cfg.sample_pause_ms == Some(0) {
        return Err("sample_pause_ms must be greater than 0".into());
    }
    if cfg.dashboard_tick_ms == Some(0) {
        return Err("dashboard_tick_ms must be greater than 0".into());
    }
    if cfg.request_timeout_ms == Some(0) {
        return Err("request_timeout_ms must be greater than 0".into());
    }
    if cfg.request_timeout() <= cfg.sample_pause() {
        return Err(format!(
            "request_timeout_ms ({}) must be greater than sample_pause_ms ({})",
            cfg.request_timeout().as_millis(),
            cfg.sample_pause().as_millis()
        )
        .into());
    }

    // TLS validation
    if cfg.tls_enabled() {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS file exists, is readable and is not empty.
fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("TLS {} file not found: {}", what, path).into());
    }
    match fs::metadata(p) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
        Ok(_) => Ok(()),
    }
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = Some(log_file.clone());
    }

    if let Some(reader) = &args.reader {
        config.reader = Some(reader.as_str().to_string());
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(threads) = args.parallelism {
        config.parallelism = Some(threads);
    }

    if let Some(ms) = args.sample_pause_ms {
        config.sample_pause_ms = Some(ms);
    }
    if let Some(ms) = args.request_timeout_ms {
        config.request_timeout_ms = Some(ms);
    }
    if let Some(n) = args.top_n {
        config.top_n = Some(n);
    }

    // Parse comma-separated include/exclude names
    if let Some(include_str) = &args.include_names {
        config.include_names = Some(split_names(include_str));
    }
    if let Some(exclude_str) = &args.exclude_names {
        config.exclude_names = Some(split_names(exclude_str));
    }

    // Feature flags
    if args.disable_gpu {
        config.enable_gpu = Some(false);
    }
    if args.disable_health {
        config.enable_health = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Default config file locations, searched in order.
pub const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/procpulse/procpulse.yaml",
    "/etc/procpulse/procpulse.yml",
    "/etc/procpulse/procpulse.json",
    "./procpulse.yaml",
    "./procpulse.yml",
    "./procpulse.json",
];

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(found) => PathBuf::from(found),
            None => return Ok(Config::default()),
        },
    };

    parse_config_file(&path)
}

/// Parses one config file, choosing the format by extension (YAML by default).
pub fn parse_config_file(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut cfg = Config::default();
        cfg.sample_pause_ms = Some(0);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.dashboard_tick_ms = Some(0);
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_timeout_must_exceed_pause() {
        let mut cfg = Config::default();
        cfg.sample_pause_ms = Some(1000);
        cfg.request_timeout_ms = Some(1000);
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_unknown_reader_rejected() {
        let mut cfg = Config::default();
        cfg.reader = Some("sysfs".into());
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_tls_requires_both_files() {
        let mut cfg = Config::default();
        cfg.enable_tls = Some(true);
        cfg.tls_cert_path = Some("/nonexistent/cert.pem".into());
        assert!(validate_effective_config(&cfg).is_err());

        cfg.tls_key_path = Some("/nonexistent/key.pem".into());
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_partial_yaml_leaves_other_keys_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("procpulse.yaml");
        fs::write(&path, "port: 8080\ntop-n: 3\nexclude_names: [kworker]\n").unwrap();

        let cfg = parse_config_file(&path).unwrap();
        assert_eq!(cfg.port(), 8080);
        assert_eq!(cfg.top_n(), 3);
        assert!(cfg.reader.is_none());
        assert_eq!(cfg.reader_mode().unwrap(), ReaderMode::Auto);
        assert_eq!(cfg.sample_pause(), Duration::from_millis(DEFAULT_SAMPLE_PAUSE_MS));
        assert!(!cfg.process_filter().matches("kworker/0:1"));
    }

    #[test]
    fn test_json_and_toml_by_extension() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("c.json");
        fs::write(&json, r#"{"reader": "fixed", "enable_gpu": false}"#).unwrap();
        let cfg = parse_config_file(&json).unwrap();
        assert_eq!(cfg.reader_mode().unwrap(), ReaderMode::Fixed);
        assert!(!cfg.gpu_enabled());

        let toml_path = dir.path().join("c.toml");
        fs::write(&toml_path, "port = 9000\nproc_root = \"/host/proc\"\n").unwrap();
        let cfg = parse_config_file(&toml_path).unwrap();
        assert_eq!(cfg.port(), 9000);
        assert_eq!(cfg.proc_root(), Path::new("/host/proc"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/procpulse.yaml"))).is_err());
    }

    #[test]
    fn test_split_names_trims_and_drops_empty() {
        assert_eq!(split_names(" nginx, ,postgres "), vec!["nginx", "postgres"]);
    }
}
