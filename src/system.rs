//! System-wide gauges: load average, uptime and file descriptor usage.
//!
//! These are small single-line sources, kept apart from the table parsers in
//! [`crate::collectors`].

use serde::Serialize;

use crate::error::CollectError;

/// System load averages for 1, 5, and 15 minute intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    #[serde(rename = "load_1m")]
    pub one_min: f64,
    #[serde(rename = "load_5m")]
    pub five_min: f64,
    #[serde(rename = "load_15m")]
    pub fifteen_min: f64,
}

/// Seconds since boot and aggregate idle seconds across all CPUs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Uptime {
    #[serde(rename = "uptime_seconds")]
    pub uptime_secs: f64,
    #[serde(rename = "idle_time_seconds")]
    pub idle_secs: f64,
}

/// System-wide file handle counters from /proc/sys/fs/file-nr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileNrStats {
    pub allocated: u64,
    pub free: u64,
    pub max: u64,
}

impl FileNrStats {
    /// Share of the system limit in use. 0 when `max` is 0.
    pub fn used_percent(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        self.allocated.saturating_sub(self.free) as f64 / self.max as f64 * 100.0
    }
}

/// Parses /proc/loadavg.
///
/// Format: "0.00 0.01 0.05 1/234 5678"
pub fn parse_loadavg(content: &str) -> Result<LoadAverage, CollectError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(CollectError::format(
            "loadavg",
            format!("expected at least 3 fields, got {}", parts.len()),
        ));
    }

    let load = |idx: usize| parts[idx].parse::<f64>().unwrap_or(0.0);

    Ok(LoadAverage {
        one_min: load(0),
        five_min: load(1),
        fifteen_min: load(2),
    })
}

/// Parses /proc/uptime.
///
/// Format: "<uptime_seconds> <idle_seconds>"
pub fn parse_uptime(content: &str) -> Result<Uptime, CollectError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(CollectError::format(
            "uptime",
            format!("expected 2 fields, got {}", parts.len()),
        ));
    }

    Ok(Uptime {
        uptime_secs: parts[0].parse().unwrap_or(0.0),
        idle_secs: parts[1].parse().unwrap_or(0.0),
    })
}

/// Parses /proc/sys/fs/file-nr.
///
/// Format: "<allocated> <unused> <max>"
pub fn parse_file_nr(content: &str) -> Result<FileNrStats, CollectError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(CollectError::format(
            "sys/fs/file-nr",
            format!("expected 3 fields, got {}", parts.len()),
        ));
    }

    let num = |idx: usize| parts[idx].parse::<u64>().unwrap_or(0);

    Ok(FileNrStats {
        allocated: num(0),
        free: num(1),
        max: num(2),
    })
}
