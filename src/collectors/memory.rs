//! Memory statistics from /proc/meminfo.

use serde::Serialize;

use crate::error::CollectError;

/// Memory counters in bytes (the kernel reports kibibytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub active: u64,
    pub inactive: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Parses /proc/meminfo content. `MemTotal` is the only required key.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, CollectError> {
    let mut info = MemInfo::default();
    let mut saw_total = false;

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let key = parts[0].trim_end_matches(':');
        let bytes = parts[1].parse::<u64>().unwrap_or(0).saturating_mul(1024);

        match key {
            "MemTotal" => {
                info.total = bytes;
                saw_total = true;
            }
            "MemFree" => info.free = bytes,
            "MemAvailable" => info.available = bytes,
            "Buffers" => info.buffers = bytes,
            "Cached" => info.cached = bytes,
            "Active" => info.active = bytes,
            "Inactive" => info.inactive = bytes,
            "SwapTotal" => info.swap_total = bytes,
            "SwapFree" => info.swap_free = bytes,
            _ => {}
        }
    }

    if !saw_total {
        return Err(CollectError::format("meminfo", "MemTotal not found"));
    }

    Ok(info)
}
