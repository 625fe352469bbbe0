//! NVIDIA GPU statistics through `nvidia-smi`.
//!
//! The tool is optional. When it is missing or fails, the query reports
//! [`CollectError::SourceUnavailable`] and the caller decides how to render it.

use std::io;
use std::process::Command;

use serde::Serialize;
use tracing::debug;

use crate::error::CollectError;

const NVIDIA_SMI: &str = "nvidia-smi";
const QUERY_FIELDS: &str = "index,name,uuid,utilization.gpu,utilization.memory,memory.total,memory.free,memory.used,temperature.gpu,power.draw,power.limit";
const GPU_COLUMNS: usize = 11;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuStats {
    pub index: u32,
    pub name: String,
    pub uuid: String,
    #[serde(rename = "util_gpu_percent")]
    pub util_gpu: f64,
    #[serde(rename = "util_memory_percent")]
    pub util_memory: f64,
    #[serde(rename = "memory_total_mb")]
    pub memory_total: u64,
    #[serde(rename = "memory_free_mb")]
    pub memory_free: u64,
    #[serde(rename = "memory_used_mb")]
    pub memory_used: u64,
    #[serde(rename = "temperature_c")]
    pub temperature: f64,
    #[serde(rename = "power_draw_w")]
    pub power_draw: f64,
    #[serde(rename = "power_limit_w")]
    pub power_limit: f64,
}

/// Parses `--format=csv,noheader,nounits` output. Short rows are skipped and
/// unparsable numbers (e.g. "[N/A]") become 0.
pub fn parse_gpu_csv(output: &str) -> Vec<GpuStats> {
    output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.len() < GPU_COLUMNS {
                return None;
            }
            let float = |idx: usize| cols[idx].parse::<f64>().unwrap_or(0.0);
            let int = |idx: usize| cols[idx].parse::<u64>().unwrap_or(0);
            Some(GpuStats {
                index: cols[0].parse().unwrap_or(0),
                name: cols[1].to_string(),
                uuid: cols[2].to_string(),
                util_gpu: float(3),
                util_memory: float(4),
                memory_total: int(5),
                memory_free: int(6),
                memory_used: int(7),
                temperature: float(8),
                power_draw: float(9),
                power_limit: float(10),
            })
        })
        .collect()
}

/// Runs nvidia-smi once. Never retried.
pub fn query_gpus() -> Result<Vec<GpuStats>, CollectError> {
    let output = Command::new(NVIDIA_SMI)
        .arg(format!("--query-gpu={}", QUERY_FIELDS))
        .arg("--format=csv,noheader,nounits")
        .output()
        .map_err(|e| CollectError::unavailable(NVIDIA_SMI, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!("{} exited with {}: {}", NVIDIA_SMI, output.status, stderr);
        return Err(CollectError::unavailable(
            NVIDIA_SMI,
            io::Error::other(format!("exited with {}: {}", output.status, stderr)),
        ));
    }

    Ok(parse_gpu_csv(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gpu_csv() {
        let out = "0, NVIDIA GeForce RTX 3090, GPU-abc, 45, 30, 24576, 20000, 4576, 65, 220.50, 350.00\n\
                   1, Tesla T4, GPU-def, [N/A], 0, 15360, 15360, 0, 40, 9.8, 70\n";
        let gpus = parse_gpu_csv(out);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].name, "NVIDIA GeForce RTX 3090");
        assert_eq!(gpus[0].util_gpu, 45.0);
        assert_eq!(gpus[0].memory_used, 4576);
        assert_eq!(gpus[0].power_draw, 220.5);
        assert_eq!(gpus[1].index, 1);
        assert_eq!(gpus[1].util_gpu, 0.0);
    }

    #[test]
    fn test_short_rows_skipped() {
        assert!(parse_gpu_csv("0, name, uuid\n\n").is_empty());
    }

    #[test]
    fn test_serialized_keys() {
        let json = serde_json::to_value(GpuStats::default()).unwrap();
        assert!(json.get("util_gpu_percent").is_some());
        assert!(json.get("memory_total_mb").is_some());
        assert!(json.get("temperature_c").is_some());
    }
}
