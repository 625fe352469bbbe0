//! Pressure stall information from /proc/pressure/{cpu,memory,io}.
//!
//! Format:
//! ```text
//! some avg10=0.00 avg60=0.00 avg300=0.00 total=0
//! full avg10=0.00 avg60=0.00 avg300=0.00 total=0
//! ```
//! The `full` line is absent for cpu on older kernels.

use serde::Serialize;

use crate::error::CollectError;

/// PSI resources read for one snapshot, in `PressureSet` field order.
pub const PRESSURE_RESOURCES: [&str; 3] = ["cpu", "memory", "io"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PressureStats {
    pub some_avg10: f64,
    pub some_avg60: f64,
    pub some_avg300: f64,
    pub some_total: u64,
    pub full_avg10: f64,
    pub full_avg60: f64,
    pub full_avg300: f64,
    pub full_total: u64,
}

/// Pressure for all three resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PressureSet {
    pub cpu: PressureStats,
    pub memory: PressureStats,
    pub io: PressureStats,
}

pub fn parse_pressure(content: &str) -> Result<PressureStats, CollectError> {
    let mut stats = PressureStats::default();
    let mut saw_some = false;

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let full = match fields.next() {
            Some("some") => {
                saw_some = true;
                false
            }
            Some("full") => true,
            _ => continue,
        };

        for field in fields {
            let Some((key, raw)) = field.split_once('=') else {
                continue;
            };
            let avg = || raw.parse::<f64>().unwrap_or(0.0);
            match (key, full) {
                ("avg10", false) => stats.some_avg10 = avg(),
                ("avg60", false) => stats.some_avg60 = avg(),
                ("avg300", false) => stats.some_avg300 = avg(),
                ("total", false) => stats.some_total = raw.parse().unwrap_or(0),
                ("avg10", true) => stats.full_avg10 = avg(),
                ("avg60", true) => stats.full_avg60 = avg(),
                ("avg300", true) => stats.full_avg300 = avg(),
                ("total", true) => stats.full_total = raw.parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    if !saw_some {
        return Err(CollectError::format("pressure", "some line not found"));
    }

    Ok(stats)
}
