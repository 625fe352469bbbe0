//! Aggregate CPU time parsing from /proc/stat.
//!
//! Only the aggregate `cpu` line is read; per-core lines (`cpu0`, `cpu1`, ...)
//! are ignored.

use serde::Serialize;

use crate::error::CollectError;

/// Minimum counters after the `cpu` token: user through softirq.
const MIN_CPU_FIELDS: usize = 7;

/// Aggregate CPU time counters in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
    /// Sum of all of the above.
    pub total: u64,
}

impl CpuTimes {
    /// Builds a record from the ten kernel counters, deriving `total`.
    pub fn from_counters(counters: [u64; 10]) -> Self {
        let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = counters;
        Self {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
            guest,
            guest_nice,
            total: counters.iter().fold(0u64, |acc, v| acc.saturating_add(*v)),
        }
    }

    /// The ten kernel counters in `/proc/stat` order.
    pub fn counters(&self) -> [u64; 10] {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
            self.guest_nice,
        ]
    }
}

/// Parses the content of /proc/stat and returns the aggregate CPU record.
///
/// Format: "cpu  user nice system idle iowait irq softirq [steal [guest [guest_nice]]]"
pub fn parse_cpu_stat(content: &str) -> Result<CpuTimes, CollectError> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| CollectError::format("stat", "aggregate cpu line not found"))?;

    parse_cpu_line(line)
}

/// Parses a single aggregate `cpu` line.
pub fn parse_cpu_line(line: &str) -> Result<CpuTimes, CollectError> {
    let parts: Vec<&str> = line.split_whitespace().skip(1).collect();
    if parts.len() < MIN_CPU_FIELDS {
        return Err(CollectError::format(
            "stat",
            format!(
                "expected at least {} cpu counters, got {}",
                MIN_CPU_FIELDS,
                parts.len()
            ),
        ));
    }

    let mut counters = [0u64; 10];
    for (slot, raw) in counters.iter_mut().zip(parts.iter()) {
        *slot = raw.parse().unwrap_or(0);
    }

    Ok(CpuTimes::from_counters(counters))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  100 0 50 800 10 0 0 0 0 0\n\
                        cpu0 50 0 25 400 5 0 0 0 0 0\n\
                        cpu1 50 0 25 400 5 0 0 0 0 0\n\
                        intr 12345\n\
                        ctxt 6789\n";

    #[test]
    fn test_parse_aggregate_line() {
        let cpu = parse_cpu_stat(STAT).unwrap();
        assert_eq!(cpu.user, 100);
        assert_eq!(cpu.system, 50);
        assert_eq!(cpu.idle, 800);
        assert_eq!(cpu.iowait, 10);
        assert_eq!(cpu.total, 960);
    }

    #[test]
    fn test_per_core_lines_ignored() {
        let cpu = parse_cpu_stat("cpu0 1 2 3 4 5 6 7 8\ncpu 9 9 9 9 9 9 9\n").unwrap();
        assert_eq!(cpu.user, 9);
        assert_eq!(cpu.steal, 0);
        assert_eq!(cpu.total, 63);
    }

    #[test]
    fn test_missing_cpu_line_is_format_error() {
        let err = parse_cpu_stat("cpu0 1 2 3 4 5 6 7\nintr 1\n").unwrap_err();
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_short_cpu_line_is_format_error() {
        assert!(parse_cpu_line("cpu 1 2 3").is_err());
    }

    #[test]
    fn test_optional_fields_and_bad_numbers_default_to_zero() {
        let cpu = parse_cpu_line("cpu 10 x 10 10 10 10 10").unwrap();
        assert_eq!(cpu.nice, 0);
        assert_eq!(cpu.steal, 0);
        assert_eq!(cpu.guest_nice, 0);
        assert_eq!(cpu.total, 60);
    }

    #[test]
    fn test_extra_trailing_fields_ignored() {
        let cpu = parse_cpu_line("cpu 1 1 1 1 1 1 1 1 1 1 99 99").unwrap();
        assert_eq!(cpu.total, 10);
    }
}
