//! Disk I/O statistics collector.
//!
//! This module parses per-device I/O counters from /proc/diskstats. Virtual and
//! optical devices are dropped; whole disks, NVMe namespaces and partitions are
//! all kept so callers can aggregate however they like.

use serde::Serialize;

/// Device name prefixes that never represent real block storage.
/// loop = loopback, ram = ramdisk, sr = optical drive.
pub const EXCLUDED_DEVICE_PREFIXES: [&str; 3] = ["loop", "ram", "sr"];

/// Major, minor and name plus at least the four read counters.
const MIN_DISKSTATS_FIELDS: usize = 7;

/// Disk statistics for a single device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskStats {
    pub name: String,
    pub reads_completed: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub time_reading_ms: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub time_writing_ms: u64,
    pub ios_in_progress: u64,
    pub time_io_ms: u64,
    pub weighted_time_io_ms: u64,
}

/// Returns true if the device is filtered out of disk listings.
pub fn is_excluded_device(name: &str) -> bool {
    EXCLUDED_DEVICE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Parses /proc/diskstats content in kernel order.
///
/// Format: major minor name read_ios read_merges read_sectors read_ticks write_ios write_merges write_sectors write_ticks ios_in_progress time_in_queue weighted_time_in_queue [discard/flush fields...]
pub fn parse_diskstats(content: &str) -> Vec<DiskStats> {
    let mut stats = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < MIN_DISKSTATS_FIELDS {
            continue; // Skip malformed lines
        }

        let name = parts[2];
        if is_excluded_device(name) {
            continue;
        }

        let field = |idx: usize| -> u64 {
            parts
                .get(idx)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };

        stats.push(DiskStats {
            name: name.to_string(),
            reads_completed: field(3),
            reads_merged: field(4),
            sectors_read: field(5),
            time_reading_ms: field(6),
            writes_completed: field(7),
            writes_merged: field(8),
            sectors_written: field(9),
            time_writing_ms: field(10),
            ios_in_progress: field(11),
            time_io_ms: field(12),
            weighted_time_io_ms: field(13),
        });
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISKSTATS: &str = "   7       0 loop0 57 0 2108 17 0 0 0 0 0 40 17 0 0 0 0\n\
                             1       0 ram0 0 0 0 0 0 0 0 0 0 0 0\n\
                             259       0 nvme0n1 197408 61234 11695850 44110 321653 185432 20391234 256713 0 190244 300823 0 0 0 0\n\
                             259       1 nvme0n1p1 370 0 13694 73 2 0 2 1 0 124 74 0 0 0 0\n\
                             8       0 sda 1000 10 20000 500 2000 20 40000 900 1 1200 1400\n\
                             11       0 sr0 12 0 40 3 0 0 0 0 0 10 3\n";

    #[test]
    fn test_virtual_and_optical_devices_excluded() {
        let stats = parse_diskstats(DISKSTATS);
        let names: Vec<&str> = stats.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["nvme0n1", "nvme0n1p1", "sda"]);
    }

    #[test]
    fn test_counters_positional() {
        let stats = parse_diskstats(DISKSTATS);
        let sda = stats.iter().find(|d| d.name == "sda").unwrap();
        assert_eq!(sda.reads_completed, 1000);
        assert_eq!(sda.sectors_read, 20000);
        assert_eq!(sda.writes_completed, 2000);
        assert_eq!(sda.sectors_written, 40000);
        assert_eq!(sda.ios_in_progress, 1);
        assert_eq!(sda.time_io_ms, 1200);
        assert_eq!(sda.weighted_time_io_ms, 1400);
    }

    #[test]
    fn test_short_line_defaults_missing_counters() {
        let stats = parse_diskstats("8 16 sdb 5 1 80 2\n");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].reads_completed, 5);
        assert_eq!(stats[0].writes_completed, 0);
    }

    #[test]
    fn test_is_excluded_device() {
        assert!(is_excluded_device("loop0"));
        assert!(is_excluded_device("ram15"));
        assert!(is_excluded_device("sr1"));
        assert!(!is_excluded_device("nvme0n1"));
        assert!(!is_excluded_device("vda"));
    }
}
