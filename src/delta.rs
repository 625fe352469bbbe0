//! Delta engine: turns pairs of snapshots into rates and percentages.
//!
//! Everything here is pure and stateless. Callers keep the previous
//! [`Snapshot`] and hand it back on the next cycle; [`SamplingStrategy`]
//! wraps the two ways of doing that so both share [`compute_usage`].
//!
//! Guards shared by all computations:
//! - a zero denominator yields 0, never NaN
//! - a counter that went backwards yields 0 for that entity
//! - an entity missing from the previous snapshot yields 0 for this cycle

use std::thread;
use std::time::Duration;

use ahash::AHashMap as HashMap;
use serde::Serialize;

use crate::collectors::cpu::CpuTimes;
use crate::collectors::diskstats::DiskStats;
use crate::collectors::memory::MemInfo;
use crate::collectors::netdev::NetDevStats;
use crate::collectors::process::ProcessInfo;
use crate::error::CollectError;
use crate::snapshot::{Collector, Snapshot};

/// Bytes per sector in /proc/diskstats, independent of the device.
pub const SECTOR_SIZE: u64 = 512;

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn ratio_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Per-second rate of a monotonic counter. 0 on a reset or a zero interval.
pub fn counter_rate(curr: u64, prev: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    match curr.checked_sub(prev) {
        Some(delta) => delta as f64 / elapsed_secs,
        None => 0.0,
    }
}

/// CPU time breakdown over an interval, in percent of all ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    /// Everything except idle.
    pub total: f64,
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub guest: f64,
    /// nice + irq + softirq + guest + guest_nice.
    pub other: f64,
}

/// Tick delta between two aggregate CPU records.
///
/// 0 without a previous record, and 0 when any single counter went backwards
/// (iowait is allowed to decrease), since the categories would no longer add
/// up to the total.
pub fn cpu_total_delta(curr: &CpuTimes, prev: Option<&CpuTimes>) -> u64 {
    let Some(prev) = prev else {
        return 0;
    };
    let went_back = curr
        .counters()
        .iter()
        .zip(prev.counters().iter())
        .any(|(c, p)| c < p);
    if went_back {
        return 0;
    }
    curr.total.saturating_sub(prev.total)
}

pub fn compute_cpu_usage(curr: &CpuTimes, prev: Option<&CpuTimes>) -> CpuUsage {
    let total = cpu_total_delta(curr, prev);
    let Some(prev) = prev else {
        return CpuUsage::default();
    };
    if total == 0 {
        return CpuUsage::default();
    }

    let user = curr.user.saturating_sub(prev.user);
    let nice = curr.nice.saturating_sub(prev.nice);
    let system = curr.system.saturating_sub(prev.system);
    let idle = curr.idle.saturating_sub(prev.idle);
    let iowait = curr.iowait.saturating_sub(prev.iowait);
    let irq = curr.irq.saturating_sub(prev.irq);
    let softirq = curr.softirq.saturating_sub(prev.softirq);
    let steal = curr.steal.saturating_sub(prev.steal);
    let guest = curr.guest.saturating_sub(prev.guest);
    let guest_nice = curr.guest_nice.saturating_sub(prev.guest_nice);

    let other = nice + irq + softirq + guest + guest_nice;

    CpuUsage {
        total: ratio_percent(total.saturating_sub(idle), total),
        user: ratio_percent(user, total),
        nice: ratio_percent(nice, total),
        system: ratio_percent(system, total),
        idle: ratio_percent(idle, total),
        iowait: ratio_percent(iowait, total),
        irq: ratio_percent(irq, total),
        softirq: ratio_percent(softirq, total),
        steal: ratio_percent(steal, total),
        guest: ratio_percent(guest, total),
        other: ratio_percent(other, total),
    }
}

/// Memory figures derived from one meminfo record. Bytes unless noted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total: u64,
    /// total - free - buffers - cached, clamped at 0.
    pub used: u64,
    pub free: u64,
    pub available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub active: u64,
    pub inactive: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    /// (total - free) / total.
    pub usage_percent: f64,
    pub swap_usage_percent: f64,
}

pub fn compute_memory_usage(mem: &MemInfo) -> MemoryUsage {
    let used = mem
        .total
        .saturating_sub(mem.free)
        .saturating_sub(mem.buffers)
        .saturating_sub(mem.cached);
    let swap_used = mem.swap_total.saturating_sub(mem.swap_free);

    MemoryUsage {
        total: mem.total,
        used,
        free: mem.free,
        available: mem.available,
        buffers: mem.buffers,
        cached: mem.cached,
        active: mem.active,
        inactive: mem.inactive,
        swap_total: mem.swap_total,
        swap_used,
        swap_free: mem.swap_free,
        usage_percent: ratio_percent(mem.total.saturating_sub(mem.free), mem.total),
        swap_usage_percent: ratio_percent(swap_used, mem.swap_total),
    }
}

/// Throughput of one network interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterfaceRate {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_packets_per_sec: f64,
}

/// Matches interfaces by name. Order follows `curr`.
pub fn compute_interface_rates(
    curr: &[NetDevStats],
    prev: Option<&[NetDevStats]>,
    elapsed: Duration,
) -> Vec<InterfaceRate> {
    let secs = elapsed.as_secs_f64();
    let prev_by_name: HashMap<&str, &NetDevStats> = prev
        .unwrap_or_default()
        .iter()
        .map(|n| (n.name.as_str(), n))
        .collect();

    curr.iter()
        .map(|n| {
            let mut rate = InterfaceRate {
                name: n.name.clone(),
                rx_bytes: n.rx_bytes,
                tx_bytes: n.tx_bytes,
                ..Default::default()
            };
            if let Some(p) = prev_by_name.get(n.name.as_str()) {
                rate.rx_bytes_per_sec = counter_rate(n.rx_bytes, p.rx_bytes, secs);
                rate.tx_bytes_per_sec = counter_rate(n.tx_bytes, p.tx_bytes, secs);
                rate.rx_packets_per_sec = counter_rate(n.rx_packets, p.rx_packets, secs);
                rate.tx_packets_per_sec = counter_rate(n.tx_packets, p.tx_packets, secs);
            }
            rate
        })
        .collect()
}

/// Throughput of one block device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskRate {
    pub name: String,
    pub reads_per_sec: f64,
    pub writes_per_sec: f64,
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
}

/// Matches devices by name. Order follows `curr`.
pub fn compute_disk_rates(
    curr: &[DiskStats],
    prev: Option<&[DiskStats]>,
    elapsed: Duration,
) -> Vec<DiskRate> {
    let secs = elapsed.as_secs_f64();
    let prev_by_name: HashMap<&str, &DiskStats> = prev
        .unwrap_or_default()
        .iter()
        .map(|d| (d.name.as_str(), d))
        .collect();

    curr.iter()
        .map(|d| {
            let mut rate = DiskRate {
                name: d.name.clone(),
                ..Default::default()
            };
            if let Some(p) = prev_by_name.get(d.name.as_str()) {
                rate.reads_per_sec = counter_rate(d.reads_completed, p.reads_completed, secs);
                rate.writes_per_sec = counter_rate(d.writes_completed, p.writes_completed, secs);
                rate.read_bytes_per_sec = counter_rate(
                    d.sectors_read.saturating_mul(SECTOR_SIZE),
                    p.sectors_read.saturating_mul(SECTOR_SIZE),
                    secs,
                );
                rate.write_bytes_per_sec = counter_rate(
                    d.sectors_written.saturating_mul(SECTOR_SIZE),
                    p.sectors_written.saturating_mul(SECTOR_SIZE),
                    secs,
                );
            }
            rate
        })
        .collect()
}

/// A process with its CPU share over the interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessUsage {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub state: String,
    pub cmdline: String,
    pub rss: u64,
    pub cpu_ticks: u64,
    /// Share of all CPU ticks in the interval, comparable to system usage. At most 100.
    pub cpu_percent: f64,
    /// No matching (pid, start time) in the previous snapshot.
    pub is_new: bool,
}

/// Matches processes by (pid, start time); a recycled PID counts as new.
/// `cpu_total_delta` must be the system tick delta of the same interval.
pub fn compute_process_usage(
    curr: &[ProcessInfo],
    prev: Option<&[ProcessInfo]>,
    cpu_total_delta: u64,
) -> Vec<ProcessUsage> {
    let prev_by_id: HashMap<(u32, u64), &ProcessInfo> = prev
        .unwrap_or_default()
        .iter()
        .map(|p| ((p.pid, p.start_time), p))
        .collect();

    curr.iter()
        .map(|p| {
            let ticks = p.cpu_ticks();
            let (cpu_percent, is_new) = match prev_by_id.get(&(p.pid, p.start_time)) {
                // pid files are read after /proc/stat, so a busy process can
                // outrun the system delta slightly
                Some(old) => (
                    ratio_percent(ticks.saturating_sub(old.cpu_ticks()), cpu_total_delta)
                        .min(100.0),
                    false,
                ),
                None => (0.0, true),
            };
            ProcessUsage {
                pid: p.pid,
                ppid: p.ppid,
                name: p.name.clone(),
                state: p.state.clone(),
                cmdline: p.cmdline.clone(),
                rss: p.rss,
                cpu_ticks: ticks,
                cpu_percent,
                is_new,
            }
        })
        .collect()
}

/// Derived values for every kind present in the current snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageReport {
    pub elapsed_secs: f64,
    pub cpu: Option<CpuUsage>,
    pub memory: Option<MemoryUsage>,
    pub disks: Option<Vec<DiskRate>>,
    pub network: Option<Vec<InterfaceRate>>,
    pub processes: Option<Vec<ProcessUsage>>,
}

/// Computes usage from `curr` against `prev` over `elapsed`.
///
/// Without `prev` every rate and percentage is 0 and every process is new.
pub fn compute_usage(curr: &Snapshot, prev: Option<&Snapshot>, elapsed: Duration) -> UsageReport {
    let prev_cpu = prev.and_then(|p| p.cpu.as_ref());
    let total_delta = curr
        .cpu
        .as_ref()
        .map_or(0, |c| cpu_total_delta(c, prev_cpu));

    UsageReport {
        elapsed_secs: elapsed.as_secs_f64(),
        cpu: curr.cpu.as_ref().map(|c| compute_cpu_usage(c, prev_cpu)),
        memory: curr.memory.as_ref().map(compute_memory_usage),
        disks: curr.disks.as_deref().map(|d| {
            compute_disk_rates(d, prev.and_then(|p| p.disks.as_deref()), elapsed)
        }),
        network: curr.network.as_deref().map(|n| {
            compute_interface_rates(n, prev.and_then(|p| p.network.as_deref()), elapsed)
        }),
        processes: curr.processes.as_deref().map(|procs| {
            compute_process_usage(
                procs,
                prev.and_then(|p| p.processes.as_deref()),
                total_delta,
            )
        }),
    }
}

/// A snapshot together with the usage derived for it.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub snapshot: Snapshot,
    pub usage: UsageReport,
}

/// Who owns the previous snapshot and the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// Two reads separated by `pause`, both owned by the call. Blocks.
    OneShot { pause: Duration },
    /// One read; the caller supplies the previous cycle's snapshot.
    ExternalInterval,
}

impl SamplingStrategy {
    /// Collects and computes usage. `prev` is ignored by [`SamplingStrategy::OneShot`].
    pub fn sample(
        &self,
        collector: &Collector,
        prev: Option<&Snapshot>,
    ) -> Result<Sample, CollectError> {
        match *self {
            SamplingStrategy::OneShot { pause } => {
                let first = collector.collect()?;
                thread::sleep(pause);
                let second = collector.collect()?;
                let elapsed = second.captured_at.duration_since(first.captured_at);
                let usage = compute_usage(&second, Some(&first), elapsed);
                Ok(Sample {
                    snapshot: second,
                    usage,
                })
            }
            SamplingStrategy::ExternalInterval => {
                let curr = collector.collect()?;
                let elapsed = prev
                    .map(|p| curr.captured_at.saturating_duration_since(p.captured_at))
                    .unwrap_or(Duration::ZERO);
                let usage = compute_usage(&curr, prev, elapsed);
                Ok(Sample {
                    snapshot: curr,
                    usage,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(user: u64, system: u64, idle: u64) -> CpuTimes {
        CpuTimes::from_counters([user, 0, system, idle, 0, 0, 0, 0, 0, 0])
    }

    #[test]
    fn test_ratio_percent_zero_whole() {
        assert_eq!(ratio_percent(5, 0), 0.0);
        assert_eq!(ratio_percent(1, 4), 25.0);
    }

    #[test]
    fn test_counter_rate_guards() {
        assert_eq!(counter_rate(200, 100, 2.0), 50.0);
        assert_eq!(counter_rate(50, 100, 2.0), 0.0);
        assert_eq!(counter_rate(200, 100, 0.0), 0.0);
    }

    #[test]
    fn test_cpu_usage_busy_fifty_percent() {
        let prev = CpuTimes::from_counters([100, 0, 100, 800, 0, 0, 0, 0, 0, 0]);
        let curr = CpuTimes::from_counters([130, 0, 120, 850, 0, 0, 0, 0, 0, 0]);
        let u = compute_cpu_usage(&curr, Some(&prev));
        assert_eq!(u.total, 50.0);
        assert_eq!(u.user, 30.0);
        assert_eq!(u.system, 20.0);
        assert_eq!(u.idle, 50.0);
    }

    #[test]
    fn test_cpu_usage_without_prev_is_zero() {
        assert_eq!(compute_cpu_usage(&cpu(1, 1, 1), None), CpuUsage::default());
    }

    #[test]
    fn test_cpu_usage_counter_reset_is_zero() {
        let u = compute_cpu_usage(&cpu(1, 1, 1), Some(&cpu(100, 100, 100)));
        assert_eq!(u, CpuUsage::default());
    }

    #[test]
    fn test_memory_used_clamped() {
        let mem = MemInfo {
            total: 100,
            free: 60,
            buffers: 30,
            cached: 30,
            swap_total: 10,
            swap_free: 20,
            ..Default::default()
        };
        let u = compute_memory_usage(&mem);
        assert_eq!(u.used, 0);
        assert_eq!(u.swap_used, 0);
        assert_eq!(u.usage_percent, 40.0);
    }

    #[test]
    fn test_process_recycled_pid_is_new() {
        let old = ProcessInfo {
            pid: 10,
            start_time: 100,
            utime: 50,
            ..Default::default()
        };
        let recycled = ProcessInfo {
            pid: 10,
            start_time: 900,
            utime: 5,
            ..Default::default()
        };
        let usage = compute_process_usage(&[recycled], Some(&[old]), 100);
        assert!(usage[0].is_new);
        assert_eq!(usage[0].cpu_percent, 0.0);
    }
}
