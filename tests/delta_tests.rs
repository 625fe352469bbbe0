//! Integration tests for the delta engine.
//!
//! These build snapshots by hand and check the derived CPU breakdown,
//! process shares and throughput against known intervals.

use std::time::Duration;

use procpulse::collectors::cpu::{parse_cpu_stat, CpuTimes};
use procpulse::collectors::diskstats::DiskStats;
use procpulse::collectors::memory::MemInfo;
use procpulse::collectors::netdev::NetDevStats;
use procpulse::collectors::process::ProcessInfo;
use procpulse::delta::compute_memory_usage;
use procpulse::{compute_usage, rank_processes, RankBy, Snapshot};

fn cpu_snapshot(counters: [u64; 10]) -> Snapshot {
    let mut snap = Snapshot::empty();
    snap.cpu = Some(CpuTimes::from_counters(counters));
    snap
}

fn process(pid: u32, start_time: u64, utime: u64) -> ProcessInfo {
    ProcessInfo {
        pid,
        name: format!("proc{}", pid),
        start_time,
        utime,
        ..Default::default()
    }
}

fn iface(name: &str, rx_bytes: u64, tx_bytes: u64) -> NetDevStats {
    NetDevStats {
        name: name.to_string(),
        rx_bytes,
        tx_bytes,
        ..Default::default()
    }
}

#[test]
fn test_identical_snapshots_give_zero_percentages() {
    let cpu = parse_cpu_stat("cpu 100 0 50 800 10 0 0 0 0 0\n").unwrap();
    let mut snap = Snapshot::empty();
    snap.cpu = Some(cpu);

    let report = compute_usage(&snap, Some(&snap), Duration::from_secs(1));
    let usage = report.cpu.unwrap();
    assert_eq!(usage.total, 0.0);
    assert_eq!(usage.user, 0.0);
    assert_eq!(usage.system, 0.0);
    assert_eq!(usage.idle, 0.0);
    assert_eq!(usage.iowait, 0.0);
}

#[test]
fn test_no_previous_snapshot_gives_zero_percentages() {
    let snap = cpu_snapshot([100, 0, 50, 800, 10, 0, 0, 0, 0, 0]);
    let report = compute_usage(&snap, None, Duration::ZERO);
    let usage = report.cpu.unwrap();
    assert_eq!(usage.total, 0.0);
    assert!(!usage.total.is_nan());
    assert_eq!(report.elapsed_secs, 0.0);
}

#[test]
fn test_busy_percent_from_idle_delta() {
    // total 1000 -> 1100, idle 800 -> 850
    let prev = cpu_snapshot([150, 0, 50, 800, 0, 0, 0, 0, 0, 0]);
    let curr = cpu_snapshot([180, 0, 70, 850, 0, 0, 0, 0, 0, 0]);

    let usage = compute_usage(&curr, Some(&prev), Duration::from_secs(1))
        .cpu
        .unwrap();
    assert_eq!(usage.total, 50.0);
    assert_eq!(usage.idle, 50.0);
    assert_eq!(usage.user, 30.0);
    assert_eq!(usage.system, 20.0);
}

#[test]
fn test_cpu_categories_sum_to_hundred() {
    let prev = cpu_snapshot([1000, 20, 300, 5000, 40, 5, 7, 3, 0, 0]);
    let curr = cpu_snapshot([1137, 31, 389, 5412, 77, 9, 16, 11, 0, 0]);

    let u = compute_usage(&curr, Some(&prev), Duration::from_secs(2))
        .cpu
        .unwrap();
    for pct in [u.user, u.system, u.idle, u.iowait, u.steal, u.other, u.total] {
        assert!((0.0..=100.0).contains(&pct), "{} out of range", pct);
    }
    let sum = u.user + u.system + u.idle + u.iowait + u.steal + u.other;
    assert!((sum - 100.0).abs() < 1e-9, "sum was {}", sum);
    assert!((u.total + u.idle - 100.0).abs() < 1e-9);
}

#[test]
fn test_process_share_uses_system_tick_delta() {
    let mut prev = cpu_snapshot([100, 0, 0, 900, 0, 0, 0, 0, 0, 0]);
    let mut curr = cpu_snapshot([150, 0, 0, 1050, 0, 0, 0, 0, 0, 0]);
    prev.processes = Some(vec![process(10, 500, 40), process(11, 600, 0)]);
    curr.processes = Some(vec![process(10, 500, 90), process(11, 600, 0)]);

    let procs = compute_usage(&curr, Some(&prev), Duration::from_secs(1))
        .processes
        .unwrap();
    // 50 ticks of a 200 tick interval
    assert_eq!(procs[0].cpu_percent, 25.0);
    assert!(!procs[0].is_new);
    assert_eq!(procs[1].cpu_percent, 0.0);
}

#[test]
fn test_iowait_decrease_gives_zero_breakdown() {
    let prev = cpu_snapshot([100, 0, 50, 800, 100, 0, 0, 0, 0, 0]);
    let curr = cpu_snapshot([100, 0, 50, 900, 40, 0, 0, 0, 0, 0]);

    let u = compute_usage(&curr, Some(&prev), Duration::from_secs(1))
        .cpu
        .unwrap();
    assert_eq!(u.idle, 0.0);
    assert_eq!(u.total, 0.0);
    assert_eq!(u.iowait, 0.0);
}

#[test]
fn test_any_counter_going_back_voids_the_interval() {
    // Total still grows by 220, but iowait dropped by 10
    let mut prev = cpu_snapshot([100, 0, 50, 800, 100, 0, 0, 0, 0, 0]);
    let mut curr = cpu_snapshot([200, 0, 80, 900, 90, 0, 0, 0, 0, 0]);
    prev.processes = Some(vec![process(5, 1, 10)]);
    curr.processes = Some(vec![process(5, 1, 60)]);

    let report = compute_usage(&curr, Some(&prev), Duration::from_secs(1));
    let u = report.cpu.unwrap();
    for pct in [u.user, u.system, u.idle, u.iowait, u.steal, u.other, u.total] {
        assert_eq!(pct, 0.0);
    }
    let procs = report.processes.unwrap();
    assert_eq!(procs[0].cpu_percent, 0.0);
    assert!(!procs[0].is_new);
}

#[test]
fn test_process_share_is_capped_at_hundred() {
    // System advanced 10 ticks while the process file shows 50
    let mut prev = cpu_snapshot([100, 0, 0, 900, 0, 0, 0, 0, 0, 0]);
    let mut curr = cpu_snapshot([105, 0, 0, 905, 0, 0, 0, 0, 0, 0]);
    prev.processes = Some(vec![process(77, 3, 0)]);
    curr.processes = Some(vec![process(77, 3, 50)]);

    let procs = compute_usage(&curr, Some(&prev), Duration::from_secs(1))
        .processes
        .unwrap();
    assert_eq!(procs[0].cpu_percent, 100.0);
}

#[test]
fn test_recycled_pid_is_treated_as_new() {
    let mut prev = cpu_snapshot([100, 0, 0, 900, 0, 0, 0, 0, 0, 0]);
    let mut curr = cpu_snapshot([200, 0, 0, 1000, 0, 0, 0, 0, 0, 0]);
    prev.processes = Some(vec![process(42, 1000, 10)]);
    curr.processes = Some(vec![process(42, 2000, 500)]);

    let procs = compute_usage(&curr, Some(&prev), Duration::from_secs(1))
        .processes
        .unwrap();
    assert!(procs[0].is_new);
    assert_eq!(procs[0].cpu_percent, 0.0);
}

#[test]
fn test_appearing_and_vanishing_processes_drop_out_of_cpu_ranking() {
    let mut prev = cpu_snapshot([100, 0, 0, 900, 0, 0, 0, 0, 0, 0]);
    let mut curr = cpu_snapshot([200, 0, 0, 1000, 0, 0, 0, 0, 0, 0]);
    prev.processes = Some(vec![process(1, 10, 0), process(2, 20, 0)]);
    curr.processes = Some(vec![process(1, 10, 30), process(3, 30, 70)]);

    let procs = compute_usage(&curr, Some(&prev), Duration::from_secs(1))
        .processes
        .unwrap();
    assert_eq!(procs.len(), 2);

    let ranked = rank_processes(procs, RankBy::Cpu, 10);
    let pids: Vec<u32> = ranked.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![1]);
}

#[test]
fn test_interface_counter_reset_clamps_to_zero() {
    let mut prev = Snapshot::empty();
    let mut curr = Snapshot::empty();
    prev.network = Some(vec![iface("eth0", 10_000, 5_000), iface("wlan0", 100, 100)]);
    curr.network = Some(vec![
        iface("eth0", 500, 7_000),
        iface("wlan0", 2_100, 100),
        iface("veth1", 900, 900),
    ]);

    let rates = compute_usage(&curr, Some(&prev), Duration::from_secs(2))
        .network
        .unwrap();
    assert_eq!(rates[0].name, "eth0");
    assert_eq!(rates[0].rx_bytes_per_sec, 0.0);
    assert_eq!(rates[0].tx_bytes_per_sec, 1_000.0);
    assert_eq!(rates[1].rx_bytes_per_sec, 1_000.0);
    // Not present before
    assert_eq!(rates[2].rx_bytes_per_sec, 0.0);
    assert!(rates.iter().all(|r| r.rx_bytes_per_sec >= 0.0));
}

#[test]
fn test_disk_rates_convert_sectors_to_bytes() {
    let disk = |reads, sectors| DiskStats {
        name: "nvme0n1".to_string(),
        reads_completed: reads,
        sectors_read: sectors,
        ..Default::default()
    };
    let mut prev = Snapshot::empty();
    let mut curr = Snapshot::empty();
    prev.disks = Some(vec![disk(100, 1_000)]);
    curr.disks = Some(vec![disk(150, 3_000)]);

    let rates = compute_usage(&curr, Some(&prev), Duration::from_secs(1))
        .disks
        .unwrap();
    assert_eq!(rates[0].reads_per_sec, 50.0);
    assert_eq!(rates[0].read_bytes_per_sec, 2_000.0 * 512.0);
}

#[test]
fn test_zero_elapsed_gives_zero_rates() {
    let mut prev = Snapshot::empty();
    let mut curr = Snapshot::empty();
    prev.network = Some(vec![iface("eth0", 0, 0)]);
    curr.network = Some(vec![iface("eth0", 4_096, 4_096)]);

    let rates = compute_usage(&curr, Some(&prev), Duration::ZERO)
        .network
        .unwrap();
    assert_eq!(rates[0].rx_bytes_per_sec, 0.0);
    assert_eq!(rates[0].tx_bytes_per_sec, 0.0);
}

#[test]
fn test_memory_zero_total_is_guarded() {
    let usage = compute_memory_usage(&MemInfo::default());
    assert_eq!(usage.usage_percent, 0.0);
    assert_eq!(usage.swap_usage_percent, 0.0);
}

#[test]
fn test_memory_used_saturates_on_inconsistent_input() {
    let mem = MemInfo {
        total: 1_000,
        free: 600,
        buffers: 300,
        cached: 400,
        ..Default::default()
    };
    let usage = compute_memory_usage(&mem);
    assert_eq!(usage.used, 0);
    assert_eq!(usage.usage_percent, 40.0);
}

#[test]
fn test_absent_kinds_stay_absent_in_report() {
    let snap = Snapshot::empty();
    let report = compute_usage(&snap, None, Duration::from_secs(1));
    assert!(report.cpu.is_none());
    assert!(report.memory.is_none());
    assert!(report.processes.is_none());
}
