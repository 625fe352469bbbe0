//! Raw counter readers.
//!
//! [`Reader`] has one method per resource kind. [`ProcfsReader`] reads the
//! real kernel text sources below a configurable root; [`FixedReader`] hands
//! out constant values on hosts without procfs. Which one is used is decided
//! at startup by [`select_reader`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::collectors::cpu::{parse_cpu_stat, CpuTimes};
use crate::collectors::diskstats::{parse_diskstats, DiskStats};
use crate::collectors::memory::{parse_meminfo, MemInfo};
use crate::collectors::netdev::{parse_netdev, NetDevStats};
use crate::collectors::pressure::{
    parse_pressure, PressureSet, PressureStats, PRESSURE_RESOURCES,
};
use crate::collectors::process::{parse_cmdline, parse_pid_stat, ProcessInfo, PAGE_SIZE};
use crate::collectors::snmp::{parse_netstat, parse_snmp, NetstatStats, ProtocolTable, SnmpStats};
use crate::collectors::sockstat::{parse_sockstat, SockStats};
use crate::collectors::vmstat::{parse_vmstat, VmStats};
use crate::error::CollectError;
use crate::system::{parse_file_nr, parse_loadavg, parse_uptime, FileNrStats, LoadAverage, Uptime};

/// Default procfs mount point.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Source of raw counter records, one method per resource kind.
pub trait Reader: Send + Sync {
    /// Short name for logs and the index page.
    fn name(&self) -> &'static str;

    fn cpu(&self) -> Result<CpuTimes, CollectError>;
    fn memory(&self) -> Result<MemInfo, CollectError>;
    fn disks(&self) -> Result<Vec<DiskStats>, CollectError>;
    fn network(&self) -> Result<Vec<NetDevStats>, CollectError>;
    /// Processes sorted by PID ascending.
    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError>;
    fn sockets(&self) -> Result<SockStats, CollectError>;
    fn file_nr(&self) -> Result<FileNrStats, CollectError>;
    fn pressure(&self) -> Result<PressureSet, CollectError>;
    fn vmstat(&self) -> Result<VmStats, CollectError>;
    fn snmp(&self) -> Result<SnmpStats, CollectError>;
    fn netstat(&self) -> Result<NetstatStats, CollectError>;
    fn load_average(&self) -> Result<LoadAverage, CollectError>;
    fn uptime(&self) -> Result<Uptime, CollectError>;
}

/// Reads kernel text sources below `root`.
#[derive(Debug, Clone)]
pub struct ProcfsReader {
    root: PathBuf,
    page_size: u64,
}

impl ProcfsReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_page_size(root, *PAGE_SIZE)
    }

    /// Fixes the page size used for RSS conversion.
    pub fn with_page_size(root: impl Into<PathBuf>, page_size: u64) -> Self {
        Self {
            root: root.into(),
            page_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, rel: &str) -> Result<(PathBuf, String), CollectError> {
        let path = self.root.join(rel);
        match fs::read_to_string(&path) {
            Ok(content) => Ok((path, content)),
            Err(e) => Err(CollectError::unavailable(&path, e)),
        }
    }

    /// Reads `rel` and runs `parse`, labelling any format error with the full path.
    fn parse<T>(
        &self,
        rel: &str,
        parse: impl FnOnce(&str) -> Result<T, CollectError>,
    ) -> Result<T, CollectError> {
        let (path, content) = self.read(rel)?;
        parse(&content).map_err(|e| e.at(&path))
    }

    fn read_process(&self, pid: u32, proc_path: &Path) -> Result<ProcessInfo, CollectError> {
        let stat_path = proc_path.join("stat");
        let content =
            fs::read_to_string(&stat_path).map_err(|e| CollectError::unavailable(&stat_path, e))?;
        let mut info = parse_pid_stat(&content, self.page_size).map_err(|e| e.at(&stat_path))?;
        info.pid = pid;

        // cmdline is unreadable for some kernel threads; the name stands in
        let raw = fs::read(proc_path.join("cmdline")).unwrap_or_default();
        info.cmdline = parse_cmdline(&raw, &info.name);

        Ok(info)
    }
}

impl Default for ProcfsReader {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl Reader for ProcfsReader {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn cpu(&self) -> Result<CpuTimes, CollectError> {
        self.parse("stat", parse_cpu_stat)
    }

    fn memory(&self) -> Result<MemInfo, CollectError> {
        self.parse("meminfo", parse_meminfo)
    }

    fn disks(&self) -> Result<Vec<DiskStats>, CollectError> {
        self.parse("diskstats", |c| Ok(parse_diskstats(c)))
    }

    fn network(&self) -> Result<Vec<NetDevStats>, CollectError> {
        self.parse("net/dev", |c| Ok(parse_netdev(c)))
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| CollectError::unavailable(&self.root, e))?;

        let pids: Vec<(u32, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let pid = entry.file_name().to_str()?.parse::<u32>().ok()?;
                Some((pid, entry.path()))
            })
            .collect();
        debug!("Found {} pid entries under {}", pids.len(), self.root.display());

        let mut processes: Vec<ProcessInfo> = pids
            .par_iter()
            .filter_map(|(pid, path)| match self.read_process(*pid, path) {
                Ok(info) => Some(info),
                Err(e) => {
                    // Exited between listing and read, or a malformed entry
                    debug!("Skipping process {}: {}", pid, e);
                    None
                }
            })
            .collect();

        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }

    fn sockets(&self) -> Result<SockStats, CollectError> {
        self.parse("net/sockstat", parse_sockstat)
    }

    fn file_nr(&self) -> Result<FileNrStats, CollectError> {
        self.parse("sys/fs/file-nr", parse_file_nr)
    }

    fn pressure(&self) -> Result<PressureSet, CollectError> {
        let [cpu, memory, io] = PRESSURE_RESOURCES
            .map(|res| self.parse(&format!("pressure/{}", res), parse_pressure));
        Ok(PressureSet {
            cpu: cpu?,
            memory: memory?,
            io: io?,
        })
    }

    fn vmstat(&self) -> Result<VmStats, CollectError> {
        self.parse("vmstat", parse_vmstat)
    }

    fn snmp(&self) -> Result<SnmpStats, CollectError> {
        self.parse("net/snmp", parse_snmp)
    }

    fn netstat(&self) -> Result<NetstatStats, CollectError> {
        self.parse("net/netstat", parse_netstat)
    }

    fn load_average(&self) -> Result<LoadAverage, CollectError> {
        self.parse("loadavg", parse_loadavg)
    }

    fn uptime(&self) -> Result<Uptime, CollectError> {
        self.parse("uptime", parse_uptime)
    }
}

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// Constant stand-in values for hosts without procfs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedReader;

impl FixedReader {
    fn fixed_process(pid: u32, name: &str, rss_mib: u64, utime: u64, stime: u64) -> ProcessInfo {
        ProcessInfo {
            pid,
            ppid: 0,
            name: name.to_string(),
            state: "R".to_string(),
            utime,
            stime,
            start_time: 0,
            rss: rss_mib * MIB,
            cmdline: name.to_string(),
        }
    }
}

impl Reader for FixedReader {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn cpu(&self) -> Result<CpuTimes, CollectError> {
        Ok(CpuTimes::from_counters([1000, 0, 500, 8500, 0, 0, 0, 0, 0, 0]))
    }

    fn memory(&self) -> Result<MemInfo, CollectError> {
        Ok(MemInfo {
            total: 16 * GIB,
            free: 8 * GIB,
            available: 8 * GIB,
            ..Default::default()
        })
    }

    fn disks(&self) -> Result<Vec<DiskStats>, CollectError> {
        Ok(vec![DiskStats {
            name: "C:".to_string(),
            reads_completed: 5000,
            writes_completed: 2000,
            ..Default::default()
        }])
    }

    fn network(&self) -> Result<Vec<NetDevStats>, CollectError> {
        Ok(vec![NetDevStats {
            name: "Ethernet".to_string(),
            rx_bytes: 1_000_000,
            tx_bytes: 500_000,
            ..Default::default()
        }])
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>, CollectError> {
        Ok(vec![
            Self::fixed_process(1, "System", 100, 1000, 500),
            Self::fixed_process(4, "smss.exe", 50, 500, 200),
            Self::fixed_process(8, "csrss.exe", 80, 800, 300),
        ])
    }

    fn sockets(&self) -> Result<SockStats, CollectError> {
        Ok(SockStats {
            sockets_used: 150,
            tcp_inuse: 45,
            tcp_tw: 12,
            tcp_alloc: 50,
            tcp_mem: 8,
            udp_inuse: 10,
            udp_mem: 2,
            ..Default::default()
        })
    }

    fn file_nr(&self) -> Result<FileNrStats, CollectError> {
        Ok(FileNrStats {
            allocated: 1024,
            free: 512,
            max: 65536,
        })
    }

    fn pressure(&self) -> Result<PressureSet, CollectError> {
        Ok(PressureSet {
            cpu: PressureStats::default(),
            memory: PressureStats::default(),
            io: PressureStats::default(),
        })
    }

    fn vmstat(&self) -> Result<VmStats, CollectError> {
        Ok(VmStats {
            pgfault: 100_000,
            pgmajfault: 50,
            pgpgin: 50_000,
            pgpgout: 30_000,
            ..Default::default()
        })
    }

    fn snmp(&self) -> Result<SnmpStats, CollectError> {
        let table: ProtocolTable = [
            ("IpInReceives", 500_000),
            ("IpOutRequests", 400_000),
            ("IpInDiscards", 10),
            ("IpOutDiscards", 5),
            ("TcpActiveOpens", 1000),
            ("TcpPassiveOpens", 500),
            ("TcpCurrEstab", 25),
            ("TcpInSegs", 300_000),
            ("TcpOutSegs", 250_000),
            ("TcpRetransSegs", 100),
            ("TcpInErrs", 5),
            ("TcpOutRsts", 50),
            ("UdpInDatagrams", 50_000),
            ("UdpOutDatagrams", 40_000),
            ("UdpInErrors", 0),
            ("UdpNoPorts", 10),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Ok(SnmpStats::from_table(table))
    }

    fn netstat(&self) -> Result<NetstatStats, CollectError> {
        let table: ProtocolTable = [
            ("TcpExtTCPTimeouts", 50),
            ("IpExtInOctets", 1_000_000_000),
            ("IpExtOutOctets", 800_000_000),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Ok(NetstatStats::from_table(table))
    }

    fn load_average(&self) -> Result<LoadAverage, CollectError> {
        Ok(LoadAverage {
            one_min: 0.5,
            five_min: 0.3,
            fifteen_min: 0.2,
        })
    }

    fn uptime(&self) -> Result<Uptime, CollectError> {
        Ok(Uptime {
            uptime_secs: 86400.0,
            idle_secs: 43200.0,
        })
    }
}

/// How the reader is chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderMode {
    /// procfs when `<root>/stat` exists, fixed values otherwise.
    #[default]
    Auto,
    Procfs,
    Fixed,
}

impl FromStr for ReaderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ReaderMode::Auto),
            "procfs" => Ok(ReaderMode::Procfs),
            "fixed" => Ok(ReaderMode::Fixed),
            other => Err(format!(
                "unknown reader mode '{}', expected auto, procfs or fixed",
                other
            )),
        }
    }
}

impl fmt::Display for ReaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReaderMode::Auto => "auto",
            ReaderMode::Procfs => "procfs",
            ReaderMode::Fixed => "fixed",
        };
        f.write_str(s)
    }
}

/// Picks the reader implementation for this host.
pub fn select_reader(mode: ReaderMode, root: impl AsRef<Path>) -> Arc<dyn Reader> {
    let root = root.as_ref();
    let reader: Arc<dyn Reader> = match mode {
        ReaderMode::Procfs => Arc::new(ProcfsReader::new(root)),
        ReaderMode::Fixed => Arc::new(FixedReader),
        ReaderMode::Auto if root.join("stat").exists() => Arc::new(ProcfsReader::new(root)),
        ReaderMode::Auto => Arc::new(FixedReader),
    };
    info!(
        "Using {} reader (mode={}, root={})",
        reader.name(),
        mode,
        root.display()
    );
    reader
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_source_is_unavailable() {
        let dir = tempdir().unwrap();
        let reader = ProcfsReader::new(dir.path());
        let err = reader.cpu().unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("stat"));
    }

    #[test]
    fn test_format_error_carries_full_path() {
        let dir = tempdir().unwrap();
        write(dir.path(), "meminfo", "MemFree: 1 kB\n");
        let err = ProcfsReader::new(dir.path()).memory().unwrap_err();
        assert!(!err.is_unavailable());
        assert!(err.to_string().contains(&dir.path().join("meminfo").display().to_string()));
    }

    #[test]
    fn test_processes_sorted_and_non_pid_entries_ignored() {
        let dir = tempdir().unwrap();
        let tail = "S 1 0 0 0 -1 0 0 0 0 0 7 3 0 0 20 0 1 0 500 0 2";
        write(dir.path(), "300/stat", &format!("300 (c) {}", tail));
        write(dir.path(), "12/stat", &format!("12 (a b) {}", tail));
        write(dir.path(), "12/cmdline", "/bin/a\0--flag\0");
        write(dir.path(), "45/stat", &format!("45 (b) {}", tail));
        write(dir.path(), "self/stat", &format!("1 (self) {}", tail));
        write(dir.path(), "stat", "cpu 1 1 1 1 1 1 1\n");
        // listed but vanished before the detail read
        fs::create_dir_all(dir.path().join("99")).unwrap();

        let procs = ProcfsReader::with_page_size(dir.path(), 4096)
            .processes()
            .unwrap();
        let pids: Vec<u32> = procs.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![12, 45, 300]);
        assert_eq!(procs[0].name, "a b");
        assert_eq!(procs[0].cmdline, "/bin/a --flag");
        assert_eq!(procs[1].cmdline, "b");
        assert_eq!(procs[0].rss, 2 * 4096);
        assert_eq!(procs[0].cpu_ticks(), 10);
    }

    #[test]
    fn test_pressure_reads_three_resources() {
        let dir = tempdir().unwrap();
        write(dir.path(), "pressure/cpu", "some avg10=1.00 avg60=0 avg300=0 total=1\n");
        write(dir.path(), "pressure/memory", "some avg10=2.00 avg60=0 avg300=0 total=2\nfull avg10=0.5 avg60=0 avg300=0 total=1\n");
        write(dir.path(), "pressure/io", "some avg10=3.00 avg60=0 avg300=0 total=3\n");
        let psi = ProcfsReader::new(dir.path()).pressure().unwrap();
        assert_eq!(psi.cpu.some_avg10, 1.0);
        assert_eq!(psi.memory.full_avg10, 0.5);
        assert_eq!(psi.io.some_total, 3);
    }

    #[test]
    fn test_pressure_missing_resource_names_its_file() {
        let dir = tempdir().unwrap();
        for res in ["cpu", "memory"] {
            write(
                dir.path(),
                &format!("pressure/{}", res),
                "some avg10=0 avg60=0 avg300=0 total=0\n",
            );
        }
        let err = ProcfsReader::new(dir.path()).pressure().unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("pressure/io"));
    }

    #[test]
    fn test_select_reader_auto() {
        let dir = tempdir().unwrap();
        assert_eq!(select_reader(ReaderMode::Auto, dir.path()).name(), "fixed");
        write(dir.path(), "stat", "cpu 1 1 1 1 1 1 1\n");
        assert_eq!(select_reader(ReaderMode::Auto, dir.path()).name(), "procfs");
        assert_eq!(select_reader(ReaderMode::Fixed, dir.path()).name(), "fixed");
    }

    #[test]
    fn test_reader_mode_from_str() {
        assert_eq!("AUTO".parse::<ReaderMode>().unwrap(), ReaderMode::Auto);
        assert_eq!("procfs".parse::<ReaderMode>().unwrap(), ReaderMode::Procfs);
        assert!("sysfs".parse::<ReaderMode>().is_err());
    }

    #[test]
    fn test_fixed_reader_values() {
        let r = FixedReader;
        assert_eq!(r.cpu().unwrap().total, 10000);
        assert_eq!(r.memory().unwrap().total, 16 * GIB);
        assert_eq!(r.processes().unwrap().len(), 3);
        assert_eq!(r.snmp().unwrap().tcp_active_opens, 1000);
        assert_eq!(r.netstat().unwrap().tcp_timeouts, 50);
        assert!((r.file_nr().unwrap().used_percent() - 0.78125).abs() < 1e-9);
    }
}
