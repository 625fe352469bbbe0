//! Snapshot assembly.
//!
//! A [`Collector`] calls a chosen subset of [`Reader`] methods and composes
//! one immutable [`Snapshot`]. Kinds that were not requested, or that failed
//! in best-effort mode, stay `None`, which is distinct from a legitimate zero.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::collectors::cpu::CpuTimes;
use crate::collectors::diskstats::DiskStats;
use crate::collectors::memory::MemInfo;
use crate::collectors::netdev::NetDevStats;
use crate::collectors::pressure::PressureSet;
use crate::collectors::process::ProcessInfo;
use crate::collectors::snmp::{NetstatStats, SnmpStats};
use crate::collectors::sockstat::SockStats;
use crate::collectors::vmstat::VmStats;
use crate::error::CollectError;
use crate::reader::Reader;
use crate::system::{FileNrStats, LoadAverage, Uptime};

/// One kernel source family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Cpu,
    Memory,
    Disk,
    Network,
    Process,
    Sockets,
    FileDescriptors,
    Pressure,
    VmStat,
    Snmp,
    Netstat,
    LoadAverage,
    Uptime,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 13] = [
        ResourceKind::Cpu,
        ResourceKind::Memory,
        ResourceKind::Disk,
        ResourceKind::Network,
        ResourceKind::Process,
        ResourceKind::Sockets,
        ResourceKind::FileDescriptors,
        ResourceKind::Pressure,
        ResourceKind::VmStat,
        ResourceKind::Snmp,
        ResourceKind::Netstat,
        ResourceKind::LoadAverage,
        ResourceKind::Uptime,
    ];

    /// Source path relative to the proc root.
    pub fn source(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "stat",
            ResourceKind::Memory => "meminfo",
            ResourceKind::Disk => "diskstats",
            ResourceKind::Network => "net/dev",
            ResourceKind::Process => "<pid>/stat",
            ResourceKind::Sockets => "net/sockstat",
            ResourceKind::FileDescriptors => "sys/fs/file-nr",
            ResourceKind::Pressure => "pressure/{cpu,memory,io}",
            ResourceKind::VmStat => "vmstat",
            ResourceKind::Snmp => "net/snmp",
            ResourceKind::Netstat => "net/netstat",
            ResourceKind::LoadAverage => "loadavg",
            ResourceKind::Uptime => "uptime",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
            ResourceKind::Disk => "disk",
            ResourceKind::Network => "network",
            ResourceKind::Process => "process",
            ResourceKind::Sockets => "sockets",
            ResourceKind::FileDescriptors => "file_descriptors",
            ResourceKind::Pressure => "pressure",
            ResourceKind::VmStat => "vmstat",
            ResourceKind::Snmp => "snmp",
            ResourceKind::Netstat => "netstat",
            ResourceKind::LoadAverage => "load_average",
            ResourceKind::Uptime => "uptime",
        };
        f.write_str(s)
    }
}

/// Partial-failure policy of a [`Collector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// The first reader failure aborts the snapshot.
    AllOrNothing,
    /// Failed kinds are left absent; an error only when every kind failed.
    BestEffort,
}

/// Point-in-time bag of raw counter records.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    #[serde(skip)]
    pub captured_at: Instant,
    pub cpu: Option<CpuTimes>,
    pub memory: Option<MemInfo>,
    pub disks: Option<Vec<DiskStats>>,
    pub network: Option<Vec<NetDevStats>>,
    pub processes: Option<Vec<ProcessInfo>>,
    pub sockets: Option<SockStats>,
    pub file_nr: Option<FileNrStats>,
    pub pressure: Option<PressureSet>,
    pub vmstat: Option<VmStats>,
    pub snmp: Option<SnmpStats>,
    pub netstat: Option<NetstatStats>,
    pub load_average: Option<LoadAverage>,
    pub uptime: Option<Uptime>,
}

impl Snapshot {
    /// A snapshot with no records, stamped now.
    pub fn empty() -> Self {
        Self {
            taken_at: Utc::now(),
            captured_at: Instant::now(),
            cpu: None,
            memory: None,
            disks: None,
            network: None,
            processes: None,
            sockets: None,
            file_nr: None,
            pressure: None,
            vmstat: None,
            snmp: None,
            netstat: None,
            load_average: None,
            uptime: None,
        }
    }

    pub fn has(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Cpu => self.cpu.is_some(),
            ResourceKind::Memory => self.memory.is_some(),
            ResourceKind::Disk => self.disks.is_some(),
            ResourceKind::Network => self.network.is_some(),
            ResourceKind::Process => self.processes.is_some(),
            ResourceKind::Sockets => self.sockets.is_some(),
            ResourceKind::FileDescriptors => self.file_nr.is_some(),
            ResourceKind::Pressure => self.pressure.is_some(),
            ResourceKind::VmStat => self.vmstat.is_some(),
            ResourceKind::Snmp => self.snmp.is_some(),
            ResourceKind::Netstat => self.netstat.is_some(),
            ResourceKind::LoadAverage => self.load_average.is_some(),
            ResourceKind::Uptime => self.uptime.is_some(),
        }
    }

    /// Runs one reader and stores its record.
    fn fill(&mut self, reader: &dyn Reader, kind: ResourceKind) -> Result<(), CollectError> {
        match kind {
            ResourceKind::Cpu => self.cpu = Some(reader.cpu()?),
            ResourceKind::Memory => self.memory = Some(reader.memory()?),
            ResourceKind::Disk => self.disks = Some(reader.disks()?),
            ResourceKind::Network => self.network = Some(reader.network()?),
            ResourceKind::Process => self.processes = Some(reader.processes()?),
            ResourceKind::Sockets => self.sockets = Some(reader.sockets()?),
            ResourceKind::FileDescriptors => self.file_nr = Some(reader.file_nr()?),
            ResourceKind::Pressure => self.pressure = Some(reader.pressure()?),
            ResourceKind::VmStat => self.vmstat = Some(reader.vmstat()?),
            ResourceKind::Snmp => self.snmp = Some(reader.snmp()?),
            ResourceKind::Netstat => self.netstat = Some(reader.netstat()?),
            ResourceKind::LoadAverage => self.load_average = Some(reader.load_average()?),
            ResourceKind::Uptime => self.uptime = Some(reader.uptime()?),
        }
        Ok(())
    }
}

/// Assembles snapshots of a fixed set of kinds from one reader.
#[derive(Clone)]
pub struct Collector {
    reader: Arc<dyn Reader>,
    kinds: Vec<ResourceKind>,
    mode: AssemblyMode,
}

impl Collector {
    pub fn new(reader: Arc<dyn Reader>, kinds: &[ResourceKind], mode: AssemblyMode) -> Self {
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();
        Self {
            reader,
            kinds,
            mode,
        }
    }

    pub fn kinds(&self) -> &[ResourceKind] {
        &self.kinds
    }

    pub fn mode(&self) -> AssemblyMode {
        self.mode
    }

    pub fn reader(&self) -> &Arc<dyn Reader> {
        &self.reader
    }

    /// Reads every requested kind once. No retries.
    pub fn collect(&self) -> Result<Snapshot, CollectError> {
        let mut snapshot = Snapshot::empty();
        let mut first_error: Option<CollectError> = None;
        let mut failures = 0usize;

        for &kind in &self.kinds {
            if let Err(e) = snapshot.fill(self.reader.as_ref(), kind) {
                match self.mode {
                    AssemblyMode::AllOrNothing => return Err(e),
                    AssemblyMode::BestEffort => {
                        debug!("Reader for {} failed, leaving it absent: {}", kind, e);
                        failures += 1;
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        if failures > 0 && failures == self.kinds.len() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(snapshot)
    }
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("reader", &self.reader.name())
            .field("kinds", &self.kinds)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::FixedReader;

    #[test]
    fn test_only_requested_kinds_present() {
        let c = Collector::new(
            Arc::new(FixedReader),
            &[ResourceKind::Cpu, ResourceKind::Memory],
            AssemblyMode::AllOrNothing,
        );
        let snap = c.collect().unwrap();
        assert!(snap.has(ResourceKind::Cpu));
        assert!(snap.has(ResourceKind::Memory));
        assert!(!snap.has(ResourceKind::Disk));
        assert!(snap.processes.is_none());
    }

    #[test]
    fn test_all_kinds_from_fixed_reader() {
        let c = Collector::new(
            Arc::new(FixedReader),
            &ResourceKind::ALL,
            AssemblyMode::AllOrNothing,
        );
        let snap = c.collect().unwrap();
        for kind in ResourceKind::ALL {
            assert!(snap.has(kind), "{} missing", kind);
        }
    }

    #[test]
    fn test_kinds_deduplicated() {
        let c = Collector::new(
            Arc::new(FixedReader),
            &[ResourceKind::Uptime, ResourceKind::Cpu, ResourceKind::Cpu],
            AssemblyMode::BestEffort,
        );
        assert_eq!(c.kinds(), &[ResourceKind::Cpu, ResourceKind::Uptime]);
    }

    #[test]
    fn test_snapshot_serializes_absent_as_null() {
        let c = Collector::new(
            Arc::new(FixedReader),
            &[ResourceKind::LoadAverage],
            AssemblyMode::BestEffort,
        );
        let json = serde_json::to_value(c.collect().unwrap()).unwrap();
        assert!(json["cpu"].is_null());
        assert_eq!(json["load_average"]["load_1m"], 0.5);
        assert!(json.get("captured_at").is_none());
    }
}
