//! Snapshot command implementation.
//!
//! Takes one one-shot sample over every resource kind and prints it.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use procpulse::collectors::pressure::PressureSet;
use procpulse::collectors::snmp::{NetstatStats, SnmpStats};
use procpulse::collectors::sockstat::SockStats;
use procpulse::collectors::vmstat::VmStats;
use procpulse::delta::{CpuUsage, DiskRate, InterfaceRate, MemoryUsage, ProcessUsage};
use procpulse::system::{FileNrStats, LoadAverage, Uptime};
use procpulse::{
    rank_processes, select_reader, AssemblyMode, Collector, RankBy, ResourceKind, Sample,
    SamplingStrategy,
};

use crate::cli::ConfigFormat;
use crate::config::Config;

/// Printable result of one sample.
#[derive(Debug, Serialize)]
pub struct SnapshotReport {
    pub reader: &'static str,
    pub taken_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub cpu: Option<CpuUsage>,
    pub memory: Option<MemoryUsage>,
    pub disks: Option<Vec<DiskRate>>,
    pub network: Option<Vec<InterfaceRate>>,
    pub top_cpu: Vec<ProcessUsage>,
    pub top_memory: Vec<ProcessUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessUsage>>,
    pub load_average: Option<LoadAverage>,
    pub uptime: Option<Uptime>,
    pub sockets: Option<SockStats>,
    pub file_nr: Option<FileNrStats>,
    pub pressure: Option<PressureSet>,
    pub vmstat: Option<VmStats>,
    pub snmp: Option<SnmpStats>,
    pub netstat: Option<NetstatStats>,
}

impl SnapshotReport {
    /// Builds the report. The full process list is kept only when `verbose`.
    pub fn from_sample(
        reader: &'static str,
        sample: Sample,
        config: &Config,
        verbose: bool,
    ) -> Self {
        let Sample { snapshot, usage } = sample;
        let procs = config
            .process_filter()
            .apply(usage.processes.unwrap_or_default());
        let top_n = config.top_n();

        Self {
            reader,
            taken_at: snapshot.taken_at,
            elapsed_secs: usage.elapsed_secs,
            cpu: usage.cpu,
            memory: usage.memory,
            disks: usage.disks,
            network: usage.network,
            top_cpu: rank_processes(procs.clone(), RankBy::Cpu, top_n),
            top_memory: rank_processes(procs.clone(), RankBy::Memory, top_n),
            processes: verbose.then_some(procs),
            load_average: snapshot.load_average,
            uptime: snapshot.uptime,
            sockets: snapshot.sockets,
            file_nr: snapshot.file_nr,
            pressure: snapshot.pressure,
            vmstat: snapshot.vmstat,
            snmp: snapshot.snmp,
            netstat: snapshot.netstat,
        }
    }
}

/// Takes one sample and prints it.
pub fn command_snapshot(
    format: ConfigFormat,
    pause_ms: Option<u64>,
    verbose: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let pause = pause_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.sample_pause());
    if pause.is_zero() {
        return Err("pause must be greater than 0".into());
    }

    let reader = select_reader(config.reader_mode()?, config.proc_root());
    let reader_name = reader.name();
    let collector = Collector::new(reader, &ResourceKind::ALL, AssemblyMode::BestEffort);

    let start = Instant::now();
    let sample = SamplingStrategy::OneShot { pause }.sample(&collector, None)?;
    let missing: Vec<String> = ResourceKind::ALL
        .iter()
        .filter(|k| !sample.snapshot.has(**k))
        .map(|k| k.to_string())
        .collect();

    let report = SnapshotReport::from_sample(reader_name, sample, config, verbose);
    let rendered = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&report)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&report)?,
        ConfigFormat::Toml => return Err("snapshot output supports json and yaml only".into()),
    };
    println!("{}", rendered);

    if verbose {
        eprintln!(
            "⏱️  Sampled in {:.2}ms (pause {}ms)",
            start.elapsed().as_secs_f64() * 1000.0,
            pause.as_millis()
        );
        if !missing.is_empty() {
            eprintln!("⚠️  Unavailable: {}", missing.join(", "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use procpulse::FixedReader;
    use std::sync::Arc;

    fn fixed_sample() -> Sample {
        let collector = Collector::new(
            Arc::new(FixedReader),
            &ResourceKind::ALL,
            AssemblyMode::AllOrNothing,
        );
        SamplingStrategy::OneShot {
            pause: Duration::from_millis(5),
        }
        .sample(&collector, None)
        .unwrap()
    }

    #[test]
    fn test_report_hides_process_list_unless_verbose() {
        let config = Config::default();
        let report = SnapshotReport::from_sample("fixed", fixed_sample(), &config, false);
        assert!(report.processes.is_none());
        assert_eq!(report.top_memory[0].name, "System");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("processes").is_none());
        assert_eq!(json["reader"], "fixed");

        let verbose = SnapshotReport::from_sample("fixed", fixed_sample(), &config, true);
        assert_eq!(verbose.processes.map(|p| p.len()), Some(3));
    }

    #[test]
    fn test_report_applies_name_filter() {
        let config = Config {
            exclude_names: Some(vec!["System".into()]),
            ..Config::default()
        };
        let report = SnapshotReport::from_sample("fixed", fixed_sample(), &config, true);
        assert!(report.top_memory.iter().all(|p| p.name != "System"));
        assert_eq!(report.processes.map(|p| p.len()), Some(2));
    }
}
