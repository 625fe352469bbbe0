//! Check command implementation.
//!
//! Probes every kernel source through the configured reader and reports
//! which ones are available on this host.

use std::sync::Arc;

use procpulse::gpu::query_gpus;
use procpulse::{select_reader, AssemblyMode, CollectError, Collector, Reader, ResourceKind};

use crate::config::{validate_effective_config, Config};

/// Outcome of probing one resource kind.
#[derive(Debug)]
pub struct Probe {
    pub kind: ResourceKind,
    pub result: Result<(), CollectError>,
}

/// Collects each kind on its own so one failure does not hide the others.
pub fn probe_sources(reader: &Arc<dyn Reader>) -> Vec<Probe> {
    ResourceKind::ALL
        .iter()
        .map(|&kind| {
            let collector = Collector::new(reader.clone(), &[kind], AssemblyMode::AllOrNothing);
            Probe {
                kind,
                result: collector.collect().map(|_| ()),
            }
        })
        .collect()
}

/// Validates configuration and source availability.
///
/// A missing source is a warning, since pressure or netstat files are absent
/// on some kernels. A source in an unexpected format fails the check.
pub fn command_check(gpu: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 procpulse - System Check");
    println!("===========================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    let reader = select_reader(config.reader_mode()?, config.proc_root());
    println!(
        "\n📁 Probing sources ({} reader, root {})...",
        reader.name(),
        config.proc_root().display()
    );

    for probe in probe_sources(&reader) {
        let label = format!("{:<18} {}", probe.kind.to_string(), probe.kind.source());
        match probe.result {
            Ok(()) => println!("   ✅ {}", label),
            Err(e) if e.is_unavailable() => println!("   ⚠️  {} - {}", label, e),
            Err(e) => {
                println!("   ❌ {} - {}", label, e);
                all_ok = false;
            }
        }
    }

    if gpu {
        println!("\n🎮 Probing GPU tool...");
        match query_gpus() {
            Ok(gpus) if gpus.is_empty() => println!("   ⚠️  nvidia-smi reported no GPUs"),
            Ok(gpus) => {
                for g in gpus {
                    println!("   ✅ GPU {}: {}", g.index, g.name);
                }
            }
            Err(e) => println!("   ⚠️  {}", e),
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the output above");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procpulse::{FixedReader, ProcfsReader};

    #[test]
    fn test_fixed_reader_probes_clean() {
        let reader: Arc<dyn Reader> = Arc::new(FixedReader);
        let probes = probe_sources(&reader);
        assert_eq!(probes.len(), ResourceKind::ALL.len());
        assert!(probes.iter().all(|p| p.result.is_ok()));
    }

    #[test]
    fn test_empty_root_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("loadavg"), "0.10 0.20 0.30 1/100 42\n").unwrap();
        let reader: Arc<dyn Reader> = Arc::new(ProcfsReader::new(dir.path()));

        let probes = probe_sources(&reader);
        let load = probes
            .iter()
            .find(|p| p.kind == ResourceKind::LoadAverage)
            .unwrap();
        assert!(load.result.is_ok());

        let mem = probes
            .iter()
            .find(|p| p.kind == ResourceKind::Memory)
            .unwrap();
        assert!(mem.result.as_ref().unwrap_err().is_unavailable());
    }
}
