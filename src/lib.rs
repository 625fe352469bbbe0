//! procpulse: Linux resource counters as rates and percentages
//!
//! This library reads kernel text sources (CPU, memory, disk, network,
//! processes, sockets, file descriptors, pressure, vmstat, SNMP, netstat, load
//! average, uptime), assembles them into immutable snapshots, and derives
//! usage figures from pairs of snapshots. It keeps no state between calls:
//! the caller holds the previous snapshot.
//!
//! # Features
//!
//! - **Readers**: one parser per kernel source behind the [`Reader`] trait,
//!   with a fixed-value stand-in for hosts without procfs
//! - **Snapshot assembly**: all-or-nothing or best-effort partial failure
//! - **Delta engine**: CPU breakdown, per-process CPU share, interface and
//!   disk throughput, with zero guards and counter-reset clamping
//! - **Ranking**: stable top-N by any derived metric
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use procpulse::{AssemblyMode, Collector, FixedReader, ResourceKind, SamplingStrategy};
//!
//! let collector = Collector::new(
//!     Arc::new(FixedReader),
//!     &[ResourceKind::Cpu, ResourceKind::Memory],
//!     AssemblyMode::AllOrNothing,
//! );
//!
//! // The caller owns the previous snapshot between cycles.
//! let first = SamplingStrategy::ExternalInterval.sample(&collector, None).unwrap();
//! let second = SamplingStrategy::ExternalInterval
//!     .sample(&collector, Some(&first.snapshot))
//!     .unwrap();
//!
//! let cpu = second.usage.cpu.unwrap();
//! println!("CPU busy: {:.2}%", cpu.total);
//!
//! // Or let the engine own both reads and the pause.
//! let one_shot = SamplingStrategy::OneShot { pause: Duration::from_millis(10) };
//! let sample = one_shot.sample(&collector, None).unwrap();
//! assert!(sample.usage.memory.is_some());
//! ```

pub mod collectors;
pub mod delta;
pub mod error;
pub mod format;
pub mod gpu;
pub mod ranking;
pub mod reader;
pub mod snapshot;
pub mod system;

// Re-export main types for convenience
pub use delta::{compute_usage, Sample, SamplingStrategy, UsageReport};
pub use error::CollectError;
pub use ranking::{rank_processes, top_n, ProcessFilter, RankBy};
pub use reader::{select_reader, FixedReader, ProcfsReader, Reader, ReaderMode};
pub use snapshot::{AssemblyMode, Collector, ResourceKind, Snapshot};
