//! Collectors module for kernel counter sources.
//!
//! Every submodule exposes pure `parse_*` functions over the text of one
//! kernel source so it can be tested without a live /proc. Reading the files
//! is the job of [`crate::reader`].

pub mod cpu;
pub mod diskstats;
pub mod memory;
pub mod netdev;
pub mod pressure;
pub mod process;
pub mod snmp;
pub mod sockstat;
pub mod vmstat;
