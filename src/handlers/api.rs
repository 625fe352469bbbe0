//! `/api/*` JSON handlers.
//!
//! Response keys and human formatting (`"12.34%"`, `"1.5 GB"`) are part of the
//! public surface and stay stable. Single-kind routes assemble best-effort over
//! that one kind, so a failing source surfaces as 503 or 500 with
//! `{"error": "..."}`.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{debug, instrument};

use procpulse::collectors::pressure::PressureStats;
use procpulse::delta::{compute_memory_usage, ProcessUsage};
use procpulse::format::{format_bytes, format_duration, format_fixed2, format_percent};
use procpulse::gpu::{query_gpus, GpuStats};
use procpulse::{
    rank_processes, AssemblyMode, Collector, RankBy, ResourceKind, Sample, SamplingStrategy,
};

use super::{run_blocking, sample, ApiError};
use crate::state::SharedState;

const STEAL_DESCRIPTION: &str =
    "Steal time indicates CPU cycles taken by hypervisor. IOWait indicates CPU waiting for disk I/O.";

fn one_shot(state: &SharedState) -> SamplingStrategy {
    SamplingStrategy::OneShot {
        pause: state.config.sample_pause(),
    }
}

/// Single read of one kind, no interval.
async fn read_one(state: &SharedState, kind: ResourceKind) -> Result<Sample, ApiError> {
    sample(state, &[kind], SamplingStrategy::ExternalInterval).await
}

/// Unwraps a record the assembler reported as collected.
fn present<T>(value: Option<T>, kind: ResourceKind) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Internal(format!("no {} record collected", kind)))
}

fn filtered_processes(state: &SharedState, sample: &mut Sample) -> Result<Vec<ProcessUsage>, ApiError> {
    let usages = present(sample.usage.processes.take(), ResourceKind::Process)?;
    Ok(state.config.process_filter().apply(usages))
}

// ---------------------------------------------------------------------------
// CPU

#[derive(Debug, Serialize)]
pub struct CpuResponse {
    pub total_usage: String,
    pub user_usage: String,
    pub system_usage: String,
    pub idle_usage: String,
}

#[instrument(skip(state))]
pub async fn cpu_handler(State(state): State<SharedState>) -> Result<Json<CpuResponse>, ApiError> {
    let sample = sample(&state, &[ResourceKind::Cpu], one_shot(&state)).await?;
    let cpu = present(sample.usage.cpu, ResourceKind::Cpu)?;
    Ok(Json(CpuResponse {
        total_usage: format_percent(cpu.total),
        user_usage: format_percent(cpu.user),
        system_usage: format_percent(cpu.system),
        idle_usage: format_percent(cpu.idle),
    }))
}

#[derive(Debug, Serialize)]
pub struct StealResponse {
    pub steal_percent: String,
    pub iowait_percent: String,
    pub description: &'static str,
}

#[instrument(skip(state))]
pub async fn steal_handler(
    State(state): State<SharedState>,
) -> Result<Json<StealResponse>, ApiError> {
    let sample = sample(&state, &[ResourceKind::Cpu], one_shot(&state)).await?;
    let cpu = present(sample.usage.cpu, ResourceKind::Cpu)?;
    Ok(Json(StealResponse {
        steal_percent: format_percent(cpu.steal),
        iowait_percent: format_percent(cpu.iowait),
        description: STEAL_DESCRIPTION,
    }))
}

// ---------------------------------------------------------------------------
// Memory, disks, network

#[derive(Debug, Serialize)]
pub struct MemoryResponse {
    pub total_memory: String,
    pub used_memory: String,
    pub free_memory: String,
    pub percent_used: String,
    pub swap_total: String,
    pub swap_used: String,
}

#[instrument(skip(state))]
pub async fn memory_handler(
    State(state): State<SharedState>,
) -> Result<Json<MemoryResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::Memory).await?;
    let mem = present(sample.usage.memory, ResourceKind::Memory)?;
    Ok(Json(MemoryResponse {
        total_memory: format_bytes(mem.total),
        used_memory: format_bytes(mem.used),
        free_memory: format_bytes(mem.free),
        percent_used: format_percent(mem.usage_percent),
        swap_total: format_bytes(mem.swap_total),
        swap_used: format_bytes(mem.swap_used),
    }))
}

#[derive(Debug, Serialize)]
pub struct DiskEntry {
    pub name: String,
    pub reads: u64,
    pub writes: u64,
}

#[instrument(skip(state))]
pub async fn disk_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<DiskEntry>>, ApiError> {
    let sample = read_one(&state, ResourceKind::Disk).await?;
    let disks = present(sample.snapshot.disks, ResourceKind::Disk)?;
    Ok(Json(
        disks
            .into_iter()
            .map(|d| DiskEntry {
                name: d.name,
                reads: d.reads_completed,
                writes: d.writes_completed,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct NetworkEntry {
    pub interface: String,
    pub received: String,
    pub sent: String,
    pub rx_packets: u64,
    pub tx_packets: u64,
}

#[instrument(skip(state))]
pub async fn network_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<NetworkEntry>>, ApiError> {
    let sample = read_one(&state, ResourceKind::Network).await?;
    let ifaces = present(sample.snapshot.network, ResourceKind::Network)?;
    Ok(Json(
        ifaces
            .into_iter()
            .map(|n| NetworkEntry {
                interface: n.name,
                received: format_bytes(n.rx_bytes),
                sent: format_bytes(n.tx_bytes),
                rx_packets: n.rx_packets,
                tx_packets: n.tx_packets,
            })
            .collect(),
    ))
}

// ---------------------------------------------------------------------------
// Processes

#[derive(Debug, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub memory_usage: String,
    pub command: String,
}

#[instrument(skip(state))]
pub async fn process_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ProcessEntry>>, ApiError> {
    let mut sample = read_one(&state, ResourceKind::Process).await?;
    let procs = filtered_processes(&state, &mut sample)?;
    Ok(Json(
        procs
            .into_iter()
            .map(|p| ProcessEntry {
                pid: p.pid,
                name: p.name,
                memory_usage: format_bytes(p.rss),
                command: p.cmdline,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct TopCpuEntry {
    pub pid: u32,
    pub name: String,
    pub cpu_time: String,
    pub cpu_percent: String,
    pub memory: String,
    pub command: String,
}

/// Ranks by CPU share over one sample pause. Processes that started during
/// the pause are left out.
#[instrument(skip(state))]
pub async fn top_cpu_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TopCpuEntry>>, ApiError> {
    let mut sample = sample(
        &state,
        &[ResourceKind::Cpu, ResourceKind::Process],
        one_shot(&state),
    )
    .await?;
    let procs = filtered_processes(&state, &mut sample)?;
    let ranked = rank_processes(procs, RankBy::Cpu, state.config.top_n());
    Ok(Json(
        ranked
            .into_iter()
            .map(|p| TopCpuEntry {
                pid: p.pid,
                cpu_time: format!("{} ticks", p.cpu_ticks),
                cpu_percent: format_percent(p.cpu_percent),
                memory: format_bytes(p.rss),
                name: p.name,
                command: p.cmdline,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct TopRamEntry {
    pub pid: u32,
    pub name: String,
    pub memory: String,
    pub command: String,
}

#[instrument(skip(state))]
pub async fn top_ram_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TopRamEntry>>, ApiError> {
    let mut sample = read_one(&state, ResourceKind::Process).await?;
    let procs = filtered_processes(&state, &mut sample)?;
    let ranked = rank_processes(procs, RankBy::Memory, state.config.top_n());
    Ok(Json(
        ranked
            .into_iter()
            .map(|p| TopRamEntry {
                pid: p.pid,
                name: p.name,
                memory: format_bytes(p.rss),
                command: p.cmdline,
            })
            .collect(),
    ))
}

// ---------------------------------------------------------------------------
// System

#[derive(Debug, Serialize)]
pub struct LoadAvgResponse {
    pub load_1m: String,
    pub load_5m: String,
    pub load_15m: String,
}

#[instrument(skip(state))]
pub async fn loadavg_handler(
    State(state): State<SharedState>,
) -> Result<Json<LoadAvgResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::LoadAverage).await?;
    let load = present(sample.snapshot.load_average, ResourceKind::LoadAverage)?;
    Ok(Json(LoadAvgResponse {
        load_1m: format_fixed2(load.one_min),
        load_5m: format_fixed2(load.five_min),
        load_15m: format_fixed2(load.fifteen_min),
    }))
}

#[derive(Debug, Serialize)]
pub struct UptimeResponse {
    pub uptime_seconds: f64,
    pub uptime_formatted: String,
    pub idle_seconds: f64,
}

#[instrument(skip(state))]
pub async fn uptime_handler(
    State(state): State<SharedState>,
) -> Result<Json<UptimeResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::Uptime).await?;
    let up = present(sample.snapshot.uptime, ResourceKind::Uptime)?;
    Ok(Json(UptimeResponse {
        uptime_seconds: up.uptime_secs,
        uptime_formatted: format_duration(up.uptime_secs),
        idle_seconds: up.idle_secs,
    }))
}

#[derive(Debug, Serialize)]
pub struct TcpSockets {
    pub inuse: u64,
    pub orphan: u64,
    pub timewait: u64,
    pub allocated: u64,
    pub mem_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct UdpSockets {
    pub inuse: u64,
    pub mem_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct SockStatResponse {
    pub sockets_used: u64,
    pub tcp: TcpSockets,
    pub udp: UdpSockets,
    pub raw_inuse: u64,
    pub frag_inuse: u64,
    pub frag_mem: u64,
}

#[instrument(skip(state))]
pub async fn sockstat_handler(
    State(state): State<SharedState>,
) -> Result<Json<SockStatResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::Sockets).await?;
    let s = present(sample.snapshot.sockets, ResourceKind::Sockets)?;
    Ok(Json(SockStatResponse {
        sockets_used: s.sockets_used,
        tcp: TcpSockets {
            inuse: s.tcp_inuse,
            orphan: s.tcp_orphan,
            timewait: s.tcp_tw,
            allocated: s.tcp_alloc,
            mem_pages: s.tcp_mem,
        },
        udp: UdpSockets {
            inuse: s.udp_inuse,
            mem_pages: s.udp_mem,
        },
        raw_inuse: s.raw_inuse,
        frag_inuse: s.frag_inuse,
        frag_mem: s.frag_mem,
    }))
}

#[derive(Debug, Serialize)]
pub struct FileNrResponse {
    pub allocated: u64,
    pub free: u64,
    pub max: u64,
    pub used_percent: String,
}

#[instrument(skip(state))]
pub async fn filenr_handler(
    State(state): State<SharedState>,
) -> Result<Json<FileNrResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::FileDescriptors).await?;
    let f = present(sample.snapshot.file_nr, ResourceKind::FileDescriptors)?;
    Ok(Json(FileNrResponse {
        allocated: f.allocated,
        free: f.free,
        max: f.max,
        used_percent: format_percent(f.used_percent()),
    }))
}

#[derive(Debug, Serialize)]
pub struct PressureWindow {
    pub avg10: String,
    pub avg60: String,
    pub avg300: String,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct PressureEntry {
    pub some: PressureWindow,
    pub full: PressureWindow,
}

impl From<&PressureStats> for PressureEntry {
    fn from(p: &PressureStats) -> Self {
        Self {
            some: PressureWindow {
                avg10: format_percent(p.some_avg10),
                avg60: format_percent(p.some_avg60),
                avg300: format_percent(p.some_avg300),
                total: p.some_total,
            },
            full: PressureWindow {
                avg10: format_percent(p.full_avg10),
                avg60: format_percent(p.full_avg60),
                avg300: format_percent(p.full_avg300),
                total: p.full_total,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PressureResponse {
    pub cpu: PressureEntry,
    pub memory: PressureEntry,
    pub io: PressureEntry,
}

#[instrument(skip(state))]
pub async fn pressure_handler(
    State(state): State<SharedState>,
) -> Result<Json<PressureResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::Pressure).await?;
    let p = present(sample.snapshot.pressure, ResourceKind::Pressure)?;
    Ok(Json(PressureResponse {
        cpu: (&p.cpu).into(),
        memory: (&p.memory).into(),
        io: (&p.io).into(),
    }))
}

#[derive(Debug, Serialize)]
pub struct InOut {
    #[serde(rename = "in")]
    pub input: u64,
    pub out: u64,
}

#[derive(Debug, Serialize)]
pub struct PageFaults {
    pub minor: u64,
    pub major: u64,
}

#[derive(Debug, Serialize)]
pub struct NumaCounters {
    pub hit: u64,
    pub miss: u64,
}

#[derive(Debug, Serialize)]
pub struct VmStatResponse {
    pub page_faults: PageFaults,
    pub paging: InOut,
    pub swap: InOut,
    pub oom_kill: u64,
    pub numa: NumaCounters,
}

#[instrument(skip(state))]
pub async fn vmstat_handler(
    State(state): State<SharedState>,
) -> Result<Json<VmStatResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::VmStat).await?;
    let v = present(sample.snapshot.vmstat, ResourceKind::VmStat)?;
    Ok(Json(VmStatResponse {
        page_faults: PageFaults {
            minor: v.pgfault,
            major: v.pgmajfault,
        },
        paging: InOut {
            input: v.pgpgin,
            out: v.pgpgout,
        },
        swap: InOut {
            input: v.pswpin,
            out: v.pswpout,
        },
        oom_kill: v.oom_kill,
        numa: NumaCounters {
            hit: v.numa_hit,
            miss: v.numa_miss,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct IpCounters {
    pub in_receives: u64,
    pub out_requests: u64,
    pub in_discards: u64,
    pub out_discards: u64,
}

#[derive(Debug, Serialize)]
pub struct TcpCounters {
    pub active_opens: u64,
    pub passive_opens: u64,
    pub curr_estab: u64,
    pub in_segs: u64,
    pub out_segs: u64,
    pub retrans_segs: u64,
    pub in_errs: u64,
    pub out_rsts: u64,
}

#[derive(Debug, Serialize)]
pub struct UdpCounters {
    pub in_datagrams: u64,
    pub out_datagrams: u64,
    pub in_errors: u64,
    pub no_ports: u64,
}

#[derive(Debug, Serialize)]
pub struct SnmpResponse {
    pub ip: IpCounters,
    pub tcp: TcpCounters,
    pub udp: UdpCounters,
}

#[instrument(skip(state))]
pub async fn snmp_handler(State(state): State<SharedState>) -> Result<Json<SnmpResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::Snmp).await?;
    let s = present(sample.snapshot.snmp, ResourceKind::Snmp)?;
    Ok(Json(SnmpResponse {
        ip: IpCounters {
            in_receives: s.ip_in_receives,
            out_requests: s.ip_out_requests,
            in_discards: s.ip_in_discards,
            out_discards: s.ip_out_discards,
        },
        tcp: TcpCounters {
            active_opens: s.tcp_active_opens,
            passive_opens: s.tcp_passive_opens,
            curr_estab: s.tcp_curr_estab,
            in_segs: s.tcp_in_segs,
            out_segs: s.tcp_out_segs,
            retrans_segs: s.tcp_retrans_segs,
            in_errs: s.tcp_in_errs,
            out_rsts: s.tcp_out_rsts,
        },
        udp: UdpCounters {
            in_datagrams: s.udp_in_datagrams,
            out_datagrams: s.udp_out_datagrams,
            in_errors: s.udp_in_errors,
            no_ports: s.udp_no_ports,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct TcpExtCounters {
    pub syncookies_sent: u64,
    pub syncookies_recv: u64,
    pub syncookies_failed: u64,
    pub listen_overflows: u64,
    pub listen_drops: u64,
    pub timeouts: u64,
}

#[derive(Debug, Serialize)]
pub struct IpExtCounters {
    pub in_octets: u64,
    pub out_octets: u64,
}

#[derive(Debug, Serialize)]
pub struct NetstatResponse {
    pub tcp_ext: TcpExtCounters,
    pub ip_ext: IpExtCounters,
}

#[instrument(skip(state))]
pub async fn netstat_handler(
    State(state): State<SharedState>,
) -> Result<Json<NetstatResponse>, ApiError> {
    let sample = read_one(&state, ResourceKind::Netstat).await?;
    let n = present(sample.snapshot.netstat, ResourceKind::Netstat)?;
    Ok(Json(NetstatResponse {
        tcp_ext: TcpExtCounters {
            syncookies_sent: n.tcp_syncookies_sent,
            syncookies_recv: n.tcp_syncookies_recv,
            syncookies_failed: n.tcp_syncookies_failed,
            listen_overflows: n.tcp_listen_overflows,
            listen_drops: n.tcp_listen_drops,
            timeouts: n.tcp_timeouts,
        },
        ip_ext: IpExtCounters {
            in_octets: n.ip_in_octets,
            out_octets: n.ip_out_octets,
        },
    }))
}

// ---------------------------------------------------------------------------
// GPU

/// 503 with the tool's error when `nvidia-smi` is missing or fails.
#[instrument(skip(state))]
pub async fn gpu_handler(State(state): State<SharedState>) -> Result<Json<Vec<GpuStats>>, ApiError> {
    let gpus = run_blocking(&state, query_gpus).await?;
    Ok(Json(gpus))
}

// ---------------------------------------------------------------------------
// Summary

#[derive(Debug, Serialize)]
pub struct CpuSummary {
    pub usage: String,
    pub user: String,
    pub sys: String,
    pub idle: String,
}

#[derive(Debug, Serialize)]
pub struct MemorySummary {
    pub total: String,
    pub used: String,
    pub free: String,
    pub usage: String,
    pub swap_total: String,
    pub swap_used: String,
}

#[derive(Debug, Serialize)]
pub struct LoadSummary {
    #[serde(rename = "1m")]
    pub one: String,
    #[serde(rename = "5m")]
    pub five: String,
    #[serde(rename = "15m")]
    pub fifteen: String,
}

#[derive(Debug, Serialize)]
pub struct UptimeSummary {
    pub seconds: f64,
    pub formatted: String,
}

#[derive(Debug, Serialize)]
pub struct StealSummary {
    pub steal_percent: String,
    pub iowait_percent: String,
}

#[derive(Debug, Serialize)]
pub struct SocketSummary {
    pub used: u64,
    pub tcp_inuse: u64,
    pub tcp_tw: u64,
    pub udp_inuse: u64,
}

#[derive(Debug, Serialize)]
pub struct FileDescriptorSummary {
    pub allocated: u64,
    pub max: u64,
    pub used_percent: String,
}

#[derive(Debug, Serialize)]
pub struct PressureSummary {
    pub cpu_some_avg10: String,
    pub memory_some_avg10: String,
    pub io_some_avg10: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessSummary {
    pub pid: u32,
    pub name: String,
    pub memory: String,
}

#[derive(Debug, Serialize)]
pub struct NetworkSummary {
    pub interface: String,
    pub received: String,
    pub sent: String,
}

/// `/api/all`. Sections whose source failed are `null`.
#[derive(Debug, Serialize)]
pub struct AllResponse {
    pub cpu: Option<CpuSummary>,
    pub memory: Option<MemorySummary>,
    pub load_avg: Option<LoadSummary>,
    pub uptime: Option<UptimeSummary>,
    pub steal_iowait: Option<StealSummary>,
    pub sockets: Option<SocketSummary>,
    pub file_descriptors: Option<FileDescriptorSummary>,
    pub pressure: Option<PressureSummary>,
    pub top_cpu: Option<Vec<ProcessSummary>>,
    pub top_ram: Option<Vec<ProcessSummary>>,
    pub disks: Option<Vec<DiskEntry>>,
    pub network: Option<Vec<NetworkSummary>>,
    pub gpu: Option<Vec<GpuStats>>,
}

fn process_summary(p: &ProcessUsage) -> ProcessSummary {
    ProcessSummary {
        pid: p.pid,
        name: p.name.clone(),
        memory: format_bytes(p.rss),
    }
}

fn build_all(state: &SharedState, sample: Sample, gpu: Option<Vec<GpuStats>>) -> AllResponse {
    let Sample { snapshot, usage } = sample;
    let top_n = state.config.top_n();
    let procs = usage
        .processes
        .map(|p| state.config.process_filter().apply(p));

    AllResponse {
        cpu: usage.cpu.map(|c| CpuSummary {
            usage: format_percent(c.total),
            user: format_percent(c.user),
            sys: format_percent(c.system),
            idle: format_percent(c.idle),
        }),
        memory: snapshot.memory.as_ref().map(|m| {
            let mem = compute_memory_usage(m);
            MemorySummary {
                total: format_bytes(mem.total),
                used: format_bytes(mem.used),
                free: format_bytes(mem.free),
                usage: format_percent(mem.usage_percent),
                swap_total: format_bytes(mem.swap_total),
                swap_used: format_bytes(mem.swap_used),
            }
        }),
        load_avg: snapshot.load_average.map(|l| LoadSummary {
            one: format_fixed2(l.one_min),
            five: format_fixed2(l.five_min),
            fifteen: format_fixed2(l.fifteen_min),
        }),
        uptime: snapshot.uptime.map(|u| UptimeSummary {
            seconds: u.uptime_secs,
            formatted: format_duration(u.uptime_secs),
        }),
        steal_iowait: usage.cpu.map(|c| StealSummary {
            steal_percent: format_percent(c.steal),
            iowait_percent: format_percent(c.iowait),
        }),
        sockets: snapshot.sockets.map(|s| SocketSummary {
            used: s.sockets_used,
            tcp_inuse: s.tcp_inuse,
            tcp_tw: s.tcp_tw,
            udp_inuse: s.udp_inuse,
        }),
        file_descriptors: snapshot.file_nr.map(|f| FileDescriptorSummary {
            allocated: f.allocated,
            max: f.max,
            used_percent: format_percent(f.used_percent()),
        }),
        pressure: snapshot.pressure.map(|p| PressureSummary {
            cpu_some_avg10: format_percent(p.cpu.some_avg10),
            memory_some_avg10: format_percent(p.memory.some_avg10),
            io_some_avg10: format_percent(p.io.some_avg10),
        }),
        top_cpu: procs.as_ref().map(|p| {
            rank_processes(p.clone(), RankBy::Cpu, top_n)
                .iter()
                .map(process_summary)
                .collect()
        }),
        top_ram: procs.map(|p| {
            rank_processes(p, RankBy::Memory, top_n)
                .iter()
                .map(process_summary)
                .collect()
        }),
        disks: snapshot.disks.map(|d| {
            d.into_iter()
                .map(|d| DiskEntry {
                    name: d.name,
                    reads: d.reads_completed,
                    writes: d.writes_completed,
                })
                .collect()
        }),
        network: snapshot.network.map(|n| {
            n.into_iter()
                .map(|n| NetworkSummary {
                    interface: n.name,
                    received: format_bytes(n.rx_bytes),
                    sent: format_bytes(n.tx_bytes),
                })
                .collect()
        }),
        gpu,
    }
}

/// One one-shot sample over every kind, plus GPUs when enabled.
#[instrument(skip(state))]
pub async fn all_handler(State(state): State<SharedState>) -> Result<Json<AllResponse>, ApiError> {
    let collector = Collector::new(
        state.reader.clone(),
        &ResourceKind::ALL,
        AssemblyMode::BestEffort,
    );
    let strategy = one_shot(&state);
    let gpu_enabled = state.config.gpu_enabled();

    let (sample, gpu) = run_blocking(&state, move || {
        let sample = strategy.sample(&collector, None)?;
        let gpu = if gpu_enabled {
            query_gpus()
                .map_err(|e| debug!("GPU query skipped: {}", e))
                .ok()
        } else {
            None
        };
        Ok((sample, gpu))
    })
    .await?;

    if let Some(procs) = &sample.snapshot.processes {
        state.health_stats.record_processes_seen(procs.len());
    }
    Ok(Json(build_all(&state, sample, gpu)))
}
