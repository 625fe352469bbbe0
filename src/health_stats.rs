//! Health statistics for the server itself.
//!
//! Tracks HTTP request counts, collection outcomes and collection timing.
//! Everything is lock-free or behind short-lived mutexes so handlers can
//! record from any task.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

/// (last, avg, max, min, count)
pub type StatSnapshot = (f64, f64, f64, f64, u64);

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn snapshot(&self) -> StatSnapshot {
        match self.inner.lock() {
            Ok(s) => (s.last, s.avg(), s.max, s.min, s.count),
            Err(_) => (0.0, 0.0, 0.0, 0.0, 0),
        }
    }
}

/// Request timestamps of the last ten minutes.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

const REQUEST_WINDOW: Duration = Duration::from_secs(600);

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            while guard
                .front()
                .is_some_and(|&t| now.duration_since(t) > REQUEST_WINDOW)
            {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        match self.inner.lock() {
            Ok(guard) => guard
                .iter()
                .filter(|t| t.elapsed() <= Duration::from_secs(60))
                .count() as u64,
            Err(_) => 0,
        }
    }
}

/// Server health counters shown on `/health`.
pub struct HealthStats {
    pub http_requests_total: AtomicU64,
    pub http_request_timestamps: RequestTimestamps,
    pub request_duration_ms: Stat,

    pub collection_success_count: AtomicU64,
    pub collection_failure_count: AtomicU64,
    pub collection_timeouts: AtomicU64,
    pub collection_duration_ms: Stat,
    pub processes_seen: Stat,

    pub start_time: Instant,
    pub last_collection: StdRwLock<Option<DateTime<Utc>>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            request_duration_ms: Stat::default(),
            collection_success_count: AtomicU64::new(0),
            collection_failure_count: AtomicU64::new(0),
            collection_timeouts: AtomicU64::new(0),
            collection_duration_ms: Stat::default(),
            processes_seen: Stat::default(),
            start_time: Instant::now(),
            last_collection: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_http_request(&self) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_timestamps.record();
    }

    pub fn record_request_duration(&self, duration_ms: f64) {
        self.request_duration_ms.add_sample(duration_ms);
    }

    pub fn record_collection_success(&self, duration: Duration) {
        self.collection_success_count.fetch_add(1, Ordering::Relaxed);
        self.collection_duration_ms
            .add_sample(duration.as_secs_f64() * 1000.0);
        if let Ok(mut guard) = self.last_collection.write() {
            *guard = Some(Utc::now());
        }
    }

    pub fn record_collection_failure(&self) {
        self.collection_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_collection_timeout(&self) {
        self.collection_timeouts.fetch_add(1, Ordering::Relaxed);
        self.record_collection_failure();
    }

    pub fn record_processes_seen(&self, count: usize) {
        self.processes_seen.add_sample(count as f64);
    }

    pub fn get_collection_success_rate(&self) -> f64 {
        let success = self.collection_success_count.load(Ordering::Relaxed);
        let failure = self.collection_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_collection_str(&self) -> String {
        match self.last_collection.read() {
            Ok(guard) => guard
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            Err(_) => "N/A".to_string(),
        }
    }

    pub fn render_table(&self) -> String {
        let mut table = Table::default();

        table.header("SERVER HEALTH");
        table.columns();

        table.section("HTTP SERVER");
        table.counter(
            "http_requests_total",
            self.http_requests_total.load(Ordering::Relaxed),
        );
        table.counter(
            "http_requests_last_minute",
            self.http_request_timestamps.count_last_minute(),
        );
        table.stat("request_duration (ms)", self.request_duration_ms.snapshot(), 1);

        table.section("COLLECTION");
        table.counter(
            "collection_success",
            self.collection_success_count.load(Ordering::Relaxed),
        );
        table.counter(
            "collection_failure",
            self.collection_failure_count.load(Ordering::Relaxed),
        );
        table.counter(
            "collection_timeouts",
            self.collection_timeouts.load(Ordering::Relaxed),
        );
        table.percent("collection_success_rate (%)", self.get_collection_success_rate());
        table.stat(
            "collection_duration (ms)",
            self.collection_duration_ms.snapshot(),
            1,
        );
        table.stat("processes_seen", self.processes_seen.snapshot(), 0);

        let mut out = table.finish();
        writeln!(
            out,
            "last collection: {} | uptime: {}",
            self.get_last_collection_str(),
            procpulse::format::format_duration(self.get_uptime_seconds() as f64)
        )
        .ok();
        out
    }
}

const LEFT_COL: usize = 28;
const COL_W: usize = 12;

/// Fixed-width text table used by [`HealthStats::render_table`].
#[derive(Default)]
struct Table {
    out: String,
}

impl Table {
    fn header(&mut self, title: &str) {
        writeln!(self.out, "{}", title).ok();
        writeln!(self.out, "{}", "=".repeat(title.len())).ok();
        writeln!(self.out).ok();
    }

    fn columns(&mut self) {
        self.row("", ["current", "average", "max", "min"].map(String::from));
    }

    fn section(&mut self, name: &str) {
        writeln!(self.out).ok();
        writeln!(self.out, "{}", name).ok();
        writeln!(self.out, "{}", "-".repeat(name.len())).ok();
    }

    fn row(&mut self, label: &str, cells: [String; 4]) {
        writeln!(
            self.out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            label,
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            left = LEFT_COL,
            col = COL_W
        )
        .ok();
    }

    fn counter(&mut self, label: &str, value: u64) {
        self.row(
            label,
            [value.to_string(), "N/A".into(), "N/A".into(), "N/A".into()],
        );
    }

    fn percent(&mut self, label: &str, value: f64) {
        let v = format!("{:.1}", value);
        self.row(label, [v.clone(), v.clone(), v.clone(), v]);
    }

    fn stat(&mut self, label: &str, (cur, avg, max, min, _): StatSnapshot, precision: usize) {
        self.row(
            label,
            [
                format!("{:.*}", precision, cur),
                format!("{:.1}", avg),
                format!("{:.*}", precision, max),
                format!("{:.*}", precision, min),
            ],
        );
    }

    fn finish(mut self) -> String {
        writeln!(self.out).ok();
        self.out
    }
}
