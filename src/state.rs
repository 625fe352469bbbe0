//! Application state shared by the HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use procpulse::Reader;

use crate::config::Config;
use crate::health_stats::HealthStats;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Read-only after startup apart from the atomic health counters. Handlers
/// never keep a previous snapshot here; each request samples on its own.
pub struct AppState {
    pub config: Arc<Config>,
    pub reader: Arc<dyn Reader>,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, reader: Arc<dyn Reader>) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            reader,
            health_stats: Arc::new(HealthStats::new()),
            start_time: Instant::now(),
        })
    }
}
