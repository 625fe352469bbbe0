//! Live terminal dashboard.
//!
//! A tick thread drives one all-or-nothing collection per tick; the
//! [`App`](app::App) keeps the previous snapshot between ticks and feeds it
//! back to the delta engine.

mod app;
mod event;
mod render;
mod theme;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use procpulse::{select_reader, AssemblyMode, Collector, ResourceKind};

use crate::config::Config;

pub use app::App;
pub use theme::Theme;

/// Kinds collected on every tick.
pub const DASHBOARD_KINDS: [ResourceKind; 5] = [
    ResourceKind::Cpu,
    ResourceKind::Memory,
    ResourceKind::Disk,
    ResourceKind::Network,
    ResourceKind::Process,
];

/// Runs the dashboard until the user quits.
pub fn run(config: &Config, tick_ms: Option<u64>) -> anyhow::Result<()> {
    let tick = tick_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.dashboard_tick());
    anyhow::ensure!(!tick.is_zero(), "tick interval must be greater than 0");

    let mode = config
        .reader_mode()
        .map_err(anyhow::Error::msg)
        .context("invalid reader mode")?;
    let reader = select_reader(mode, config.proc_root());
    let collector = Collector::new(Arc::clone(&reader), &DASHBOARD_KINDS, AssemblyMode::AllOrNothing);

    info!("Starting dashboard with {} reader, tick {:?}", reader.name(), tick);
    App::new(collector, Theme::default())
        .run(tick)
        .context("dashboard terminal error")
}
