//! Dashboard application state and main loop.

use std::io;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, warn};

use procpulse::delta::{CpuUsage, DiskRate, InterfaceRate, MemoryUsage, ProcessUsage};
use procpulse::{rank_processes, Collector, RankBy, Sample, SamplingStrategy, Snapshot};

use super::event::{is_quit, Event, EventHandler};
use super::render::Renderer;
use super::theme::Theme;

/// Rows shown in each of the disk and network panels.
pub const PANEL_ROWS: usize = 3;
/// Processes shown in the table.
pub const TOP_PROCESSES: usize = 10;

/// Everything one frame shows, derived from one sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub elapsed_secs: f64,
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub disks: Vec<DiskRate>,
    pub network: Vec<InterfaceRate>,
    pub processes: Vec<ProcessUsage>,
    pub process_count: usize,
}

impl DashboardData {
    pub fn from_sample(sample: &Sample) -> Self {
        let usage = &sample.usage;
        let procs = usage.processes.clone().unwrap_or_default();
        let process_count = procs.len();

        Self {
            elapsed_secs: usage.elapsed_secs,
            cpu: usage.cpu.unwrap_or_default(),
            memory: usage.memory.unwrap_or_default(),
            disks: first(usage.disks.as_deref(), PANEL_ROWS),
            network: first(usage.network.as_deref(), PANEL_ROWS),
            processes: rank_processes(procs, RankBy::Memory, TOP_PROCESSES),
            process_count,
        }
    }
}

fn first<T: Clone>(items: Option<&[T]>, n: usize) -> Vec<T> {
    items
        .unwrap_or_default()
        .iter()
        .take(n)
        .cloned()
        .collect()
}

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Loading,
    Ready(DashboardData),
    /// Shown in place of the data until the next successful tick.
    Failed(String),
}

/// Dashboard application. Owns the previous snapshot between ticks.
pub struct App {
    collector: Collector,
    renderer: Renderer,
    prev: Option<Snapshot>,
    view: View,
    should_quit: bool,
}

impl App {
    pub fn new(collector: Collector, theme: Theme) -> Self {
        Self {
            collector,
            renderer: Renderer::new(theme),
            prev: None,
            view: View::Loading,
            should_quit: false,
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> &View {
        &self.view
    }

    /// One collection against the previous snapshot.
    ///
    /// On failure the previous snapshot is kept, so the next successful tick
    /// covers the whole gap.
    pub fn tick(&mut self) {
        match SamplingStrategy::ExternalInterval.sample(&self.collector, self.prev.as_ref()) {
            Ok(sample) => {
                self.view = View::Ready(DashboardData::from_sample(&sample));
                self.prev = Some(sample.snapshot);
            }
            Err(e) => {
                warn!("Dashboard collection failed: {}", e);
                self.view = View::Failed(e.to_string());
            }
        }
    }

    /// Runs the dashboard until a quit key.
    pub fn run(mut self, tick_rate: Duration) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal, tick_rate);

        // Restore terminal even when the loop failed
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        tick_rate: Duration,
    ) -> io::Result<()> {
        let events = EventHandler::new(tick_rate);

        // Baseline read; every rate is 0 until the second tick.
        self.tick();

        while !self.should_quit {
            terminal.draw(|frame| self.renderer.render(frame, &self.view))?;

            match events.next() {
                Ok(Event::Tick) => self.tick(),
                Ok(Event::Key(key)) => {
                    if is_quit(&key) {
                        debug!("Quit key pressed");
                        self.should_quit = true;
                    }
                }
                Ok(Event::Resize) => {}
                Err(_) => self.should_quit = true,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procpulse::{AssemblyMode, FixedReader, ProcfsReader};
    use std::sync::Arc;

    use crate::tui::DASHBOARD_KINDS;

    #[test]
    fn test_first_tick_is_baseline() {
        let collector = Collector::new(
            Arc::new(FixedReader),
            &DASHBOARD_KINDS,
            AssemblyMode::AllOrNothing,
        );
        let mut app = App::new(collector, Theme::default());
        assert_eq!(app.view(), &View::Loading);

        app.tick();
        let View::Ready(data) = app.view() else {
            panic!("expected data, got {:?}", app.view());
        };
        assert_eq!(data.cpu.total, 0.0);
        assert_eq!(data.process_count, 3);
        assert_eq!(data.processes[0].name, "System");
        assert!(data.processes.iter().all(|p| p.is_new));

        app.tick();
        let View::Ready(data) = app.view() else {
            panic!("expected data");
        };
        assert!(data.processes.iter().all(|p| !p.is_new));
    }

    #[test]
    fn test_failure_replaces_view() {
        let collector = Collector::new(
            Arc::new(ProcfsReader::new("/nonexistent/proc")),
            &DASHBOARD_KINDS,
            AssemblyMode::AllOrNothing,
        );
        let mut app = App::new(collector, Theme::default());
        app.tick();
        assert!(matches!(app.view(), View::Failed(_)));
    }
}
