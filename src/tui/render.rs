//! Dashboard rendering.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use procpulse::format::{format_bytes, format_percent, format_rate};

use super::app::{DashboardData, View};
use super::theme::Theme;

/// Draws frames with a theme fixed at construction.
pub struct Renderer {
    theme: Theme,
}

impl Renderer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn render(&self, frame: &mut Frame, view: &View) {
        let area = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        frame.render_widget(
            Paragraph::new(" procpulse ").style(self.theme.header()),
            rows[0],
        );

        match view {
            View::Loading => frame.render_widget(
                Paragraph::new("Collecting...").style(self.theme.dim()),
                rows[1],
            ),
            View::Failed(message) => frame.render_widget(
                Paragraph::new(format!("Collection failed: {}", message))
                    .style(self.theme.error())
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title("Error")),
                rows[1],
            ),
            View::Ready(data) => self.render_data(frame, rows[1], data),
        }

        frame.render_widget(
            Paragraph::new(" q/Esc/Ctrl+C quit").style(self.theme.dim()),
            rows[2],
        );
    }

    fn render_data(&self, frame: &mut Frame, area: Rect, data: &DashboardData) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2 + super::app::PANEL_ROWS as u16 + 1),
                Constraint::Min(4),
            ])
            .split(area);

        let cpu = data.cpu.total;
        frame.render_widget(
            self.gauge(
                "CPU",
                cpu,
                self.theme.cpu,
                format!(
                    "{} (user {} sys {} iowait {})",
                    format_percent(cpu),
                    format_percent(data.cpu.user),
                    format_percent(data.cpu.system),
                    format_percent(data.cpu.iowait)
                ),
            ),
            rows[0],
        );

        let mem = &data.memory;
        frame.render_widget(
            self.gauge(
                "Memory",
                mem.usage_percent,
                self.theme.memory,
                format!(
                    "{} of {} ({})",
                    format_bytes(mem.total.saturating_sub(mem.free)),
                    format_bytes(mem.total),
                    format_percent(mem.usage_percent)
                ),
            ),
            rows[1],
        );

        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        self.render_disks(frame, panels[0], data);
        self.render_network(frame, panels[1], data);
        self.render_processes(frame, rows[3], data);
    }

    fn gauge<'a>(&self, title: &'a str, percent: f64, base: ratatui::style::Color, label: String) -> Gauge<'a> {
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .gauge_style(self.theme.gauge(base, percent))
            .ratio((percent / 100.0).clamp(0.0, 1.0))
            .label(label)
    }

    fn panel<'a>(&self, title: &'a str, color: ratatui::style::Color) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(title, Style::default().fg(color)))
    }

    fn render_disks(&self, frame: &mut Frame, area: Rect, data: &DashboardData) {
        let rows = data.disks.iter().map(|d| {
            Row::new(vec![
                d.name.clone(),
                format!("R {}", format_rate(d.read_bytes_per_sec)),
                format!("W {}", format_rate(d.write_bytes_per_sec)),
            ])
        });
        let table = Table::new(
            rows,
            [Constraint::Length(10), Constraint::Min(12), Constraint::Min(12)],
        )
        .style(self.theme.text())
        .block(self.panel("Disks", self.theme.disk));
        frame.render_widget(table, area);
    }

    fn render_network(&self, frame: &mut Frame, area: Rect, data: &DashboardData) {
        let rows = data.network.iter().map(|n| {
            Row::new(vec![
                n.name.clone(),
                format!("RX {}", format_rate(n.rx_bytes_per_sec)),
                format!("TX {}", format_rate(n.tx_bytes_per_sec)),
            ])
        });
        let table = Table::new(
            rows,
            [Constraint::Length(10), Constraint::Min(12), Constraint::Min(12)],
        )
        .style(self.theme.text())
        .block(self.panel("Network", self.theme.network));
        frame.render_widget(table, area);
    }

    fn render_processes(&self, frame: &mut Frame, area: Rect, data: &DashboardData) {
        let header = Row::new(vec!["PID", "NAME", "RSS", "CPU%", "COMMAND"]).style(self.theme.header());
        let rows = data.processes.iter().map(|p| {
            let cpu = if p.is_new {
                "-".to_string()
            } else {
                format_percent(p.cpu_percent)
            };
            Row::new(vec![
                p.pid.to_string(),
                p.name.clone(),
                format_bytes(p.rss),
                cpu,
                p.cmdline.clone(),
            ])
        });
        let title = Line::from(format!(
            "Top processes by memory ({} total)",
            data.process_count
        ));
        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(16),
                Constraint::Length(10),
                Constraint::Length(8),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .style(self.theme.text())
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(table, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn draw(view: &View) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let renderer = Renderer::new(Theme::default());
        terminal.draw(|f| renderer.render(f, view)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_error_view_shows_message() {
        let screen = draw(&View::Failed("stat unavailable".into()));
        assert!(screen.contains("Collection failed: stat unavailable"));
    }

    #[test]
    fn test_data_view_shows_panels() {
        let screen = draw(&View::Ready(DashboardData::default()));
        assert!(screen.contains("CPU"));
        assert!(screen.contains("Memory"));
        assert!(screen.contains("Disks"));
        assert!(screen.contains("Network"));
    }
}
