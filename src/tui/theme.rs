//! Dashboard colors.

use ratatui::style::{Color, Modifier, Style};

/// Usage above this percentage is drawn in the critical color.
pub const CRITICAL_PERCENT: f64 = 80.0;

/// Color palette handed to the renderer once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub fg: Color,
    pub fg_dim: Color,
    pub header_fg: Color,
    pub header_bg: Color,
    pub cpu: Color,
    pub memory: Color,
    pub disk: Color,
    pub network: Color,
    pub critical: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::White,
            fg_dim: Color::DarkGray,
            header_fg: Color::White,
            header_bg: Color::Blue,
            cpu: Color::Cyan,
            memory: Color::Magenta,
            disk: Color::Yellow,
            network: Color::Green,
            critical: Color::Red,
            error: Color::LightRed,
        }
    }
}

impl Theme {
    /// Gauge color for `percent`, switching to critical above the threshold.
    pub fn gauge(&self, base: Color, percent: f64) -> Style {
        let color = if percent > CRITICAL_PERCENT {
            self.critical
        } else {
            base
        };
        Style::default().fg(color)
    }

    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.header_fg)
            .bg(self.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }
}
