//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::Status;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for values inside the norm.
    pub good: Color,
    /// Color for values near a threshold.
    pub warning: Color,
    /// Color for values outside the norm.
    pub bad: Color,
    /// Color for values that could not be classified.
    pub unknown: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            good: Color::Green,
            warning: Color::Yellow,
            bad: Color::Red,
            unknown: Color::Gray,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            good: Color::Green,
            warning: Color::Yellow,
            bad: Color::Red,
            unknown: Color::DarkGray,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Foreground color for a quality status.
    pub fn status_color(&self, status: Status) -> Color {
        match status {
            Status::Good => self.good,
            Status::Warning => self.warning,
            Status::Bad => self.bad,
            Status::Unknown => self.unknown,
        }
    }

    /// Get style for a quality status
    pub fn status_style(&self, status: Status) -> Style {
        let style = Style::default().fg(self.status_color(status));
        match status {
            Status::Bad => style.add_modifier(Modifier::BOLD),
            Status::Unknown => style.add_modifier(Modifier::DIM),
            Status::Good | Status::Warning => style,
        }
    }

    /// Color for a quality score in percent.
    pub fn score_color(&self, score: f64) -> Color {
        if score >= 80.0 {
            self.good
        } else if score >= 60.0 {
            self.warning
        } else {
            self.bad
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_styles() {
        let theme = Theme::dark();
        assert_eq!(theme.status_color(Status::Good), Color::Green);
        assert_eq!(theme.status_color(Status::Bad), Color::Red);
        assert!(theme
            .status_style(Status::Bad)
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn test_score_color() {
        let theme = Theme::light();
        assert_eq!(theme.score_color(92.0), Color::Green);
        assert_eq!(theme.score_color(65.0), Color::Yellow);
        assert_eq!(theme.score_color(10.0), Color::Red);
    }
}
