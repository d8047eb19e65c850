//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, help overlay
//! and the panels shown in place of a view when there is nothing to draw.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, View};
use crate::data::trend::sparkline;
use crate::data::PartyMetrics;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bordered block in the theme's style.
pub fn block<'a>(app: &App, title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

/// Format an optional measurement, `—` when missing.
pub fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "—".to_string(),
    }
}

/// Render a series as sparkline characters.
pub fn sparkline_text(values: &[f64]) -> String {
    sparkline(values)
        .iter()
        .map(|&v| SPARKLINE_CHARS[v.min(7) as usize])
        .collect()
}

/// Render the header bar with the latest batch overview.
///
/// Displays: batch number, quality score, issue count, logged-in user.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = Span::styled(" MILLWATCH ", Style::default().add_modifier(Modifier::BOLD));
    let user = app
        .session
        .user()
        .map(|u| format!(" │ {} ({})", u.name, u.role.label()))
        .unwrap_or_default();

    let Some(ref data) = app.data else {
        let state = if app.load_error.is_some() {
            "| No data"
        } else {
            "| Loading..."
        };
        let line = Line::from(vec![title, Span::raw(state), Span::raw(user)]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let Some(batch_id) = data.latest_batch() else {
        let line = Line::from(vec![title, Span::raw("| Empty table"), Span::raw(user)]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let thresholds = &app.options.thresholds;
    let metrics = PartyMetrics::calculate(&data.batch(batch_id), data.columns, thresholds);
    let score = metrics.quality_score(thresholds);
    let issues = metrics.total_issues();

    let line = Line::from(vec![
        Span::styled(" ● ", Style::default().fg(app.theme.score_color(score))),
        title,
        Span::raw("│ Batch "),
        Span::styled(
            app.batch_label(batch_id),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ Score "),
        Span::styled(
            format!("{:.1}", score),
            Style::default()
                .fg(app.theme.score_color(score))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        if issues > 0 {
            Span::styled(
                format!("{}", issues),
                Style::default().fg(app.theme.bad).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        },
        Span::raw(" issues │ "),
        Span::styled(
            format!("{}", metrics.total_machines),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" machines"),
        Span::raw(user),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let views = View::available(app.is_admin());
    let titles: Vec<Line> = views
        .iter()
        .enumerate()
        .map(|(i, v)| Line::from(format!(" {}:{} ", i + 1, v.label())))
        .collect();

    let selected = views
        .iter()
        .position(|v| *v == app.current_view)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: data source, time since last fetch, available controls.
/// Also displays temporary status messages and errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = if app.data.is_some() {
        let fetched = app
            .fetched_at()
            .map(|t| format!("Fetched {}s ago", t.elapsed().as_secs()))
            .unwrap_or_else(|| "Not fetched".to_string());

        let controls = match app.current_view {
            View::Overview | View::Compare => "Tab:switch r:refresh e:export ?:help o:logout q:quit",
            View::Analytics => "↑↓:select [/]:batch Tab:switch ?:help q:quit",
            View::Machines => "↑↓:select Enter:detail Tab:switch ?:help q:quit",
            View::Admin => "↑↓:scroll r:refresh Tab:switch ?:help q:quit",
        };

        format!(
            " {} | {} | {}",
            app.source_description(),
            fetched,
            controls
        )
    } else if app.load_error.is_some() {
        " Load failed | r:retry o:logout q:quit".to_string()
    } else {
        " Loading... | q:quit".to_string()
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render a load failure in place of the view content.
pub fn render_error(frame: &mut Frame, app: &App, area: Rect, message: &str) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Could not load data",
            Style::default().fg(app.theme.bad).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("  {}", message)),
        Line::from(""),
        Line::from(Span::styled(
            "  Press r to retry",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.bad)),
        );
    frame.render_widget(panel, area);
}

/// Render a dimmed message inside a titled block.
pub fn render_placeholder(frame: &mut Frame, app: &App, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            message.to_string(),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .alignment(Alignment::Center)
    .block(block(app, format!(" {} ", title)));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let mut help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  1-5         Jump to view"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Machine detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Analytics"),
        Line::from("  [ / ]       Older / newer batch"),
        Line::from(""),
        section(" General"),
        Line::from("  r         Refresh data"),
        Line::from("  e         Export to JSON"),
        Line::from("  o         Log out"),
        Line::from("  q         Quit"),
        Line::from(""),
    ];
    help_text.push(Line::from(vec![Span::styled(
        "Press any key to close",
        Style::default().add_modifier(Modifier::DIM),
    )]));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 25u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
