//! Admin view: who uses the dashboard and for how long.

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_minutes;
use crate::visits::VisitStats;

use super::common::{block, render_placeholder};

fn local_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%d.%m %H:%M").to_string()
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref stats) = app.visit_stats else {
        render_placeholder(frame, app, area, "Visits", "Visit log unavailable");
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(3),      // Totals
        Constraint::Percentage(40), // Users and active sessions
        Constraint::Min(5),         // Recent visits
    ])
    .split(area);

    render_totals(frame, app, chunks[0], stats);

    let middle = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(25),
        Constraint::Percentage(25),
    ])
    .split(chunks[1]);
    render_users(frame, app, middle[0], stats);
    render_active(frame, app, middle[1], stats);
    render_page_views(frame, app, middle[2], stats);
    render_recent(frame, app, chunks[2], stats);
}

fn render_totals(frame: &mut Frame, app: &App, area: Rect, stats: &VisitStats) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let line = Line::from(vec![
        Span::raw(" Visits: "),
        Span::styled(stats.total_visits().to_string(), bold),
        Span::raw("   Time on dashboard: "),
        Span::styled(format_minutes(stats.total_minutes()), bold),
        Span::raw("   Users: "),
        Span::styled(stats.users.len().to_string(), bold),
        Span::raw("   Online: "),
        Span::styled(
            stats.active.len().to_string(),
            bold.fg(app.theme.good),
        ),
    ]);
    frame.render_widget(Paragraph::new(line).block(block(app, " Totals ")), area);
}

fn render_users(frame: &mut Frame, app: &App, area: Rect, stats: &VisitStats) {
    let header = Row::new(vec![
        Cell::from("Login"),
        Cell::from("Name"),
        Cell::from("Visits"),
        Cell::from("Time"),
        Cell::from("Last visit"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = stats
        .users
        .iter()
        .map(|u| {
            Row::new(vec![
                Cell::from(u.username.clone()),
                Cell::from(u.display_name.clone()),
                Cell::from(u.visit_count.to_string()),
                Cell::from(format_minutes(u.total_minutes)),
                Cell::from(local_time(u.last_visit)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Fill(2),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, " Users "));
    frame.render_widget(table, area);
}

fn render_active(frame: &mut Frame, app: &App, area: Rect, stats: &VisitStats) {
    if stats.active.is_empty() {
        render_placeholder(frame, app, area, "Online", "Nobody online");
        return;
    }

    let rows: Vec<Row> = stats
        .active
        .iter()
        .map(|s| {
            Row::new(vec![
                Cell::from("●").style(Style::default().fg(app.theme.good)),
                Cell::from(s.display_name.clone()),
                Cell::from(local_time(s.login_time)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Fill(1),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths).block(block(
        app,
        format!(" Online ({}) ", stats.active.len()),
    ));
    frame.render_widget(table, area);
}

fn render_page_views(frame: &mut Frame, app: &App, area: Rect, stats: &VisitStats) {
    if stats.page_views.is_empty() {
        render_placeholder(frame, app, area, "Pages", "No page views");
        return;
    }

    let rows: Vec<Row> = stats
        .page_views
        .iter()
        .map(|v| {
            Row::new(vec![
                Cell::from(v.username.clone()),
                Cell::from(v.page.clone()),
                Cell::from(local_time(v.view_time)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths).block(block(app, " Pages "));
    frame.render_widget(table, area);
}

fn render_recent(frame: &mut Frame, app: &App, area: Rect, stats: &VisitStats) {
    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("User"),
        Cell::from("Login"),
        Cell::from("Logout"),
        Cell::from("Duration"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = stats
        .recent
        .iter()
        .map(|v| {
            let (logout, duration) = match (v.logout_time, v.duration_minutes) {
                (Some(t), Some(m)) => (local_time(t), format_minutes(m)),
                (Some(t), None) => (local_time(t), "—".to_string()),
                (None, _) => ("open".to_string(), "—".to_string()),
            };
            let logout_style = if v.is_open() {
                Style::default().fg(app.theme.good)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(v.id.to_string()),
                Cell::from(v.display_name.clone()),
                Cell::from(local_time(v.login_time)),
                Cell::from(logout).style(logout_style),
                Cell::from(duration),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Fill(1),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(9),
    ];

    let selected = app.selected_index.min(stats.recent.len().saturating_sub(1));
    let table = Table::new(rows, widths)
        .header(header)
        .block(block(
            app,
            format!(" Recent visits ({}) ", stats.recent.len()),
        ))
        .row_highlight_style(app.theme.selected);

    let mut state = TableState::default();
    if !stats.recent.is_empty() {
        state.select(Some(selected));
    }
    frame.render_stateful_widget(table, area, &mut state);
}
