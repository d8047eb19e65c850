//! Machines view rendering.
//!
//! Displays a table of every machine seen in the recent batches with its
//! last values, trend indicators and a strength sparkline.

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::report::MACHINE_PREVIEW_BATCHES;
use crate::data::{TrendIndicator, TrendRule};

use super::common::{block, render_placeholder, sparkline_text};

/// Values colored by the metric's status bands, oldest first.
pub fn colored_values(app: &App, values: &[f64], rule: &TrendRule) -> Line<'static> {
    let mut spans = Vec::with_capacity(values.len() * 2);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            format!("{:.1}", v),
            Style::default().fg(app.theme.status_color(rule.bands.status(*v))),
        ));
    }
    Line::from(spans)
}

pub fn trend_cell(app: &App, trend: &TrendIndicator) -> Cell<'static> {
    Cell::from(trend.display()).style(app.theme.status_style(trend.status()))
}

/// Render the Machines view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let machines = app.machine_rows();
    if machines.is_empty() {
        render_placeholder(frame, app, area, "Machines", "No machines in the recent batches");
        return;
    }

    let strength_rule = TrendRule::strength();
    let cv_rule = TrendRule::cv();

    let header = Row::new(vec![
        Cell::from("Machine"),
        Cell::from(format!("Strength (last {})", MACHINE_PREVIEW_BATCHES)),
        Cell::from("Trend"),
        Cell::from(format!("CV (last {})", MACHINE_PREVIEW_BATCHES)),
        Cell::from("Trend"),
        Cell::from("Spark"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = machines
        .iter()
        .map(|m| {
            Row::new(vec![
                Cell::from(m.machine_id.to_string()),
                Cell::from(colored_values(app, &m.strength, &strength_rule)),
                trend_cell(app, &m.strength_trend),
                Cell::from(colored_values(app, &m.cv, &cv_rule)),
                trend_cell(app, &m.cv_trend),
                Cell::from(sparkline_text(&m.strength)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Fill(3),
        Constraint::Length(9),
        Constraint::Fill(2),
        Constraint::Length(7),
        Constraint::Min(6),
    ];

    let selected = app.selected_index.min(machines.len().saturating_sub(1));
    let title = format!(
        " Machines ({}) [{}/{}] ",
        machines.len(),
        selected + 1,
        machines.len()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}
