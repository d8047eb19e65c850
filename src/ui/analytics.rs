//! Analytics view.
//!
//! Left: machines with the most strength and CV deviations over the recent
//! batches. Right: per-machine status of the selected batch.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::analytics::problem_machines;
use crate::data::{Status, RECENT_BATCHES};

use super::common::{block, format_value, render_placeholder};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.data.is_none() {
        return;
    }

    let chunks =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).split(area);

    render_problems(frame, app, chunks[0]);
    render_quality_map(frame, app, chunks[1]);
}

fn severity_label(status: Status) -> &'static str {
    match status {
        Status::Bad => "critical",
        Status::Warning => "warning",
        _ => "notice",
    }
}

fn render_problems(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        return;
    };
    let problems = problem_machines(data, RECENT_BATCHES, &app.options.thresholds);
    let title = format!(" Problem machines (last {} batches) ", RECENT_BATCHES);

    if problems.is_empty() {
        render_placeholder(frame, app, area, title.trim(), "No deviations");
        return;
    }

    let header = Row::new(vec![
        Cell::from("Machine"),
        Cell::from("Low str."),
        Cell::from("High CV"),
        Cell::from("Total"),
        Cell::from("Severity"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = problems
        .iter()
        .map(|p| {
            let severity = p.severity();
            Row::new(vec![
                Cell::from(p.machine_id.to_string()),
                Cell::from(p.low_strength.to_string()),
                Cell::from(p.high_cv.to_string()),
                Cell::from(p.total().to_string()),
                Cell::from(severity_label(severity)).style(app.theme.status_style(severity)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(9),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, title));
    frame.render_widget(table, area);
}

fn render_quality_map(frame: &mut Frame, app: &App, area: Rect) {
    let Some(map) = app.quality_map() else {
        render_placeholder(frame, app, area, "Quality map", "No batches");
        return;
    };

    let header = Row::new(vec![
        Cell::from("Machine"),
        Cell::from("Strength"),
        Cell::from("CV"),
        Cell::from("Status"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = map
        .points
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.machine_id.to_string()),
                Cell::from(format!("{:.1}", p.strength)),
                Cell::from(format_value(p.cv, 1)),
                Cell::from(p.status.symbol()).style(app.theme.status_style(p.status)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Length(7),
    ];

    let batches = app.selectable_batches();
    let position = if batches.is_empty() {
        String::new()
    } else {
        format!(" [{}/{}]", app.batch_offset + 1, batches.len())
    };
    let title = Line::from(vec![
        Span::raw(format!(
            " Batch {}{} ",
            app.batch_label(map.batch_id),
            position
        )),
        Span::styled(
            format!("{} ok ", map.good),
            Style::default().fg(app.theme.good),
        ),
        Span::styled(
            format!("{} warn ", map.warning),
            Style::default().fg(app.theme.warning),
        ),
        Span::styled(
            format!("{} bad ", map.bad),
            Style::default().fg(app.theme.bad),
        ),
    ]);

    let selected = app.selected_index.min(map.points.len().saturating_sub(1));
    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, title))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(table, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_labels() {
        assert_eq!(severity_label(Status::Bad), "critical");
        assert_eq!(severity_label(Status::Warning), "warning");
        assert_eq!(severity_label(Status::Good), "notice");
    }
}
