//! Process-setting comparison view.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    widgets::{Cell, Row, Table},
    Frame,
};

use crate::app::App;
use crate::data::analytics::{ComparisonRow, GroupStats};
use crate::data::{Setting, SettingComparison, Status};

use super::common::{block, format_value, render_placeholder};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        return;
    };

    let chunks =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).split(area);

    for (setting, area) in [Setting::PlastificationDraw, Setting::FormingSpeed]
        .into_iter()
        .zip(chunks.iter())
    {
        match SettingComparison::build(data, setting) {
            Some(comparison) => render_comparison(frame, app, *area, &comparison),
            None => render_placeholder(frame, app, *area, setting.title(), "Column not found"),
        }
    }
}

/// Status of a difference between two groups.
///
/// An improvement is good, a regression bad, no change unknown.
fn delta_status(delta: Option<f64>, higher_is_better: bool) -> Status {
    match delta {
        Some(d) if d > 0.0 => {
            if higher_is_better {
                Status::Good
            } else {
                Status::Bad
            }
        }
        Some(d) if d < 0.0 => {
            if higher_is_better {
                Status::Bad
            } else {
                Status::Good
            }
        }
        _ => Status::Unknown,
    }
}

fn format_delta(delta: Option<f64>) -> String {
    match delta {
        Some(d) => format!("{:+.1}", d),
        None => "—".to_string(),
    }
}

fn window_label(window: usize) -> String {
    if window == 1 {
        "Last batch".to_string()
    } else {
        format!("Last {} batches", window)
    }
}

fn group_cells(stats: &GroupStats) -> [Cell<'static>; 3] {
    [
        Cell::from(format_value(stats.strength, 1)),
        Cell::from(format_value(stats.cv, 1)),
        Cell::from(if stats.count > 0 {
            stats.count.to_string()
        } else {
            "—".to_string()
        }),
    ]
}

fn comparison_row<'a>(app: &App, row: &ComparisonRow) -> Row<'a> {
    let strength_delta = row.strength_delta();
    let cv_delta = row.cv_delta();

    let mut cells = vec![Cell::from(window_label(row.window))];
    cells.extend(group_cells(&row.first));
    cells.extend(group_cells(&row.second));
    cells.push(
        Cell::from(format_delta(strength_delta))
            .style(app.theme.status_style(delta_status(strength_delta, true))),
    );
    cells.push(
        Cell::from(format_delta(cv_delta))
            .style(app.theme.status_style(delta_status(cv_delta, false))),
    );
    Row::new(cells)
}

fn render_comparison(frame: &mut Frame, app: &App, area: Rect, comparison: &SettingComparison) {
    let (a, b) = comparison.values;
    let header = Row::new(vec![
        Cell::from("Window"),
        Cell::from(format!("Str. {}", a)),
        Cell::from(format!("CV {}", a)),
        Cell::from("n"),
        Cell::from(format!("Str. {}", b)),
        Cell::from(format!("CV {}", b)),
        Cell::from("n"),
        Cell::from("Δ Str."),
        Cell::from("Δ CV"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = comparison
        .rows
        .iter()
        .map(|row| comparison_row(app, row))
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(4),
        Constraint::Length(8),
        Constraint::Length(7),
    ];

    let (machines_a, machines_b) = comparison.machines;
    let title = format!(
        " {} · {} vs {} · machines in latest batch {}/{} ",
        comparison.setting.title(),
        a,
        b,
        machines_a,
        machines_b
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, title));
    frame.render_widget(table, area);
}
