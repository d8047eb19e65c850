//! Detail overlay rendering.
//!
//! Displays a modal overlay with the recent history of the selected machine.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, DETAIL_BATCHES};
use crate::data::quality::machine_status;
use crate::data::{TrendIndicator, TrendRule};

use super::common::{block, format_value, sparkline_text};

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 16;

/// Render the machine detail as a modal overlay.
///
/// Shows the last batches of the selected machine with all measured
/// values, the per-row status and both trend indicators.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    // Skip rendering if terminal is too small for the overlay
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(ref data) = app.data else {
        return;
    };
    let Some(machine_id) = app.selected_machine() else {
        return;
    };

    let history = data.machine_history(machine_id, DETAIL_BATCHES);
    let strength: Vec<f64> = history.iter().map(|r| r.breaking_strength).collect();
    let cv: Vec<f64> = history
        .iter()
        .filter_map(|r| r.coefficient_of_variation)
        .collect();
    let strength_trend = TrendIndicator::from_values(&strength, &TrendRule::strength());
    let cv_trend = TrendIndicator::from_values(&cv, &TrendRule::cv());

    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 100);
    let overlay_height = (area.height * 90 / 100).clamp(MIN_OVERLAY_HEIGHT, 30);

    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(5), // Header with trend summary
        Constraint::Min(8),    // History table
        Constraint::Length(1), // Footer
    ])
    .split(overlay_area);

    // ===== HEADER SECTION =====
    let header_lines = vec![
        Line::from(vec![Span::styled(
            format!(" Machine {} ", machine_id),
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(vec![
            Span::raw(" Strength: "),
            Span::styled(
                strength_trend.display(),
                app.theme
                    .status_style(strength_trend.status())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("    CV: "),
            Span::styled(
                cv_trend.display(),
                app.theme
                    .status_style(cv_trend.status())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled(
                sparkline_text(&strength),
                Style::default().fg(app.theme.highlight),
            ),
        ]),
    ];

    let header_block = Block::default()
        .title(" Machine Detail ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    frame.render_widget(Paragraph::new(header_lines).block(header_block), chunks[0]);

    // ===== HISTORY TABLE =====
    let columns = data.columns;
    let thresholds = &app.options.thresholds;

    let header = Row::new(vec![
        Cell::from("Batch"),
        Cell::from("Strength"),
        Cell::from("CV"),
        Cell::from("Density"),
        Cell::from("Draw"),
        Cell::from("Speed"),
        Cell::from("Status"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = history
        .iter()
        .rev()
        .map(|r| {
            let status = machine_status(r, thresholds);
            let optional = |present: bool, value: Option<f64>, decimals: usize| {
                if present {
                    format_value(value, decimals)
                } else {
                    "n/a".to_string()
                }
            };
            Row::new(vec![
                Cell::from(app.batch_label(r.batch_id)),
                Cell::from(format!("{:.1}", r.breaking_strength)),
                Cell::from(optional(
                    columns.coefficient_of_variation,
                    r.coefficient_of_variation,
                    1,
                )),
                Cell::from(optional(columns.linear_density, r.linear_density, 2)),
                Cell::from(optional(columns.plastification_draw, r.plastification_draw, 0)),
                Cell::from(optional(columns.forming_speed, r.forming_speed, 1)),
                Cell::from(status.symbol()).style(app.theme.status_style(status)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Length(9),
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Fill(1),
    ];

    let table = Table::new(rows, widths).header(header).block(block(
        app,
        format!(" Last {} batches ", history.len()),
    ));
    frame.render_widget(table, chunks[1]);

    // ===== FOOTER =====
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " Press Esc to close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}
