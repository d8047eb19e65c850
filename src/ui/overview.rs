//! Overview of the latest batch.
//!
//! Three metric gauges and the composite quality score on top, the
//! strength trend of recent batches below.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Gauge, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::data::analytics::batch_trend;
use crate::data::{classify, GaugeRange, Metric, PartyMetrics, Status, RECENT_BATCHES};

use super::common::{block, format_value, render_placeholder, sparkline_text};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        return;
    };
    let Some(batch_id) = data.latest_batch() else {
        render_placeholder(frame, app, area, "Overview", "No rows in the dataset");
        return;
    };

    let thresholds = &app.options.thresholds;
    let metrics = PartyMetrics::calculate(&data.batch(batch_id), data.columns, thresholds);

    let chunks = Layout::vertical([
        Constraint::Length(5), // Gauges
        Constraint::Length(3), // Quality score
        Constraint::Min(5),    // Batch trend
    ])
    .split(area);

    let cards = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(chunks[0]);

    render_gauge(
        frame,
        app,
        cards[0],
        GaugeCard {
            title: "Strength, cN/tex",
            value: Some(metrics.avg_strength),
            decimals: 1,
            range: GaugeRange::STRENGTH,
            status: classify(Some(metrics.avg_strength), thresholds.strength_rule()),
            good: metrics.good_count(Metric::Strength),
            total: metrics.total_machines,
        },
    );

    if data.columns.coefficient_of_variation {
        render_gauge(
            frame,
            app,
            cards[1],
            GaugeCard {
                title: "CV, %",
                value: metrics.avg_cv,
                decimals: 1,
                range: GaugeRange::CV,
                status: classify(metrics.avg_cv, thresholds.cv_rule()),
                good: metrics.good_count(Metric::Cv),
                total: metrics.total_machines,
            },
        );
    } else {
        render_placeholder(frame, app, cards[1], "CV, %", "Column not found");
    }

    if data.columns.linear_density {
        render_gauge(
            frame,
            app,
            cards[2],
            GaugeCard {
                title: "Linear density, tex",
                value: Some(metrics.avg_density),
                decimals: 2,
                range: GaugeRange::DENSITY,
                status: classify(Some(metrics.avg_density), thresholds.density_rule()),
                good: metrics.good_count(Metric::Density),
                total: metrics.total_machines,
            },
        );
    } else {
        render_placeholder(frame, app, cards[2], "Linear density, tex", "Column not found");
    }

    let score = metrics.quality_score(thresholds);
    let score_gauge = Gauge::default()
        .block(block(
            app,
            format!(" Quality score · batch {} ", app.batch_label(batch_id)),
        ))
        .gauge_style(Style::default().fg(app.theme.score_color(score)))
        .ratio((score / 100.0).clamp(0.0, 1.0))
        .label(format!(
            "{:.1} / 100   {} issues in {} machines",
            score,
            metrics.total_issues(),
            metrics.total_machines
        ));
    frame.render_widget(score_gauge, chunks[1]);

    render_trend(frame, app, chunks[2]);
}

struct GaugeCard {
    title: &'static str,
    value: Option<f64>,
    decimals: usize,
    range: GaugeRange,
    status: Status,
    good: usize,
    total: usize,
}

fn render_gauge(frame: &mut Frame, app: &App, area: Rect, card: GaugeCard) {
    let style = app.theme.status_style(card.status);
    let b = block(app, format!(" {} ", card.title));
    let inner = b.inner(area);
    frame.render_widget(b, area);

    let rows = Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(app.theme.status_color(card.status)))
        .ratio(card.value.map_or(0.0, |v| card.range.ratio(v)))
        .label(format_value(card.value, card.decimals));
    frame.render_widget(gauge, rows[0]);

    let summary = Line::from(vec![
        Span::styled(card.status.symbol(), style),
        Span::raw(format!("  {}/{} within norm", card.good, card.total)),
    ]);
    frame.render_widget(Paragraph::new(summary), rows[1]);
}

fn render_trend(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        return;
    };
    let points = batch_trend(data, RECENT_BATCHES);
    let values: Vec<f64> = points.iter().map(|p| p.avg_strength).collect();
    let strength_min = app.options.thresholds.strength_min;

    let rows: Vec<Row> = points
        .iter()
        .rev()
        .map(|p| {
            let status = classify(Some(p.avg_strength), app.options.thresholds.strength_rule());
            Row::new(vec![
                Cell::from(app.batch_label(p.batch_id)),
                Cell::from(format!("{:.1}", p.avg_strength)),
                Cell::from(status.symbol()).style(app.theme.status_style(status)),
            ])
        })
        .collect();

    let header = Row::new(vec![
        Cell::from("Batch"),
        Cell::from("Strength"),
        Cell::from("Status"),
    ])
    .height(1)
    .style(app.theme.header);

    let chunks = Layout::vertical([Constraint::Length(1), Constraint::Min(3)]).split(area);

    let spark = Line::from(vec![
        Span::raw(" Trend "),
        Span::styled(
            sparkline_text(&values),
            Style::default().fg(app.theme.highlight),
        ),
        Span::styled(
            format!("  norm ≥ {:.0}", strength_min),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(spark), chunks[0]);

    let widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths).header(header).block(block(
        app,
        format!(" Strength by batch (last {}) ", points.len()),
    ));
    frame.render_widget(table, chunks[1]);
}
