//! Login form.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, LoginField};

const FORM_WIDTH: u16 = 44;
const FORM_HEIGHT: u16 = 11;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let width = FORM_WIDTH.min(area.width);
    let height = FORM_HEIGHT.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let form_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, form_area);
    let block = Block::default()
        .title(" Millwatch · Yarn quality ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let rows = Layout::vertical([
        Constraint::Length(1), // spacer
        Constraint::Length(1), // login
        Constraint::Length(1), // spacer
        Constraint::Length(1), // password
        Constraint::Length(1), // spacer
        Constraint::Length(1), // error
        Constraint::Min(0),
        Constraint::Length(1), // hint
    ])
    .split(inner);

    let form = &app.login;
    frame.render_widget(
        Paragraph::new(field_line(app, "Login", &form.login, form.focus == LoginField::Login)),
        rows[1],
    );
    let masked = "•".repeat(form.password.chars().count());
    frame.render_widget(
        Paragraph::new(field_line(
            app,
            "Password",
            &masked,
            form.focus == LoginField::Password,
        )),
        rows[3],
    );

    if let Some(ref err) = form.error {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", err),
                Style::default().fg(app.theme.bad),
            )),
            rows[5],
        );
    }

    frame.render_widget(
        Paragraph::new(Span::styled(
            " Tab:next field Enter:sign in Esc:quit",
            Style::default().add_modifier(Modifier::DIM),
        )),
        rows[7],
    );
}

fn field_line<'a>(app: &App, label: &'a str, value: &str, focused: bool) -> Line<'a> {
    let label_style = if focused {
        app.theme.header
    } else {
        Style::default()
    };
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(format!(" {:<9}", label), label_style),
        Span::raw(format!("{}{}", value, cursor)),
    ])
}
