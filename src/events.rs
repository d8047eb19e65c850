use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, LoginField, View};

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    if !app.session.is_authenticated() {
        handle_login_input(app, key);
        return;
    }

    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // If detail overlay is shown, handle overlay-specific keys
    if app.show_detail_overlay {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
                app.close_overlay();
            }
            // Allow scrolling through machines while overlay is open
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::PageUp => app.select_prev_n(10),
            KeyCode::PageDown => app.select_next_n(10),
            KeyCode::Home => app.select_first(),
            KeyCode::End => app.select_last(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),

        // View switching
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),

        // Direct view access
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            if let Some(view) = View::available(app.is_admin()).get(index) {
                app.set_view(*view);
            }
        }

        // Navigation (up/down for items, left/right for tabs)
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Batch selection for the quality map
        KeyCode::Char('[') => app.older_batch(),
        KeyCode::Char(']') => app.newer_batch(),

        KeyCode::Enter => app.enter_detail(),

        // Go back (Esc and Backspace)
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        KeyCode::Char('r') => app.refresh(),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('o') => app.logout(),

        // Export
        KeyCode::Char('e') => {
            let export_path = app.options.export_path.clone();
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Handle key input on the login screen
fn handle_login_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.quit(),

        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login.toggle_focus();
        }

        // Enter on the login field moves on, on the password field submits
        KeyCode::Enter => match app.login.focus {
            LoginField::Login => app.login.focus = LoginField::Password,
            LoginField::Password => app.submit_login(),
        },

        KeyCode::Backspace => app.login.pop(),

        KeyCode::Char(c) => {
            app.login.error = None;
            app.login.push(c);
        }

        _ => {}
    }
}

/// Which tab starts at `column` on the tab row.
///
/// Mirrors the layout of `ui::common::render_tabs`: each title is padded by
/// one cell on both sides and tabs are separated by a one-cell divider.
fn tab_at(app: &App, column: u16) -> Option<View> {
    let mut start = 0u16;
    for (i, view) in View::available(app.is_admin()).iter().enumerate() {
        let title = format!(" {}:{} ", i + 1, view.label());
        let end = start + title.chars().count() as u16 + 2;
        if column < end {
            return Some(*view);
        }
        start = end + 1;
    }
    None
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, content_start_row: u16) {
    if !app.session.is_authenticated() {
        return;
    }

    match mouse.kind {
        // Scroll wheel
        MouseEventKind::ScrollUp => {
            app.select_prev();
        }
        MouseEventKind::ScrollDown => {
            app.select_next();
        }

        // Click to select
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked_row = mouse.row;

            // Content rows start after the block border and the table header
            if clicked_row > content_start_row + 1 {
                let item_row = (clicked_row - content_start_row - 2) as usize;
                if item_row < app.list_len() {
                    app.selected_index = item_row;
                }
            }

            // Tab row sits right after the header
            if clicked_row == 1 {
                if let Some(view) = tab_at(app, mouse.column) {
                    app.set_view(view);
                }
            }
        }

        // Right-click goes back
        MouseEventKind::Down(MouseButton::Right) => {
            app.go_back();
        }

        _ => {}
    }
}
