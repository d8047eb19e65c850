//! Application state and navigation logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use crate::auth::{Session, UserDirectory};
use crate::config::DisplaySettings;
use crate::data::analytics::{machine_rows, MachineRow};
use crate::data::report::{self, MACHINE_PREVIEW_BATCHES};
use crate::data::{QualityMap, QualityThresholds, Table};
use crate::source::DatasetCache;
use crate::ui::Theme;
use crate::visits::{VisitLog, VisitStats};

/// Number of recent batches offered by the quality-map batch selector.
pub const SELECTABLE_BATCHES: usize = 20;

/// Number of batches shown in the machine detail overlay.
pub const DETAIL_BATCHES: usize = 10;

/// The current view/tab in the TUI.
///
/// Machine detail is shown as an overlay (controlled by
/// `App::show_detail_overlay`) rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Latest batch: gauges, quality score, batch trend.
    Overview,
    /// Problem machines and the per-batch quality map.
    Analytics,
    /// Process-setting comparisons.
    Compare,
    /// Per-machine recent history with trend indicators.
    Machines,
    /// Visit statistics, admins only.
    Admin,
}

impl View {
    const ALL: [View; 5] = [
        View::Overview,
        View::Analytics,
        View::Compare,
        View::Machines,
        View::Admin,
    ];

    /// Views a user may open.
    pub fn available(admin: bool) -> &'static [View] {
        if admin {
            &Self::ALL
        } else {
            &Self::ALL[..4]
        }
    }

    /// Cycle to the next view.
    pub fn next(self, admin: bool) -> Self {
        let views = Self::available(admin);
        let index = views.iter().position(|v| *v == self).unwrap_or(0);
        views[(index + 1) % views.len()]
    }

    /// Cycle to the previous view.
    pub fn prev(self, admin: bool) -> Self {
        let views = Self::available(admin);
        let index = views.iter().position(|v| *v == self).unwrap_or(0);
        views[(index + views.len() - 1) % views.len()]
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Overview => "Overview",
            View::Analytics => "Analytics",
            View::Compare => "Settings",
            View::Machines => "Machines",
            View::Admin => "Admin",
        }
    }

    /// Page name recorded in the visit log.
    pub fn page(&self) -> &'static str {
        match self {
            View::Overview => "overview",
            View::Analytics => "analytics",
            View::Compare => "compare",
            View::Machines => "machines",
            View::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Login,
    Password,
}

/// Contents of the login screen.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
    pub focus: LoginField,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn push(&mut self, c: char) {
        match self.focus {
            LoginField::Login => self.login.push(c),
            LoginField::Password => self.password.push(c),
        }
    }

    pub fn pop(&mut self) {
        match self.focus {
            LoginField::Login => self.login.pop(),
            LoginField::Password => self.password.pop(),
        };
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Login => LoginField::Password,
            LoginField::Password => LoginField::Login,
        };
    }
}

/// Runtime options resolved from configuration.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub thresholds: QualityThresholds,
    pub cache_ttl: Duration,
    pub active_window: Duration,
    pub display: DisplaySettings,
    /// Where the `e` key writes the batch report.
    pub export_path: PathBuf,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            thresholds: QualityThresholds::default(),
            cache_ttl: Duration::from_secs(30 * 60),
            active_window: crate::visits::ACTIVE_WINDOW,
            display: DisplaySettings::default(),
            export_path: PathBuf::from("millwatch_export.json"),
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    // Data
    cache: DatasetCache,
    pub data: Option<Arc<Table>>,
    pub load_error: Option<String>,
    pub options: AppOptions,

    // Login and visit tracking
    users: UserDirectory,
    pub session: Session,
    pub login: LoginForm,
    visits: Option<VisitLog>,
    pub visit_stats: Option<VisitStats>,

    // Navigation state
    pub selected_index: usize,
    /// Index into the selectable batches, 0 being the latest.
    pub batch_offset: usize,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(
        cache: DatasetCache,
        users: UserDirectory,
        visits: Option<VisitLog>,
        options: AppOptions,
    ) -> Self {
        Self {
            running: true,
            current_view: View::Overview,
            show_help: false,
            show_detail_overlay: false,
            cache,
            data: None,
            load_error: None,
            options,
            users,
            session: Session::default(),
            login: LoginForm::default(),
            visits,
            visit_stats: None,
            selected_index: 0,
            batch_offset: 0,
            theme: Theme::dark(),
            status_message: None,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.cache.description()
    }

    /// When the displayed table was fetched.
    pub fn fetched_at(&self) -> Option<Instant> {
        self.cache.fetched_at()
    }

    pub fn visit_log(&self) -> Option<&VisitLog> {
        self.visits.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Fetch the table through the cache.
    ///
    /// Returns true if a different table is now displayed. A failed load
    /// clears the displayed table so no partial dashboard is shown.
    pub fn reload_data(&mut self) -> bool {
        match self.cache.get_or_fetch(self.options.cache_ttl) {
            Ok(table) => {
                let changed = !self
                    .data
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &table));
                self.data = Some(table);
                self.load_error = None;
                self.clamp_selection();
                changed
            }
            Err(e) => {
                self.data = None;
                self.load_error = Some(e.to_string());
                false
            }
        }
    }

    /// Drop the cached table and load again.
    pub fn refresh(&mut self) {
        self.cache.invalidate();
        if self.reload_data() {
            info!(source = self.cache.description(), "Data refreshed");
            self.set_status_message("Data refreshed".to_string());
        }
        if self.current_view == View::Admin {
            self.refresh_visit_stats();
        }
    }

    /// Check the login form and start a session.
    pub fn submit_login(&mut self) {
        let result = self.users.verify(&self.login.login, &self.login.password);
        self.login.password.clear();

        let user = match result {
            Ok(user) => user,
            Err(e) => {
                self.login.error = Some(e.to_string());
                self.login.focus = LoginField::Password;
                return;
            }
        };

        let opened = self
            .visits
            .as_ref()
            .map(|log| log.open_session(&user.login, &user.name));
        let visit_id = match opened {
            Some(Ok(id)) => Some(id),
            Some(Err(e)) => {
                error!(error = %e, "Failed to record login");
                self.set_status_message(format!("Visit log unavailable: {}", e));
                None
            }
            None => None,
        };

        info!(login = %user.login, visit_id = ?visit_id, "Session started");
        self.session.login(user, visit_id);
        self.login = LoginForm::default();
        self.current_view = View::Overview;
        self.selected_index = 0;
        self.record_page_view();
        self.reload_data();
    }

    /// End the session and return to the login screen.
    pub fn logout(&mut self) {
        if let Some(user) = self.session.user() {
            info!(login = %user.login, "Session ended");
        }
        if let Some(id) = self.session.logout() {
            self.close_visit(id);
        }
        self.current_view = View::Overview;
        self.show_detail_overlay = false;
        self.show_help = false;
        self.visit_stats = None;
        self.selected_index = 0;
    }

    fn close_visit(&self, id: crate::visits::VisitId) {
        if let Some(log) = &self.visits {
            if let Err(e) = log.close_session(id) {
                error!(visit_id = id, error = %e, "Failed to record logout");
            }
        }
    }

    fn record_page_view(&self) {
        if let (Some(log), Some(user)) = (&self.visits, self.session.user()) {
            if let Err(e) = log.record_page_view(&user.login, self.current_view.page()) {
                warn!(error = %e, "Failed to record page view");
            }
        }
    }

    /// Reload the admin statistics.
    pub fn refresh_visit_stats(&mut self) {
        let Some(log) = &self.visits else {
            self.visit_stats = None;
            return;
        };
        match log.visit_stats(self.options.active_window) {
            Ok(stats) => self.visit_stats = Some(stats),
            Err(e) => {
                error!(error = %e, "Failed to read visit statistics");
                self.set_status_message(format!("Visit statistics unavailable: {}", e));
            }
        }
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.set_view(self.current_view.next(self.is_admin()));
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.set_view(self.current_view.prev(self.is_admin()));
    }

    /// Switch to a specific view. The admin view is ignored for non-admins.
    pub fn set_view(&mut self, view: View) {
        if view == View::Admin && !self.is_admin() {
            return;
        }
        if view == self.current_view {
            return;
        }
        self.current_view = view;
        self.selected_index = 0;
        self.show_detail_overlay = false;
        self.record_page_view();
        if view == View::Admin {
            self.refresh_visit_stats();
        }
    }

    /// Number of selectable rows in the current view.
    pub fn list_len(&self) -> usize {
        match self.current_view {
            View::Machines => self
                .data
                .as_ref()
                .map_or(0, |t| t.machines_in_last(MACHINE_PREVIEW_BATCHES).len()),
            View::Analytics => self.quality_map().map_or(0, |m| m.points.len()),
            View::Admin => self.visit_stats.as_ref().map_or(0, |s| s.recent.len()),
            View::Overview | View::Compare => 0,
        }
    }

    fn clamp_selection(&mut self) {
        let max = self.list_len().saturating_sub(1);
        self.selected_index = self.selected_index.min(max);
        let batches = self.selectable_batches().len();
        self.batch_offset = self.batch_offset.min(batches.saturating_sub(1));
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.list_len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        self.selected_index = self.list_len().saturating_sub(1);
    }

    /// Recent batch ids, newest first.
    pub fn selectable_batches(&self) -> Vec<i64> {
        let Some(table) = &self.data else {
            return Vec::new();
        };
        let mut ids = table.last_batch_ids(SELECTABLE_BATCHES);
        ids.reverse();
        ids
    }

    /// Batch shown in the quality map.
    pub fn selected_batch(&self) -> Option<i64> {
        self.selectable_batches().get(self.batch_offset).copied()
    }

    pub fn older_batch(&mut self) {
        let max = self.selectable_batches().len().saturating_sub(1);
        self.batch_offset = (self.batch_offset + 1).min(max);
        self.selected_index = 0;
    }

    pub fn newer_batch(&mut self) {
        self.batch_offset = self.batch_offset.saturating_sub(1);
        self.selected_index = 0;
    }

    pub fn quality_map(&self) -> Option<QualityMap> {
        let table = self.data.as_ref()?;
        let batch = self.selected_batch()?;
        Some(QualityMap::build(table, batch, &self.options.thresholds))
    }

    /// Per-machine preview rows.
    pub fn machine_rows(&self) -> Vec<MachineRow> {
        self.data
            .as_ref()
            .map(|t| machine_rows(t, MACHINE_PREVIEW_BATCHES))
            .unwrap_or_default()
    }

    /// Machine under the cursor in the Machines view.
    pub fn selected_machine(&self) -> Option<i64> {
        let table = self.data.as_ref()?;
        table
            .machines_in_last(MACHINE_PREVIEW_BATCHES)
            .get(self.selected_index)
            .copied()
    }

    /// Batch number as shown to operators.
    pub fn batch_label(&self, batch_id: i64) -> String {
        self.options.display.batch_label(batch_id)
    }

    /// Open the detail overlay for the selected machine.
    pub fn enter_detail(&mut self) {
        if self.current_view == View::Machines && self.selected_machine().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close overlay first, then go to Overview.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
            return;
        }
        self.set_view(View::Overview);
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit, closing any open visit.
    pub fn quit(&mut self) {
        if self.session.is_authenticated() {
            self.logout();
        }
        self.running = false;
    }

    /// Export the latest batch report to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(table) = &self.data else {
            bail!("No data to export");
        };
        report::export(
            table,
            &self.options.thresholds,
            self.options.display.batch_display_offset,
            path,
        )
    }
}
