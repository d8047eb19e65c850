//! Visit log.
//!
//! Records logins, logouts and page views in a SQLite database, and
//! answers the statistics shown in the admin view. Every operation that
//! depends on the current time has an `_at` variant taking an explicit
//! timestamp.
//!
//! Timestamps are stored as RFC 3339 UTC strings with millisecond
//! precision, which sort lexicographically in time order.

mod migrations;

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use migrations::run_migrations;

/// Sessions opened within this window without a logout count as online.
pub const ACTIVE_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Number of visits returned by [`VisitLog::visit_stats`].
pub const RECENT_VISITS: usize = 100;
/// Page views listed in the admin statistics.
pub const RECENT_PAGE_VIEWS: usize = 20;

pub type VisitId = i64;

/// Errors from the visit log.
#[derive(Debug, Error)]
pub enum VisitError {
    #[error("Visit log database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid timestamp in visit log: {0}")]
    Time(String),

    #[error("Visit log schema error: {0}")]
    Schema(String),
}

/// One login session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub id: VisitId,
    pub username: String,
    pub display_name: String,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

impl VisitRecord {
    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub username: String,
    pub page: String,
    pub view_time: DateTime<Utc>,
}

/// Aggregates for one user across all visits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub username: String,
    /// Display name from the user's most recent visit.
    pub display_name: String,
    pub visit_count: i64,
    pub total_minutes: i64,
    pub last_visit: DateTime<Utc>,
}

/// A user currently considered online.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSession {
    pub username: String,
    pub display_name: String,
    pub login_time: DateTime<Utc>,
}

/// Everything the admin view shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VisitStats {
    /// Most recent visits, newest first.
    pub recent: Vec<VisitRecord>,
    /// Per-user aggregates, most frequent visitor first.
    pub users: Vec<UserStats>,
    pub active: Vec<ActiveSession>,
    /// Latest page views, newest first.
    pub page_views: Vec<PageView>,
}

impl VisitStats {
    pub fn total_visits(&self) -> i64 {
        self.users.iter().map(|u| u.visit_count).sum()
    }

    pub fn total_minutes(&self) -> i64 {
        self.users.iter().map(|u| u.total_minutes).sum()
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(value: &str, field: &str) -> Result<DateTime<Utc>, VisitError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VisitError::Time(format!("{} '{}': {}", field, value, e)))
}

fn parse_optional_time(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, VisitError> {
    value.map(|raw| parse_time(&raw, field)).transpose()
}

fn window_start(now: DateTime<Utc>, within: Duration) -> Result<DateTime<Utc>, VisitError> {
    let within = chrono::Duration::from_std(within)
        .map_err(|e| VisitError::Time(format!("window {:?}: {}", within, e)))?;
    Ok(now - within)
}

/// A visit row with timestamps still in their stored form.
struct RawVisit {
    id: VisitId,
    username: String,
    display_name: String,
    login_time: String,
    logout_time: Option<String>,
    duration_minutes: Option<i64>,
}

impl RawVisit {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            display_name: row.get("display_name")?,
            login_time: row.get("login_time")?,
            logout_time: row.get("logout_time")?,
            duration_minutes: row.get("duration_minutes")?,
        })
    }

    fn parse(self) -> Result<VisitRecord, VisitError> {
        Ok(VisitRecord {
            id: self.id,
            username: self.username,
            display_name: self.display_name,
            login_time: parse_time(&self.login_time, "login_time")?,
            logout_time: parse_optional_time(self.logout_time, "logout_time")?,
            duration_minutes: self.duration_minutes,
        })
    }
}

/// SQLite-backed store of visits and page views.
#[derive(Debug)]
pub struct VisitLog {
    conn: Connection,
}

impl VisitLog {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self, VisitError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened visit log");
        Self::with_connection(conn)
    }

    /// A private in-memory log.
    pub fn in_memory() -> Result<Self, VisitError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self, VisitError> {
        run_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Record a login and return the new visit's id.
    pub fn open_session(&self, username: &str, display_name: &str) -> Result<VisitId, VisitError> {
        self.open_session_at(username, display_name, Utc::now())
    }

    pub fn open_session_at(
        &self,
        username: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<VisitId, VisitError> {
        self.conn.execute(
            "INSERT INTO visits (username, display_name, login_time) VALUES (?1, ?2, ?3)",
            params![username, display_name, format_time(now)],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, username, "Opened visit");
        Ok(id)
    }

    /// Record a logout.
    ///
    /// Returns `false` when the visit does not exist or is already closed;
    /// neither is an error.
    pub fn close_session(&self, id: VisitId) -> Result<bool, VisitError> {
        self.close_session_at(id, Utc::now())
    }

    pub fn close_session_at(&self, id: VisitId, now: DateTime<Utc>) -> Result<bool, VisitError> {
        let login: Option<String> = self
            .conn
            .query_row(
                "SELECT login_time FROM visits WHERE id = ?1 AND logout_time IS NULL",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(login) = login else {
            return Ok(false);
        };

        let login = parse_time(&login, "login_time")?;
        let minutes = (now - login).num_minutes().max(0);
        self.conn.execute(
            "UPDATE visits SET logout_time = ?1, duration_minutes = ?2
             WHERE id = ?3 AND logout_time IS NULL",
            params![format_time(now), minutes, id],
        )?;
        debug!(id, minutes, "Closed visit");
        Ok(true)
    }

    pub fn visit(&self, id: VisitId) -> Result<Option<VisitRecord>, VisitError> {
        self.conn
            .query_row(
                "SELECT id, username, display_name, login_time, logout_time, duration_minutes
                 FROM visits WHERE id = ?1",
                params![id],
                RawVisit::from_row,
            )
            .optional()?
            .map(RawVisit::parse)
            .transpose()
    }

    /// Users with an open session opened within `within`, one per user.
    pub fn active_sessions(&self, within: Duration) -> Result<Vec<ActiveSession>, VisitError> {
        self.active_sessions_at(Utc::now(), within)
    }

    pub fn active_sessions_at(
        &self,
        now: DateTime<Utc>,
        within: Duration,
    ) -> Result<Vec<ActiveSession>, VisitError> {
        let cutoff = format_time(window_start(now, within)?);
        let mut stmt = self.conn.prepare(
            "SELECT username, display_name, login_time FROM visits
             WHERE logout_time IS NULL AND login_time > ?1
             ORDER BY login_time DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![cutoff], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let mut active = Vec::new();
        for (username, display_name, login_time) in rows {
            if seen.insert(username.clone()) {
                active.push(ActiveSession {
                    username,
                    display_name,
                    login_time: parse_time(&login_time, "login_time")?,
                });
            }
        }
        Ok(active)
    }

    /// Close every open session except each user's most recently opened one.
    ///
    /// Stale sessions get `logout_time = login_time` and zero duration.
    /// Returns the number of sessions closed.
    pub fn cleanup_stale_sessions(&self) -> Result<usize, VisitError> {
        let closed = self.conn.execute(
            "UPDATE visits
             SET logout_time = login_time, duration_minutes = 0
             WHERE logout_time IS NULL
             AND id NOT IN (
                 SELECT MAX(id) FROM visits WHERE logout_time IS NULL GROUP BY username
             )",
            [],
        )?;
        if closed > 0 {
            info!(closed, "Closed stale sessions");
        }
        Ok(closed)
    }

    pub fn record_page_view(&self, username: &str, page: &str) -> Result<(), VisitError> {
        self.record_page_view_at(username, page, Utc::now())
    }

    pub fn record_page_view_at(
        &self,
        username: &str,
        page: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VisitError> {
        self.conn.execute(
            "INSERT INTO page_views (username, page, view_time) VALUES (?1, ?2, ?3)",
            params![username, page, format_time(now)],
        )?;
        Ok(())
    }

    /// Most recent page views, newest first.
    pub fn recent_page_views(&self, limit: usize) -> Result<Vec<PageView>, VisitError> {
        let mut stmt = self.conn.prepare(
            "SELECT username, page, view_time FROM page_views
             ORDER BY view_time DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(username, page, view_time)| -> Result<PageView, VisitError> {
                Ok(PageView {
                    username,
                    page,
                    view_time: parse_time(&view_time, "view_time")?,
                })
            })
            .collect()
    }

    /// Cleanup, then recent visits, per-user aggregates, active sessions
    /// and the latest page views.
    pub fn visit_stats(&self, active_window: Duration) -> Result<VisitStats, VisitError> {
        self.visit_stats_at(Utc::now(), active_window)
    }

    pub fn visit_stats_at(
        &self,
        now: DateTime<Utc>,
        active_window: Duration,
    ) -> Result<VisitStats, VisitError> {
        self.cleanup_stale_sessions()?;

        let recent = {
            let mut stmt = self.conn.prepare(
                "SELECT id, username, display_name, login_time, logout_time, duration_minutes
                 FROM visits ORDER BY login_time DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![RECENT_VISITS as i64], RawVisit::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(RawVisit::parse)
                .collect::<Result<Vec<_>, _>>()?
        };

        let users = {
            let mut stmt = self.conn.prepare(
                "SELECT v.username,
                        (SELECT w.display_name FROM visits w
                         WHERE w.username = v.username ORDER BY w.id DESC LIMIT 1),
                        COUNT(*) AS visit_count,
                        COALESCE(SUM(v.duration_minutes), 0),
                        MAX(v.login_time)
                 FROM visits v
                 GROUP BY v.username
                 ORDER BY visit_count DESC, v.username ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(
                    |(username, display_name, visit_count, total_minutes, last)| -> Result<UserStats, VisitError> {
                    Ok(UserStats {
                        username,
                        display_name,
                        visit_count,
                        total_minutes,
                        last_visit: parse_time(&last, "login_time")?,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let active = self.active_sessions_at(now, active_window)?;
        let page_views = self.recent_page_views(RECENT_PAGE_VIEWS)?;

        Ok(VisitStats {
            recent,
            users,
            active,
            page_views,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, second).unwrap()
    }

    fn log() -> VisitLog {
        VisitLog::in_memory().unwrap()
    }

    #[test]
    fn test_open_and_close_session() {
        let log = log();
        let id = log.open_session_at("ivanov", "Иванов И.", at(9, 0, 0)).unwrap();

        let visit = log.visit(id).unwrap().unwrap();
        assert!(visit.is_open());
        assert_eq!(visit.login_time, at(9, 0, 0));

        assert!(log.close_session_at(id, at(9, 42, 59)).unwrap());
        let visit = log.visit(id).unwrap().unwrap();
        assert_eq!(visit.logout_time, Some(at(9, 42, 59)));
        assert_eq!(visit.duration_minutes, Some(42));
    }

    #[test]
    fn test_close_is_idempotent() {
        let log = log();
        let id = log.open_session_at("ivanov", "Иванов", at(9, 0, 0)).unwrap();

        assert!(log.close_session_at(id, at(9, 10, 0)).unwrap());
        assert!(!log.close_session_at(id, at(10, 0, 0)).unwrap());
        assert_eq!(log.visit(id).unwrap().unwrap().duration_minutes, Some(10));

        assert!(!log.close_session_at(9_999, at(10, 0, 0)).unwrap());
    }

    #[test]
    fn test_active_sessions_window_and_dedup() {
        let log = log();
        log.open_session_at("ivanov", "Иванов", at(9, 50, 0)).unwrap();
        log.open_session_at("ivanov", "Иванов", at(9, 55, 0)).unwrap();
        log.open_session_at("petrova", "Петрова", at(9, 30, 0)).unwrap();
        let closed = log.open_session_at("sidorov", "Сидоров", at(9, 58, 0)).unwrap();
        log.close_session_at(closed, at(9, 59, 0)).unwrap();

        let active = log.active_sessions_at(at(10, 0, 0), ACTIVE_WINDOW).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].username, "ivanov");
        assert_eq!(active[0].login_time, at(9, 55, 0));
    }

    #[test]
    fn test_cleanup_keeps_latest_open_per_user() {
        let log = log();
        let old = log.open_session_at("ivanov", "Иванов", at(8, 0, 0)).unwrap();
        let latest = log.open_session_at("ivanov", "Иванов", at(9, 0, 0)).unwrap();
        let other = log.open_session_at("petrova", "Петрова", at(8, 30, 0)).unwrap();

        assert_eq!(log.cleanup_stale_sessions().unwrap(), 1);

        let old = log.visit(old).unwrap().unwrap();
        assert_eq!(old.logout_time, Some(at(8, 0, 0)));
        assert_eq!(old.duration_minutes, Some(0));
        assert!(log.visit(latest).unwrap().unwrap().is_open());
        assert!(log.visit(other).unwrap().unwrap().is_open());

        assert_eq!(log.cleanup_stale_sessions().unwrap(), 0);
    }

    #[test]
    fn test_visit_stats() {
        let log = log();
        let a = log.open_session_at("ivanov", "Иванов", at(8, 0, 0)).unwrap();
        log.close_session_at(a, at(8, 30, 0)).unwrap();
        let b = log.open_session_at("ivanov", "Иванов И.", at(9, 0, 0)).unwrap();
        log.close_session_at(b, at(9, 15, 0)).unwrap();
        log.open_session_at("petrova", "Петрова", at(9, 55, 0)).unwrap();

        let stats = log.visit_stats_at(at(10, 0, 0), ACTIVE_WINDOW).unwrap();

        assert_eq!(stats.recent.len(), 3);
        assert_eq!(stats.recent[0].username, "petrova");

        assert_eq!(stats.users.len(), 2);
        assert_eq!(stats.users[0].username, "ivanov");
        assert_eq!(stats.users[0].display_name, "Иванов И.");
        assert_eq!(stats.users[0].visit_count, 2);
        assert_eq!(stats.users[0].total_minutes, 45);
        assert_eq!(stats.users[0].last_visit, at(9, 0, 0));
        assert_eq!(stats.users[1].total_minutes, 0);

        assert_eq!(stats.total_visits(), 3);
        assert_eq!(stats.total_minutes(), 45);
        assert_eq!(stats.active.len(), 1);
        assert_eq!(stats.active[0].username, "petrova");
    }

    #[test]
    fn test_recent_visits_limited() {
        let log = log();
        for i in 0..(RECENT_VISITS as u32 + 5) {
            log.open_session_at("ivanov", "Иванов", at(8, 0, 0) + chrono::Duration::seconds(i as i64))
                .unwrap();
        }
        let stats = log.visit_stats_at(at(10, 0, 0), ACTIVE_WINDOW).unwrap();
        assert_eq!(stats.recent.len(), RECENT_VISITS);
        // Cleanup closed all but the latest.
        assert_eq!(stats.recent.iter().filter(|v| v.is_open()).count(), 1);
    }

    #[test]
    fn test_page_views() {
        let log = log();
        log.record_page_view_at("ivanov", "overview", at(9, 0, 0)).unwrap();
        log.record_page_view_at("ivanov", "machines", at(9, 1, 0)).unwrap();

        let views = log.recent_page_views(10).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].page, "machines");
        assert_eq!(views[1].view_time, at(9, 0, 0));

        let stats = log.visit_stats_at(at(10, 0, 0), ACTIVE_WINDOW).unwrap();
        assert_eq!(stats.page_views, views);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("visits.db");

        let id = {
            let log = VisitLog::open(&path).unwrap();
            log.open_session_at("ivanov", "Иванов", at(9, 0, 0)).unwrap()
        };

        let log = VisitLog::open(&path).unwrap();
        assert!(log.close_session_at(id, at(9, 5, 0)).unwrap());
    }
}
