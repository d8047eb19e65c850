//! # millwatch
//!
//! A terminal dashboard for monitoring yarn quality across spinning
//! machines and production batches.
//!
//! Quality measurements (breaking strength, coefficient of variation,
//! linear density and process settings per machine per batch) are read
//! from a Google Sheet or a local JSON export, cached for a configurable
//! time and shown behind a small login gate. Every login is recorded in a
//! SQLite visit log that administrators can review from the dashboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│ │
//! │  │ (state) │    │(metrics) │    │(render) │    │         │ │
//! │  └─┬──┬──┬─┘    └──────────┘    └─────────┘    └─────────┘ │
//! │    │  │  │                                                  │
//! │    │  │  └──────▶ auth (users, session)                     │
//! │    │  └─────────▶ visits (SQLite visit log)                 │
//! │    ▼                                                        │
//! │  ┌──────────────┐                                           │
//! │  │ DatasetCache │◀── SheetsSource | FileSource              │
//! │  └──────────────┘                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, login flow, view navigation
//! - **[`source`]**: Data source abstraction ([`DataSource`] trait), the
//!   sheet and file sources, header normalization and the TTL cache
//! - **[`data`]**: Batch metrics, quality score, thresholds, trends and
//!   the analytics shown by each view
//! - **[`auth`]**: Configured users and the per-run [`Session`]
//! - **[`visits`]**: Login/logout and page-view log with admin statistics
//! - **[`config`]**: Layered settings (file, environment)
//! - **[`ui`]**: Terminal rendering using ratatui
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Read the sheet configured in millwatch.toml
//! millwatch
//!
//! # Read a local export instead
//! millwatch --file quality.json
//!
//! # Write the latest batch report and exit
//! millwatch --file quality.json --export report.json
//! ```
//!
//! ### As a library with file source
//!
//! ```
//! use millwatch::{App, AppOptions, DatasetCache, FileSource, UserDirectory};
//!
//! let cache = DatasetCache::new(Box::new(FileSource::new("quality.json")));
//! let app = App::new(cache, UserDirectory::default(), None, AppOptions::default());
//! ```
//!
//! ### Computing batch metrics
//!
//! ```
//! use millwatch::{PartyMetrics, QualityThresholds, Table};
//!
//! let table = Table::default();
//! let thresholds = QualityThresholds::default();
//! if let Some(batch) = table.latest_batch() {
//!     let metrics = PartyMetrics::calculate(&table.batch(batch), table.columns, &thresholds);
//!     println!("score {}", metrics.quality_score(&thresholds));
//! }
//! ```

pub mod app;
pub mod auth;
pub mod config;
pub mod data;
pub mod events;
pub mod source;
pub mod ui;
pub mod visits;

// Re-export main types for convenience
pub use app::{App, AppOptions, View};
pub use auth::{Role, Session, User, UserDirectory};
pub use config::Settings;
pub use data::{
    BatchReport, PartyMetrics, QualityThresholds, Status, Table, TrendIndicator,
};
pub use source::{DataSource, DatasetCache, FileSource, LoadError, SheetAuth, SheetsSource};
pub use visits::{VisitLog, VisitStats};
