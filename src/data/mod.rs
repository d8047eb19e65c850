//! Data models and quality computations.
//!
//! This module turns a loaded [`Table`] into everything the dashboard shows:
//! batch metrics, pass/fail statuses, trend indicators and cross-batch
//! analytics. All functions here are pure.
//!
//! ## Submodules
//!
//! - [`table`]: The observation table and batch/machine selection helpers
//! - [`quality`]: Thresholds, [`Status`] and the threshold classifier
//! - [`metrics`]: [`PartyMetrics`] for one batch and the quality score
//! - [`trend`]: Short-window trend indicators and sparklines
//! - [`analytics`]: Problem machines, quality map, setting comparisons
//! - [`report`]: Serializable latest-batch report for JSON export
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "30m", "2s")
//!
//! ## Data Flow
//!
//! ```text
//! Table (shared, read-only)
//!        │
//!        ├──▶ Table::batch(latest) ──▶ PartyMetrics::calculate() ──▶ quality_score()
//!        │
//!        ├──▶ machine_history() ──▶ TrendIndicator::from_values()
//!        │
//!        └──▶ analytics (problem machines, quality map, comparisons)
//! ```

pub mod analytics;
pub mod duration;
pub mod metrics;
pub mod quality;
pub mod report;
pub mod table;
pub mod trend;

pub use analytics::{
    MachineRow, ProblemMachine, QualityMap, Setting, SettingComparison, RECENT_BATCHES,
};
pub use metrics::{Metric, PartyMetrics};
pub use quality::{classify, GaugeRange, QualityThresholds, Status, ThresholdRule};
pub use report::BatchReport;
pub use table::{ColumnSet, Observation, Table};
pub use trend::{Arrow, TrendIndicator, TrendRule};
