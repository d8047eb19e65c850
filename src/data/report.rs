//! Serializable snapshot of the latest batch, used by `--export` and the
//! in-app export key.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use super::analytics::{
    batch_trend, machine_rows, problem_machines, BatchPoint, MachineRow, ProblemMachine,
    QualityMap, Setting, SettingComparison, RECENT_BATCHES,
};
use super::metrics::PartyMetrics;
use super::quality::{classify, QualityThresholds, Status};
use super::table::Table;

/// Number of batches in the per-machine preview.
pub const MACHINE_PREVIEW_BATCHES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MetricStatuses {
    pub strength: Status,
    pub cv: Status,
    pub density: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: i64,
    /// Batch number as shown to operators.
    pub batch_label: String,
    pub metrics: PartyMetrics,
    pub quality_score: f64,
    pub statuses: MetricStatuses,
    pub batch_trend: Vec<BatchPoint>,
    pub problem_machines: Vec<ProblemMachine>,
    pub quality_map: QualityMap,
    pub comparisons: Vec<SettingComparison>,
    pub machines: Vec<MachineRow>,
}

impl BatchReport {
    /// Report on the latest batch, or `None` for an empty table.
    pub fn latest(table: &Table, thresholds: &QualityThresholds, display_offset: i64) -> Option<Self> {
        let batch_id = table.latest_batch()?;
        let rows = table.batch(batch_id);
        let metrics = PartyMetrics::calculate(&rows, table.columns, thresholds);

        let statuses = MetricStatuses {
            strength: classify(Some(metrics.avg_strength), thresholds.strength_rule()),
            cv: classify(metrics.avg_cv, thresholds.cv_rule()),
            density: if table.columns.linear_density {
                classify(Some(metrics.avg_density), thresholds.density_rule())
            } else {
                Status::Unknown
            },
        };

        Some(Self {
            batch_id,
            batch_label: (batch_id - display_offset).to_string(),
            quality_score: metrics.quality_score(thresholds),
            metrics,
            statuses,
            batch_trend: batch_trend(table, RECENT_BATCHES),
            problem_machines: problem_machines(table, RECENT_BATCHES, thresholds),
            quality_map: QualityMap::build(table, batch_id, thresholds),
            comparisons: [Setting::PlastificationDraw, Setting::FormingSpeed]
                .into_iter()
                .filter_map(|s| SettingComparison::build(table, s))
                .collect(),
            machines: machine_rows(table, MACHINE_PREVIEW_BATCHES),
        })
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Cannot create {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Build and write the latest-batch report.
pub fn export(table: &Table, thresholds: &QualityThresholds, display_offset: i64, path: &Path) -> Result<()> {
    let Some(report) = BatchReport::latest(table, thresholds, display_offset) else {
        bail!("No data to export");
    };
    report.write_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::tests::obs;
    use crate::data::ColumnSet;
    use tempfile::TempDir;

    fn table() -> Table {
        let columns = ColumnSet {
            coefficient_of_variation: true,
            ..Default::default()
        };
        Table::new(
            vec![
                obs(715, 1, 280.0, 7.0),
                obs(716, 1, 275.0, 8.0),
                obs(716, 2, 260.0, 9.5),
            ],
            columns,
        )
    }

    #[test]
    fn test_latest_report() {
        let report = BatchReport::latest(&table(), &QualityThresholds::default(), 714).unwrap();
        assert_eq!(report.batch_id, 716);
        assert_eq!(report.batch_label, "2");
        assert_eq!(report.metrics.total_machines, 2);
        assert_eq!(report.metrics.avg_strength, 267.5);
        assert_eq!(report.statuses.strength, Status::Bad);
        assert_eq!(report.statuses.cv, Status::Good);
        assert_eq!(report.statuses.density, Status::Unknown);
        assert_eq!(report.batch_trend.len(), 2);
        assert_eq!(report.problem_machines[0].machine_id, 2);
        assert!(report.comparisons.is_empty());
    }

    #[test]
    fn test_empty_table_has_no_report() {
        assert!(BatchReport::latest(&Table::default(), &QualityThresholds::default(), 714).is_none());
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        assert!(export(&Table::default(), &QualityThresholds::default(), 714, &path).is_err());
    }

    #[test]
    fn test_export_writes_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        export(&table(), &QualityThresholds::default(), 714, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["batch_id"], 716);
        assert_eq!(value["statuses"]["strength"], "Bad");
        assert_eq!(value["machines"].as_array().unwrap().len(), 2);
    }
}
