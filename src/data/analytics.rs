//! Cross-batch analytics: batch trend, problem machines, quality map and
//! process-setting comparisons.

use std::collections::BTreeMap;

use serde::Serialize;

use super::metrics::round_to;
use super::quality::{machine_status, QualityThresholds, Status};
use super::table::{Observation, Table};
use super::trend::{TrendIndicator, TrendRule};

/// Number of batches shown in the batch trend and problem ranking.
pub const RECENT_BATCHES: usize = 10;

/// Maximum number of machines in the problem ranking.
const TOP_PROBLEM_MACHINES: usize = 10;

/// Tolerance when matching a setting value such as a forming speed.
const SETTING_TOLERANCE: f64 = 1e-6;

/// Mean breaking strength per batch, rounded to 1 decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPoint {
    pub batch_id: i64,
    pub avg_strength: f64,
}

/// Mean strength of each of the last `n` batches, oldest first.
pub fn batch_trend(table: &Table, n: usize) -> Vec<BatchPoint> {
    table
        .last_batch_ids(n)
        .into_iter()
        .map(|batch_id| {
            let rows = table.batch(batch_id);
            let sum: f64 = rows.iter().map(|r| r.breaking_strength).sum();
            BatchPoint {
                batch_id,
                avg_strength: round_to(sum / rows.len().max(1) as f64, 1),
            }
        })
        .collect()
}

/// A machine with repeated threshold violations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemMachine {
    pub machine_id: i64,
    pub low_strength: usize,
    pub high_cv: usize,
}

impl ProblemMachine {
    pub fn total(&self) -> usize {
        self.low_strength + self.high_cv
    }

    /// Four or more deviations is critical, two or more needs attention.
    pub fn severity(&self) -> Status {
        match self.total() {
            n if n >= 4 => Status::Bad,
            n if n >= 2 => Status::Warning,
            _ => Status::Good,
        }
    }
}

/// Machines ranked by strength and CV deviations over the last `n` batches.
///
/// Machines without deviations are left out; at most ten are returned.
pub fn problem_machines(
    table: &Table,
    n: usize,
    thresholds: &QualityThresholds,
) -> Vec<ProblemMachine> {
    let mut per_machine: BTreeMap<i64, ProblemMachine> = BTreeMap::new();

    for row in table.last_batches(n) {
        let entry = per_machine.entry(row.machine_id).or_insert(ProblemMachine {
            machine_id: row.machine_id,
            low_strength: 0,
            high_cv: 0,
        });
        if row.breaking_strength < thresholds.strength_min {
            entry.low_strength += 1;
        }
        if row.coefficient_of_variation.is_some_and(|cv| cv > thresholds.cv_max) {
            entry.high_cv += 1;
        }
    }

    let mut ranked: Vec<ProblemMachine> =
        per_machine.into_values().filter(|m| m.total() > 0).collect();
    // stable sort keeps machine order for equal totals
    ranked.sort_by(|a, b| b.total().cmp(&a.total()));
    ranked.truncate(TOP_PROBLEM_MACHINES);
    ranked
}

/// One point of the per-batch quality map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub machine_id: i64,
    pub strength: f64,
    pub cv: Option<f64>,
    pub status: Status,
}

/// Quality map of one batch with status tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityMap {
    pub batch_id: i64,
    pub points: Vec<MapPoint>,
    pub good: usize,
    pub warning: usize,
    pub bad: usize,
}

impl QualityMap {
    pub fn build(table: &Table, batch_id: i64, thresholds: &QualityThresholds) -> Self {
        let mut map = QualityMap {
            batch_id,
            ..Default::default()
        };

        for row in table.batch(batch_id) {
            let status = machine_status(row, thresholds);
            match status {
                Status::Good => map.good += 1,
                Status::Warning => map.warning += 1,
                Status::Bad => map.bad += 1,
                Status::Unknown => {}
            }
            map.points.push(MapPoint {
                machine_id: row.machine_id,
                strength: row.breaking_strength,
                cv: row.coefficient_of_variation,
                status,
            });
        }

        map.points.sort_by(|a, b| b.status.cmp(&a.status).then(a.machine_id.cmp(&b.machine_id)));
        map
    }
}

/// A categorical process setting two groups of machines can differ in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Setting {
    PlastificationDraw,
    FormingSpeed,
}

impl Setting {
    pub fn value(&self, row: &Observation) -> Option<f64> {
        match self {
            Setting::PlastificationDraw => row.plastification_draw,
            Setting::FormingSpeed => row.forming_speed,
        }
    }

    pub fn is_present(&self, table: &Table) -> bool {
        match self {
            Setting::PlastificationDraw => table.columns.plastification_draw,
            Setting::FormingSpeed => table.columns.forming_speed,
        }
    }

    /// The two values compared on the dashboard.
    pub fn compared_values(&self) -> (f64, f64) {
        match self {
            Setting::PlastificationDraw => (60.0, 65.0),
            Setting::FormingSpeed => (16.4, 18.8),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Setting::PlastificationDraw => "Plastification draw, %",
            Setting::FormingSpeed => "Forming speed, m/min",
        }
    }

    fn matches(&self, row: &Observation, target: f64) -> bool {
        self.value(row).is_some_and(|v| (v - target).abs() < SETTING_TOLERANCE)
    }
}

/// Mean strength and CV of the rows sharing one setting value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroupStats {
    pub strength: Option<f64>,
    pub cv: Option<f64>,
    pub count: usize,
}

impl GroupStats {
    fn collect<'a>(rows: impl Iterator<Item = &'a Observation>) -> Self {
        let rows: Vec<&Observation> = rows.collect();
        if rows.is_empty() {
            return Self::default();
        }
        let strength = rows.iter().map(|r| r.breaking_strength).sum::<f64>() / rows.len() as f64;
        let cvs: Vec<f64> = rows.iter().filter_map(|r| r.coefficient_of_variation).collect();
        let cv = (!cvs.is_empty()).then(|| cvs.iter().sum::<f64>() / cvs.len() as f64);
        Self {
            strength: Some(round_to(strength, 1)),
            cv: cv.map(|v| round_to(v, 1)),
            count: rows.len(),
        }
    }
}

/// Comparison of the two setting values over one window of batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Number of most recent batches in the window.
    pub window: usize,
    pub first: GroupStats,
    pub second: GroupStats,
}

impl ComparisonRow {
    /// Strength difference, second minus first. Positive is an improvement.
    pub fn strength_delta(&self) -> Option<f64> {
        Some(round_to(self.second.strength? - self.first.strength?, 1))
    }

    /// CV difference, second minus first. Negative is an improvement.
    pub fn cv_delta(&self) -> Option<f64> {
        Some(round_to(self.second.cv? - self.first.cv?, 1))
    }
}

/// Full comparison table for one setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingComparison {
    pub setting: Setting,
    pub values: (f64, f64),
    /// Distinct machines on each value in the latest batch.
    pub machines: (usize, usize),
    pub rows: Vec<ComparisonRow>,
}

/// Windows (in batches) compared on the dashboard.
pub const COMPARISON_WINDOWS: [usize; 3] = [1, 3, 10];

impl SettingComparison {
    /// Compare the two values of `setting`.
    ///
    /// Returns `None` when the setting's column is missing from the source.
    /// A window longer than the available history yields empty groups.
    pub fn build(table: &Table, setting: Setting) -> Option<Self> {
        if !setting.is_present(table) {
            return None;
        }
        let (a, b) = setting.compared_values();
        let available = table.batches().len();

        let rows = COMPARISON_WINDOWS
            .iter()
            .map(|&window| {
                if available < window {
                    return ComparisonRow {
                        window,
                        first: GroupStats::default(),
                        second: GroupStats::default(),
                    };
                }
                let rows = table.last_batches(window);
                ComparisonRow {
                    window,
                    first: GroupStats::collect(rows.iter().copied().filter(|r| setting.matches(r, a))),
                    second: GroupStats::collect(rows.iter().copied().filter(|r| setting.matches(r, b))),
                }
            })
            .collect();

        let latest = table.latest_batch().map(|id| table.batch(id)).unwrap_or_default();
        let distinct = |target: f64| {
            let mut ids: Vec<i64> = latest
                .iter()
                .filter(|r| setting.matches(r, target))
                .map(|r| r.machine_id)
                .collect();
            ids.sort_unstable();
            ids.dedup();
            ids.len()
        };

        Some(Self {
            setting,
            values: (a, b),
            machines: (distinct(a), distinct(b)),
            rows,
        })
    }
}

/// One machine's recent strength and CV with trend indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineRow {
    pub machine_id: i64,
    pub batches: Vec<i64>,
    pub strength: Vec<f64>,
    pub cv: Vec<f64>,
    pub strength_trend: TrendIndicator,
    pub cv_trend: TrendIndicator,
}

/// Per-machine rows for every machine seen in the last `n` batches.
pub fn machine_rows(table: &Table, n: usize) -> Vec<MachineRow> {
    table
        .machines_in_last(n)
        .into_iter()
        .map(|machine_id| {
            let history = table.machine_history(machine_id, n);
            let strength: Vec<f64> = history.iter().map(|r| r.breaking_strength).collect();
            let cv: Vec<f64> = history.iter().filter_map(|r| r.coefficient_of_variation).collect();
            MachineRow {
                machine_id,
                batches: history.iter().map(|r| r.batch_id).collect(),
                strength_trend: TrendIndicator::from_values(&strength, &TrendRule::strength()),
                cv_trend: TrendIndicator::from_values(&cv, &TrendRule::cv()),
                strength,
                cv,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::tests::obs;
    use crate::data::table::ColumnSet;

    fn with_settings(mut o: Observation, draw: f64, speed: f64) -> Observation {
        o.plastification_draw = Some(draw);
        o.forming_speed = Some(speed);
        o
    }

    fn table() -> Table {
        Table::new(
            vec![
                with_settings(obs(1, 1, 260.0, 9.5), 60.0, 16.4),
                with_settings(obs(1, 2, 280.0, 7.0), 65.0, 18.8),
                with_settings(obs(2, 1, 265.0, 9.2), 60.0, 16.4),
                with_settings(obs(2, 2, 284.0, 6.0), 65.0, 18.8),
                with_settings(obs(3, 1, 268.0, 8.0), 60.0, 16.4),
                with_settings(obs(3, 2, 290.0, 6.0), 65.0, 18.8),
                with_settings(obs(3, 3, 300.0, 5.0), 65.0, 18.8),
            ],
            ColumnSet::all(),
        )
    }

    #[test]
    fn test_batch_trend() {
        let trend = batch_trend(&table(), 2);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0], BatchPoint { batch_id: 2, avg_strength: 274.5 });
        assert_eq!(trend[1].batch_id, 3);
    }

    #[test]
    fn test_problem_machines_ranked() {
        let ranked = problem_machines(&table(), 10, &QualityThresholds::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].machine_id, 1);
        assert_eq!(ranked[0].low_strength, 3);
        assert_eq!(ranked[0].high_cv, 2);
        assert_eq!(ranked[0].severity(), Status::Bad);
    }

    #[test]
    fn test_quality_map_tallies() {
        let map = QualityMap::build(&table(), 1, &QualityThresholds::default());
        assert_eq!((map.good, map.warning, map.bad), (1, 0, 1));
        assert_eq!(map.points[0].machine_id, 1);
        assert_eq!(map.points[0].status, Status::Bad);
    }

    #[test]
    fn test_setting_comparison() {
        let cmp = SettingComparison::build(&table(), Setting::PlastificationDraw).unwrap();
        assert_eq!(cmp.machines, (1, 2));

        let last = &cmp.rows[0];
        assert_eq!(last.window, 1);
        assert_eq!(last.first.strength, Some(268.0));
        assert_eq!(last.second.strength, Some(295.0));
        assert_eq!(last.strength_delta(), Some(27.0));
        assert_eq!(last.cv_delta(), Some(-2.5));

        // only three batches exist, so the ten-batch window is empty
        let ten = &cmp.rows[2];
        assert_eq!(ten.first.count, 0);
        assert_eq!(ten.strength_delta(), None);
    }

    #[test]
    fn test_speed_comparison_tolerates_float_noise() {
        let mut t = table();
        t.rows[5].forming_speed = Some(18.800000000001);
        let cmp = SettingComparison::build(&t, Setting::FormingSpeed).unwrap();
        assert_eq!(cmp.machines, (1, 2));
    }

    #[test]
    fn test_missing_setting_column() {
        let mut t = table();
        t.columns.forming_speed = false;
        assert!(SettingComparison::build(&t, Setting::FormingSpeed).is_none());
    }

    #[test]
    fn test_machine_rows() {
        let rows = machine_rows(&table(), 5);
        assert_eq!(rows.len(), 3);
        let first = &rows[0];
        assert_eq!(first.strength, vec![260.0, 265.0, 268.0]);
        assert_eq!(first.strength_trend.status(), Status::Bad);
        assert_eq!(rows[2].batches, vec![3]);
    }
}
