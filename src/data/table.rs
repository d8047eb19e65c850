//! In-memory quality table.
//!
//! A [`Table`] is a flat rowset of [`Observation`]s, one per machine per
//! batch. It is produced once by a data source and shared read-only between
//! renders.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// A single machine's measurement within a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub batch_id: i64,
    pub machine_id: i64,
    /// Relative breaking strength, cN/tex.
    pub breaking_strength: f64,
    /// Coefficient of variation, %.
    pub coefficient_of_variation: Option<f64>,
    /// Linear density, tex.
    pub linear_density: Option<f64>,
    /// Plastification draw setting, % (60 or 65).
    pub plastification_draw: Option<f64>,
    /// Forming speed, m/min.
    pub forming_speed: Option<f64>,
}

/// Which optional columns were present in the source data.
///
/// A column can be present while individual cells are blank; that is
/// tracked per observation through `Option` fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSet {
    pub coefficient_of_variation: bool,
    pub linear_density: bool,
    pub plastification_draw: bool,
    pub forming_speed: bool,
}

impl ColumnSet {
    /// All optional columns present.
    pub fn all() -> Self {
        Self {
            coefficient_of_variation: true,
            linear_density: true,
            plastification_draw: true,
            forming_speed: true,
        }
    }
}

/// An ordered collection of observations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    pub rows: Vec<Observation>,
    pub columns: ColumnSet,
}

impl Table {
    pub fn new(rows: Vec<Observation>, columns: ColumnSet) -> Self {
        Self { rows, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Sorted unique batch ids.
    pub fn batches(&self) -> Vec<i64> {
        self.rows
            .iter()
            .map(|r| r.batch_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The highest batch id, i.e. the most recent batch.
    pub fn latest_batch(&self) -> Option<i64> {
        self.rows.iter().map(|r| r.batch_id).max()
    }

    /// All observations belonging to one batch.
    pub fn batch(&self, batch_id: i64) -> Vec<&Observation> {
        self.rows.iter().filter(|r| r.batch_id == batch_id).collect()
    }

    /// The ids of the last `n` batches, oldest first.
    pub fn last_batch_ids(&self, n: usize) -> Vec<i64> {
        let batches = self.batches();
        let skip = batches.len().saturating_sub(n);
        batches.into_iter().skip(skip).collect()
    }

    /// All observations from the last `n` batches.
    pub fn last_batches(&self, n: usize) -> Vec<&Observation> {
        let ids: BTreeSet<i64> = self.last_batch_ids(n).into_iter().collect();
        self.rows.iter().filter(|r| ids.contains(&r.batch_id)).collect()
    }

    /// Sorted unique machine ids seen in the last `n` batches.
    pub fn machines_in_last(&self, n: usize) -> Vec<i64> {
        self.last_batches(n)
            .into_iter()
            .map(|r| r.machine_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// One machine's observations from the last `n` batches, ordered by batch.
    pub fn machine_history(&self, machine_id: i64, n: usize) -> Vec<&Observation> {
        let mut rows: Vec<&Observation> = self
            .last_batches(n)
            .into_iter()
            .filter(|r| r.machine_id == machine_id)
            .collect();
        rows.sort_by_key(|r| r.batch_id);
        rows
    }

    /// (batch, machine) pairs that occur more than once.
    ///
    /// Duplicates are a data-quality anomaly in the source sheet. They are
    /// reported, never merged.
    pub fn duplicate_keys(&self) -> Vec<(i64, i64)> {
        let mut counts: BTreeMap<(i64, i64), usize> = BTreeMap::new();
        for row in &self.rows {
            *counts.entry((row.batch_id, row.machine_id)).or_default() += 1;
        }
        counts.into_iter().filter(|(_, c)| *c > 1).map(|(k, _)| k).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn obs(batch: i64, machine: i64, strength: f64, cv: f64) -> Observation {
        Observation {
            batch_id: batch,
            machine_id: machine,
            breaking_strength: strength,
            coefficient_of_variation: Some(cv),
            linear_density: None,
            plastification_draw: None,
            forming_speed: None,
        }
    }

    fn sample() -> Table {
        Table::new(
            vec![
                obs(716, 1, 280.0, 7.0),
                obs(715, 1, 270.0, 8.0),
                obs(717, 2, 290.0, 6.0),
                obs(716, 2, 275.0, 9.5),
                obs(717, 1, 265.0, 7.5),
            ],
            ColumnSet::default(),
        )
    }

    #[test]
    fn test_batches_sorted_unique() {
        let table = sample();
        assert_eq!(table.batches(), vec![715, 716, 717]);
        assert_eq!(table.latest_batch(), Some(717));
    }

    #[test]
    fn test_last_batches() {
        let table = sample();
        assert_eq!(table.last_batch_ids(2), vec![716, 717]);
        assert_eq!(table.last_batches(2).len(), 4);
        assert_eq!(table.last_batch_ids(10).len(), 3);
    }

    #[test]
    fn test_machine_history_ordered_by_batch() {
        let table = sample();
        let history = table.machine_history(1, 10);
        let batches: Vec<i64> = history.iter().map(|r| r.batch_id).collect();
        assert_eq!(batches, vec![715, 716, 717]);
    }

    #[test]
    fn test_duplicate_keys() {
        let mut table = sample();
        assert!(table.duplicate_keys().is_empty());
        table.rows.push(obs(717, 2, 291.0, 6.1));
        assert_eq!(table.duplicate_keys(), vec![(717, 2)]);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::default();
        assert!(table.is_empty());
        assert_eq!(table.latest_batch(), None);
        assert!(table.last_batch_ids(5).is_empty());
    }
}
