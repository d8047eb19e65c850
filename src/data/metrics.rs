//! Batch ("party") metrics and the composite quality score.

use serde::Serialize;

use super::quality::{GaugeRange, QualityThresholds};
use super::table::{ColumnSet, Observation};

/// Weights of the composite quality score.
const STRENGTH_WEIGHT: f64 = 0.40;
const CV_WEIGHT: f64 = 0.35;
const DENSITY_WEIGHT: f64 = 0.25;

/// Score given to a metric that cannot be judged.
const NEUTRAL_SCORE: f64 = 50.0;

/// Score points lost per tex of density deviation from the band center.
const DENSITY_PENALTY_PER_TEX: f64 = 50.0;

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Aggregate pass/fail metrics for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartyMetrics {
    /// Mean breaking strength, 1 decimal.
    pub avg_strength: f64,
    /// Mean CV, 1 decimal. `None` when no row carries a CV value.
    pub avg_cv: Option<f64>,
    /// Mean density, 2 decimals. `0` when the density column is absent.
    pub avg_density: f64,
    pub total_machines: usize,
    pub low_strength_count: usize,
    pub high_cv_count: usize,
    pub bad_density_count: usize,
}

/// Which metric a gauge or count refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Strength,
    Cv,
    Density,
}

impl PartyMetrics {
    /// Compute metrics for the observations of one batch.
    ///
    /// An empty slice yields zeroed metrics rather than an error.
    pub fn calculate(
        rows: &[&Observation],
        columns: ColumnSet,
        thresholds: &QualityThresholds,
    ) -> Self {
        if rows.is_empty() {
            return Self::default();
        }

        let avg_strength = mean(rows.iter().map(|r| r.breaking_strength))
            .map(|v| round_to(v, 1))
            .unwrap_or_default();
        let avg_cv = mean(rows.iter().filter_map(|r| r.coefficient_of_variation))
            .map(|v| round_to(v, 1));

        let low_strength_count =
            rows.iter().filter(|r| r.breaking_strength < thresholds.strength_min).count();
        let high_cv_count = rows
            .iter()
            .filter_map(|r| r.coefficient_of_variation)
            .filter(|cv| *cv > thresholds.cv_max)
            .count();

        let (avg_density, bad_density_count) = if columns.linear_density {
            let (min, max) = thresholds.density_range;
            let avg = mean(rows.iter().filter_map(|r| r.linear_density))
                .map(|v| round_to(v, 2))
                .unwrap_or_default();
            let bad = rows
                .iter()
                .filter_map(|r| r.linear_density)
                .filter(|d| *d < min || *d > max)
                .count();
            (avg, bad)
        } else {
            (0.0, 0)
        };

        Self {
            avg_strength,
            avg_cv,
            avg_density,
            total_machines: rows.len(),
            low_strength_count,
            high_cv_count,
            bad_density_count,
        }
    }

    /// Number of observations meeting the limit for `metric`.
    pub fn good_count(&self, metric: Metric) -> usize {
        let bad = match metric {
            Metric::Strength => self.low_strength_count,
            Metric::Cv => self.high_cv_count,
            Metric::Density => self.bad_density_count,
        };
        self.total_machines.saturating_sub(bad)
    }

    /// Sum of all threshold violations.
    pub fn total_issues(&self) -> usize {
        self.low_strength_count + self.high_cv_count + self.bad_density_count
    }

    /// Composite quality index in [0, 100], 1 decimal.
    pub fn quality_score(&self, thresholds: &QualityThresholds) -> f64 {
        let strength = GaugeRange::STRENGTH;
        let strength_score = ((self.avg_strength - strength.min) / (strength.max - strength.min)
            * 100.0)
            .clamp(0.0, 100.0);

        let cv_max = GaugeRange::CV.max;
        let cv_score = self
            .avg_cv
            .map(|cv| ((cv_max - cv) / cv_max * 100.0).clamp(0.0, 100.0))
            .unwrap_or(NEUTRAL_SCORE);

        let density_score = if self.avg_density > 0.0 {
            let deviation = (self.avg_density - thresholds.density_center()).abs();
            (100.0 - deviation * DENSITY_PENALTY_PER_TEX).max(0.0)
        } else {
            NEUTRAL_SCORE
        };

        round_to(
            strength_score * STRENGTH_WEIGHT + cv_score * CV_WEIGHT + density_score * DENSITY_WEIGHT,
            1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::quality::{classify, Status, ThresholdRule};
    use crate::data::table::tests::obs;

    fn with_density(mut o: Observation, density: f64) -> Observation {
        o.linear_density = Some(density);
        o
    }

    #[test]
    fn test_low_strength_count() {
        let rows = [obs(1, 1, 260.0, 7.0), obs(1, 2, 280.0, 7.0), obs(1, 3, 290.0, 7.0)];
        let refs: Vec<&Observation> = rows.iter().collect();
        let m = PartyMetrics::calculate(&refs, ColumnSet::all(), &QualityThresholds::default());
        assert_eq!(m.low_strength_count, 1);
        assert_eq!(m.total_machines, 3);
        assert_eq!(m.avg_strength, 276.7);
    }

    #[test]
    fn test_counts_partition_the_batch() {
        let rows = [
            with_density(obs(1, 1, 260.0, 9.5), 28.0),
            with_density(obs(1, 2, 270.0, 9.0), 28.3),
            with_density(obs(1, 3, 300.0, 4.0), 29.6),
            with_density(obs(1, 4, 269.9, 9.01), 29.5),
        ];
        let refs: Vec<&Observation> = rows.iter().collect();
        let m = PartyMetrics::calculate(&refs, ColumnSet::all(), &QualityThresholds::default());

        assert_eq!(m.low_strength_count, 2);
        assert_eq!(m.high_cv_count, 2);
        assert_eq!(m.bad_density_count, 2);
        let t = QualityThresholds::default();
        let checks: [(Metric, ThresholdRule, fn(&Observation) -> Option<f64>); 3] = [
            (Metric::Strength, t.strength_rule(), |o| Some(o.breaking_strength)),
            (Metric::Cv, t.cv_rule(), |o| o.coefficient_of_variation),
            (Metric::Density, t.density_rule(), |o| o.linear_density),
        ];
        for (metric, rule, value) in checks {
            let good = rows
                .iter()
                .filter(|o| classify(value(*o), rule) == Status::Good)
                .count();
            assert_eq!(m.good_count(metric), good, "{:?}", metric);
        }
        assert_eq!(m.total_issues(), 6);
    }

    #[test]
    fn test_density_column_absent() {
        let rows = [obs(1, 1, 280.0, 7.0)];
        let refs: Vec<&Observation> = rows.iter().collect();
        let m = PartyMetrics::calculate(&refs, ColumnSet::default(), &QualityThresholds::default());
        assert_eq!(m.avg_density, 0.0);
        assert_eq!(m.bad_density_count, 0);
    }

    #[test]
    fn test_rounding_precision() {
        let rows = [
            with_density(obs(1, 1, 280.04, 7.04), 28.902),
            with_density(obs(1, 2, 280.0, 7.0), 28.9),
        ];
        let refs: Vec<&Observation> = rows.iter().collect();
        let m = PartyMetrics::calculate(&refs, ColumnSet::all(), &QualityThresholds::default());
        assert_eq!(m.avg_strength, 280.0);
        assert_eq!(m.avg_cv, Some(7.0));
        assert_eq!(m.avg_density, 28.9);
    }

    #[test]
    fn test_empty_batch_is_zeroed() {
        let m = PartyMetrics::calculate(&[], ColumnSet::all(), &QualityThresholds::default());
        assert_eq!(m, PartyMetrics::default());
        assert!(m.quality_score(&QualityThresholds::default()).is_finite());
    }

    #[test]
    fn test_quality_score_formula() {
        let m = PartyMetrics {
            avg_strength: 275.0,
            avg_cv: Some(7.5),
            avg_density: 28.9,
            total_machines: 10,
            ..Default::default()
        };
        // 50 * 0.40 + 50 * 0.35 + 100 * 0.25
        assert_eq!(m.quality_score(&QualityThresholds::default()), 62.5);
    }

    #[test]
    fn test_quality_score_neutral_density() {
        let m = PartyMetrics {
            avg_strength: 350.0,
            avg_cv: Some(0.0),
            avg_density: 0.0,
            ..Default::default()
        };
        assert_eq!(m.quality_score(&QualityThresholds::default()), 87.5);
    }

    #[test]
    fn test_quality_score_monotonic() {
        let t = QualityThresholds::default();
        let base = PartyMetrics {
            avg_strength: 200.0,
            avg_cv: Some(8.0),
            avg_density: 29.0,
            ..Default::default()
        };

        let mut previous = f64::MIN;
        for strength in (180..=370).step_by(5) {
            let m = PartyMetrics { avg_strength: strength as f64, ..base.clone() };
            let score = m.quality_score(&t);
            assert!(score >= previous);
            previous = score;
        }

        let mut previous = f64::MAX;
        for tenth in 0..=200 {
            let m = PartyMetrics { avg_cv: Some(tenth as f64 / 10.0), ..base.clone() };
            let score = m.quality_score(&t);
            assert!(score <= previous);
            previous = score;
        }
    }
}
