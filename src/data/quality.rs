//! Quality thresholds and status classification.
//!
//! Every pass/fail decision in the dashboard goes through [`classify`] with a
//! [`ThresholdRule`] supplied by the caller, so the same contract serves
//! per-observation checks, batch averages and gauges.

use serde::Serialize;

use super::table::Observation;

/// Process-wide quality limits.
///
/// These are fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityThresholds {
    /// Minimum acceptable breaking strength, cN/tex.
    pub strength_min: f64,
    /// Maximum acceptable coefficient of variation, %.
    pub cv_max: f64,
    /// Acceptable linear density band, tex (inclusive).
    pub density_range: (f64, f64),
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            strength_min: 270.0,
            cv_max: 9.0,
            density_range: (28.3, 29.5),
        }
    }
}

impl QualityThresholds {
    pub fn strength_rule(&self) -> ThresholdRule {
        ThresholdRule::AtLeast(self.strength_min)
    }

    pub fn cv_rule(&self) -> ThresholdRule {
        ThresholdRule::AtMost(self.cv_max)
    }

    pub fn density_rule(&self) -> ThresholdRule {
        ThresholdRule::Within(self.density_range.0, self.density_range.1)
    }

    /// Midpoint of the density band.
    pub fn density_center(&self) -> f64 {
        (self.density_range.0 + self.density_range.1) / 2.0
    }
}

/// Display range of a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaugeRange {
    pub min: f64,
    pub max: f64,
}

impl GaugeRange {
    pub const STRENGTH: GaugeRange = GaugeRange { min: 200.0, max: 350.0 };
    pub const CV: GaugeRange = GaugeRange { min: 0.0, max: 15.0 };
    pub const DENSITY: GaugeRange = GaugeRange { min: 27.0, max: 31.0 };

    /// Position of `value` within the range as a ratio clamped to [0, 1].
    pub fn ratio(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Status of a value, a machine or a batch.
///
/// Ordered from least to most severe so that `max()` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Status {
    /// No value to judge.
    Unknown,
    Good,
    Warning,
    Bad,
}

impl Status {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Unknown => "◯",
            Status::Good => "OK",
            Status::Warning => "WARN",
            Status::Bad => "BAD",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Unknown => "No data",
            Status::Good => "Good",
            Status::Warning => "Warning",
            Status::Bad => "Bad",
        }
    }
}

/// How a measurement is compared against its limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ThresholdRule {
    /// Greater is better: good iff `value >= threshold`.
    AtLeast(f64),
    /// Less is better: good iff `value <= threshold`.
    AtMost(f64),
    /// Good iff `min <= value <= max`.
    Within(f64, f64),
}

impl ThresholdRule {
    /// Whether a known value satisfies the rule.
    pub fn is_met(&self, value: f64) -> bool {
        match *self {
            ThresholdRule::AtLeast(threshold) => value >= threshold,
            ThresholdRule::AtMost(threshold) => value <= threshold,
            ThresholdRule::Within(min, max) => min <= value && value <= max,
        }
    }
}

/// Classify a measurement against a rule.
///
/// A missing or NaN value is [`Status::Unknown`], never good or bad.
pub fn classify(value: Option<f64>, rule: ThresholdRule) -> Status {
    match value {
        Some(v) if !v.is_nan() => {
            if rule.is_met(v) {
                Status::Good
            } else {
                Status::Bad
            }
        }
        _ => Status::Unknown,
    }
}

/// Combined strength and CV status of one machine in one batch.
///
/// Both compliant is good, exactly one compliant is a warning, neither is
/// bad. A missing CV counts as compliant.
pub fn machine_status(obs: &Observation, thresholds: &QualityThresholds) -> Status {
    let strength_ok = thresholds.strength_rule().is_met(obs.breaking_strength);
    let cv_ok = classify(obs.coefficient_of_variation, thresholds.cv_rule()) != Status::Bad;

    match (strength_ok, cv_ok) {
        (true, true) => Status::Good,
        (true, false) | (false, true) => Status::Warning,
        (false, false) => Status::Bad,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::tests::obs;

    #[test]
    fn test_missing_value_is_unknown_for_every_mode() {
        for rule in [
            ThresholdRule::AtLeast(270.0),
            ThresholdRule::AtMost(9.0),
            ThresholdRule::Within(28.3, 29.5),
        ] {
            assert_eq!(classify(None, rule), Status::Unknown);
            assert_eq!(classify(Some(f64::NAN), rule), Status::Unknown);
        }
    }

    #[test]
    fn test_greater_is_better() {
        let rule = ThresholdRule::AtLeast(270.0);
        assert_eq!(classify(Some(270.0), rule), Status::Good);
        assert_eq!(classify(Some(269.9), rule), Status::Bad);
    }

    #[test]
    fn test_less_is_better() {
        let rule = ThresholdRule::AtMost(9.0);
        assert_eq!(classify(Some(9.0), rule), Status::Good);
        assert_eq!(classify(Some(9.1), rule), Status::Bad);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let rule = QualityThresholds::default().density_rule();
        assert_eq!(classify(Some(28.3), rule), Status::Good);
        assert_eq!(classify(Some(29.5), rule), Status::Good);
        assert_eq!(classify(Some(28.29), rule), Status::Bad);
        assert_eq!(classify(Some(29.51), rule), Status::Bad);
    }

    #[test]
    fn test_status_ordering_worst_last() {
        assert!(Status::Bad > Status::Warning);
        assert!(Status::Warning > Status::Good);
        assert!(Status::Good > Status::Unknown);
    }

    #[test]
    fn test_machine_status() {
        let t = QualityThresholds::default();
        assert_eq!(machine_status(&obs(1, 1, 280.0, 7.0), &t), Status::Good);
        assert_eq!(machine_status(&obs(1, 1, 260.0, 7.0), &t), Status::Warning);
        assert_eq!(machine_status(&obs(1, 1, 280.0, 9.5), &t), Status::Warning);
        assert_eq!(machine_status(&obs(1, 1, 260.0, 9.5), &t), Status::Bad);
    }

    #[test]
    fn test_gauge_ratio_clamped() {
        assert_eq!(GaugeRange::STRENGTH.ratio(275.0), 0.5);
        assert_eq!(GaugeRange::STRENGTH.ratio(100.0), 0.0);
        assert_eq!(GaugeRange::CV.ratio(30.0), 1.0);
    }
}
