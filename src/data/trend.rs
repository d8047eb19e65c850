//! Short-window trend indicators and sparklines.
//!
//! A trend indicator collapses the most recent values of one metric (most
//! recent last) into a rounded mean, a three-level status and a direction
//! arrow. Everything metric-specific lives in a [`TrendRule`].

use serde::Serialize;

use super::metrics::round_to;
use super::quality::Status;

/// Number of most recent values that make up the mean and status.
pub const MEAN_WINDOW: usize = 5;

/// Number of most recent values the arrow is computed from.
pub const ARROW_WINDOW: usize = 3;

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Three-level status bands for a metric.
///
/// For [`Direction::HigherIsBetter`]: below `bad` is bad, below `good` is a
/// warning, anything else is good. For [`Direction::LowerIsBetter`]: above
/// `bad` is bad, at or above `good` is a warning, anything else is good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusBands {
    pub direction: Direction,
    pub bad: f64,
    pub good: f64,
}

impl StatusBands {
    pub fn status(&self, value: f64) -> Status {
        match self.direction {
            Direction::HigherIsBetter => {
                if value < self.bad {
                    Status::Bad
                } else if value < self.good {
                    Status::Warning
                } else {
                    Status::Good
                }
            }
            Direction::LowerIsBetter => {
                if value > self.bad {
                    Status::Bad
                } else if value >= self.good {
                    Status::Warning
                } else {
                    Status::Good
                }
            }
        }
    }
}

/// Per-metric trend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendRule {
    pub bands: StatusBands,
    /// Changes within this absolute amount are flat.
    pub dead_zone: f64,
    /// Decimal places of the reported mean.
    pub decimals: u32,
}

impl TrendRule {
    /// Breaking strength: bad below 270, good from 280, dead zone ±2.
    pub fn strength() -> Self {
        Self {
            bands: StatusBands {
                direction: Direction::HigherIsBetter,
                bad: 270.0,
                good: 280.0,
            },
            dead_zone: 2.0,
            decimals: 1,
        }
    }

    /// Coefficient of variation: bad above 9, good below 6.5, dead zone ±0.3.
    pub fn cv() -> Self {
        Self {
            bands: StatusBands {
                direction: Direction::LowerIsBetter,
                bad: 9.0,
                good: 6.5,
            },
            dead_zone: 0.3,
            decimals: 1,
        }
    }

    fn arrow(&self, first: f64, last: f64) -> Arrow {
        let (improved, worsened) = match self.bands.direction {
            Direction::HigherIsBetter => {
                (last > first + self.dead_zone, last < first - self.dead_zone)
            }
            Direction::LowerIsBetter => {
                (last < first - self.dead_zone, last > first + self.dead_zone)
            }
        };

        if improved {
            Arrow::Up
        } else if worsened {
            Arrow::Down
        } else {
            Arrow::Flat
        }
    }
}

/// Direction of a trend in terms of quality, not raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arrow {
    /// Improving.
    Up,
    /// Getting worse.
    Down,
    Flat,
}

impl Arrow {
    pub fn symbol(&self) -> &'static str {
        match self {
            Arrow::Up => "↑",
            Arrow::Down => "↓",
            Arrow::Flat => "→",
        }
    }
}

/// Result of summarizing a series of recent values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TrendIndicator {
    NoData,
    Reading { mean: f64, status: Status, arrow: Arrow },
}

impl TrendIndicator {
    /// Summarize `values` (most recent last) under `rule`.
    pub fn from_values(values: &[f64], rule: &TrendRule) -> Self {
        if values.is_empty() {
            return TrendIndicator::NoData;
        }

        let window = &values[values.len().saturating_sub(MEAN_WINDOW)..];
        let mean = round_to(window.iter().sum::<f64>() / window.len() as f64, rule.decimals);
        let status = rule.bands.status(mean);

        let arrow = if window.len() >= ARROW_WINDOW {
            let recent = &window[window.len() - ARROW_WINDOW..];
            rule.arrow(recent[0], recent[ARROW_WINDOW - 1])
        } else {
            Arrow::Flat
        };

        TrendIndicator::Reading { mean, status, arrow }
    }

    pub fn status(&self) -> Status {
        match self {
            TrendIndicator::NoData => Status::Unknown,
            TrendIndicator::Reading { status, .. } => *status,
        }
    }

    /// Short text such as `276.7 ↑`, or `—` without data.
    pub fn display(&self) -> String {
        match self {
            TrendIndicator::NoData => "—".to_string(),
            TrendIndicator::Reading { mean, arrow, .. } => {
                format!("{} {}", mean, arrow.symbol())
            }
        }
    }
}

/// Normalize values to 0-7 for an eight-level sparkline.
///
/// Returns an empty Vec for an empty series. A constant series maps to the
/// middle level.
pub fn sparkline(values: &[f64]) -> Vec<u8> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    finite
        .iter()
        .map(|&v| {
            if range <= f64::EPSILON {
                3
            } else {
                let normalized = ((v - min) / range * 7.0).round() as u8;
                normalized.min(7)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_no_data() {
        assert_eq!(TrendIndicator::from_values(&[], &TrendRule::strength()), TrendIndicator::NoData);
        assert_eq!(TrendIndicator::from_values(&[], &TrendRule::cv()), TrendIndicator::NoData);
        assert_eq!(TrendIndicator::NoData.status(), Status::Unknown);
    }

    #[test]
    fn test_strength_rising_warning() {
        let t = TrendIndicator::from_values(&[275.0, 276.0, 279.0], &TrendRule::strength());
        assert_eq!(
            t,
            TrendIndicator::Reading {
                mean: 276.7,
                status: Status::Warning,
                arrow: Arrow::Up
            }
        );
    }

    #[test]
    fn test_only_last_five_in_mean() {
        let values = [100.0, 100.0, 290.0, 290.0, 290.0, 290.0, 290.0];
        let t = TrendIndicator::from_values(&values, &TrendRule::strength());
        assert_eq!(
            t,
            TrendIndicator::Reading {
                mean: 290.0,
                status: Status::Good,
                arrow: Arrow::Flat
            }
        );
    }

    #[test]
    fn test_arrow_uses_last_three() {
        // first of the last three is 280, last is 270: down despite the
        // earlier low values.
        let values = [250.0, 250.0, 280.0, 275.0, 270.0];
        let t = TrendIndicator::from_values(&values, &TrendRule::strength());
        match t {
            TrendIndicator::Reading { arrow, .. } => assert_eq!(arrow, Arrow::Down),
            TrendIndicator::NoData => panic!("expected a reading"),
        }
    }

    #[test]
    fn test_strength_dead_zone() {
        let t = TrendIndicator::from_values(&[280.0, 281.0, 282.0], &TrendRule::strength());
        assert!(matches!(t, TrendIndicator::Reading { arrow: Arrow::Flat, .. }));
    }

    #[test]
    fn test_fewer_than_three_is_flat() {
        let t = TrendIndicator::from_values(&[250.0, 300.0], &TrendRule::strength());
        assert!(matches!(t, TrendIndicator::Reading { arrow: Arrow::Flat, mean, .. } if mean == 275.0));
    }

    #[test]
    fn test_cv_improvement_is_up() {
        let t = TrendIndicator::from_values(&[8.0, 7.5, 7.0], &TrendRule::cv());
        assert_eq!(
            t,
            TrendIndicator::Reading {
                mean: 7.5,
                status: Status::Warning,
                arrow: Arrow::Up
            }
        );

        let t = TrendIndicator::from_values(&[6.0, 6.1, 6.2], &TrendRule::cv());
        assert!(matches!(t, TrendIndicator::Reading { arrow: Arrow::Flat, status: Status::Good, .. }));

        let t = TrendIndicator::from_values(&[9.0, 9.5, 10.0], &TrendRule::cv());
        assert!(matches!(t, TrendIndicator::Reading { arrow: Arrow::Down, status: Status::Bad, .. }));
    }

    #[test]
    fn test_cv_band_edges() {
        let bands = TrendRule::cv().bands;
        assert_eq!(bands.status(9.0), Status::Warning);
        assert_eq!(bands.status(6.5), Status::Warning);
        assert_eq!(bands.status(6.4), Status::Good);
        assert_eq!(bands.status(9.1), Status::Bad);
    }

    #[test]
    fn test_strength_band_edges() {
        let bands = TrendRule::strength().bands;
        assert_eq!(bands.status(269.9), Status::Bad);
        assert_eq!(bands.status(270.0), Status::Warning);
        assert_eq!(bands.status(280.0), Status::Good);
    }

    #[test]
    fn test_sparkline_levels() {
        assert!(sparkline(&[]).is_empty());
        assert_eq!(sparkline(&[1.0, 1.0]), vec![3, 3]);
        assert_eq!(sparkline(&[0.0, 7.0, 3.5]), vec![0, 7, 4]);
    }
}
