//! Validated value types shared across the pipeline

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::{RegimeError, RegimeResult};

/// Fractional directional-change threshold, e.g. 0.01 = 1%.
/// Always strictly inside (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(val: f64) -> RegimeResult<Self> {
        if !val.is_finite() || val <= 0.0 || val >= 1.0 {
            return Err(RegimeError::invalid(
                "threshold",
                format!("{} is outside the open interval (0, 1)", val),
            ));
        }
        Ok(Self(val))
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Threshold {
    type Error = RegimeError;

    fn try_from(val: f64) -> RegimeResult<Self> {
        Self::new(val)
    }
}

impl From<Threshold> for f64 {
    fn from(t: Threshold) -> Self {
        t.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.0 * 100.)
    }
}

/// Inclusive linear grid of threshold candidates (same spacing as `np.linspace`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdGrid {
    pub start: f64,
    pub end: f64,
    pub steps: usize,
}

impl ThresholdGrid {
    pub const fn new(start: f64, end: f64, steps: usize) -> Self {
        Self { start, end, steps }
    }

    /// The candidate values, ascending when `start < end`.
    /// The grid is not validated: nonsensical entries simply fail their own candidate run.
    pub fn values(&self) -> Vec<f64> {
        crate::utils::linspace(self.start, self.end, self.steps)
    }
}

/// Which sequence the regime model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, ValueEnum)]
pub enum ObservationMode {
    /// Log-returns between consecutive change events.
    #[default]
    #[strum(to_string = "event-returns")]
    EventReturns,
    /// Log-returns between consecutive raw prices.
    #[strum(to_string = "price-returns")]
    PriceReturns,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_rejects_out_of_range() {
        assert!(Threshold::new(0.0).is_err());
        assert!(Threshold::new(-0.01).is_err());
        assert!(Threshold::new(1.0).is_err());
        assert!(Threshold::new(f64::NAN).is_err());
        assert_eq!(Threshold::new(0.05).map(Threshold::value), Ok(0.05));
    }

    #[test]
    fn threshold_displays_as_percent() {
        let t = Threshold::new(0.015).unwrap();
        assert_eq!(t.to_string(), "1.50%");
    }

    #[test]
    fn grid_is_inclusive() {
        let grid = ThresholdGrid::new(0.005, 0.05, 10).values();
        assert_eq!(grid.len(), 10);
        assert!((grid[0] - 0.005).abs() < 1e-12);
        assert!((grid[9] - 0.05).abs() < 1e-12);
        assert!((grid[1] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn observation_mode_names() {
        assert_eq!(ObservationMode::EventReturns.to_string(), "event-returns");
        assert_eq!(ObservationMode::default(), ObservationMode::EventReturns);
    }
}
