//! Directional-change (DC) event detection.
//!
//! Single active-extreme formulation: the detector only tracks the extreme that
//! matters for the reversal it is currently watching for. It starts out watching
//! for a drop off a running high. An event is emitted at the first index where the
//! move off that extreme reaches the threshold (`>=`), the extreme resets to that
//! price, and the watch direction flips. One pass, no look-back.

use crate::{
    config::Threshold,
    error::RegimeResult,
    models::{ChangeEvent, Direction},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    SeekingDown,
    SeekingUp,
}

/// Scan state; owned by a single `detect` call.
struct DetectorState {
    last_extreme: f64,
    mode: Mode,
}

impl DetectorState {
    fn new(first_price: f64) -> Self {
        Self {
            last_extreme: first_price,
            mode: Mode::SeekingDown,
        }
    }

    /// Advance by one sample; returns the direction of the event fired here, if any.
    #[inline]
    fn step(&mut self, price: f64, threshold: f64) -> Option<Direction> {
        match self.mode {
            Mode::SeekingDown => {
                if price > self.last_extreme {
                    self.last_extreme = price;
                }
                if (self.last_extreme - price) / self.last_extreme >= threshold {
                    self.last_extreme = price;
                    self.mode = Mode::SeekingUp;
                    return Some(Direction::Down);
                }
            }
            Mode::SeekingUp => {
                if price < self.last_extreme {
                    self.last_extreme = price;
                }
                if (price - self.last_extreme) / self.last_extreme >= threshold {
                    self.last_extreme = price;
                    self.mode = Mode::SeekingDown;
                    return Some(Direction::Up);
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionalChangeDetector {
    threshold: Threshold,
}

impl DirectionalChangeDetector {
    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Events over `prices`: an `Initial` seed at index 0, then alternating Down/Up.
    pub fn detect(&self, prices: &[f64]) -> Vec<ChangeEvent> {
        let Some(&first) = prices.first() else {
            return Vec::new();
        };

        let threshold = self.threshold.value();
        let mut state = DetectorState::new(first);
        let mut events = vec![ChangeEvent::new(0, first, Direction::Initial)];

        for (i, &price) in prices.iter().enumerate().skip(1) {
            if let Some(direction) = state.step(price, threshold) {
                events.push(ChangeEvent::new(i, price, direction));
            }
        }

        events
    }
}

/// Convenience wrapper validating a raw threshold.
pub fn detect(prices: &[f64], threshold: f64) -> RegimeResult<Vec<ChangeEvent>> {
    let threshold = Threshold::new(threshold)?;
    Ok(DirectionalChangeDetector::new(threshold).detect(prices))
}

/// Render events as a series aligned with the prices: +1 at Up events,
/// -1 at Down events, 0 elsewhere (including the seed index).
pub fn dc_indicator(len: usize, events: &[ChangeEvent]) -> Vec<i8> {
    let mut series = vec![0i8; len];
    for ev in events.iter().filter(|ev| ev.index < len) {
        series[ev.index] = ev.direction.sign();
    }
    series
}

/// Count of non-seed events.
pub fn change_count(events: &[ChangeEvent]) -> usize {
    events.iter().filter(|ev| !ev.is_initial()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegimeError;

    fn directions(events: &[ChangeEvent]) -> Vec<Direction> {
        events.iter().map(|e| e.direction).collect()
    }

    #[test]
    fn scenario_drop_then_rebound() {
        let prices = [100.0, 101.0, 99.0, 95.0, 94.0, 100.0, 108.0];
        let events = detect(&prices, 0.05).unwrap();

        assert_eq!(
            events,
            vec![
                ChangeEvent::new(0, 100.0, Direction::Initial),
                // (101 - 95) / 101 = 5.9%
                ChangeEvent::new(3, 95.0, Direction::Down),
                // (100 - 94) / 94 = 6.4%
                ChangeEvent::new(5, 100.0, Direction::Up),
            ]
        );
    }

    #[test]
    fn boundary_uses_greater_or_equal() {
        // Exactly 50% drop and exactly 100% rise (exact in binary)
        let events = detect(&[2.0, 1.0, 2.0], 0.5).unwrap();
        assert_eq!(
            directions(&events),
            vec![Direction::Initial, Direction::Down, Direction::Up]
        );
        // Just short of the threshold fires nothing
        let events = detect(&[2.0, 1.0000001], 0.5).unwrap();
        assert_eq!(change_count(&events), 0);
    }

    #[test]
    fn empty_and_single() {
        assert!(detect(&[], 0.01).unwrap().is_empty());
        assert_eq!(
            detect(&[42.0], 0.01).unwrap(),
            vec![ChangeEvent::new(0, 42.0, Direction::Initial)]
        );
    }

    #[test]
    fn constant_series_has_no_changes() {
        let prices = vec![50.0; 100];
        for t in [0.0001, 0.01, 0.5] {
            assert_eq!(change_count(&detect(&prices, t).unwrap()), 0);
        }
    }

    #[test]
    fn initial_watch_is_for_a_drop() {
        // A pure rally never fires: the detector starts watching a running high
        let prices: Vec<f64> = (0..50).map(|i| 100.0 * 1.02f64.powi(i)).collect();
        assert_eq!(change_count(&detect(&prices, 0.01).unwrap()), 0);
    }

    #[test]
    fn rejects_invalid_threshold() {
        for t in [0.0, -0.1, 1.0, f64::NAN] {
            assert!(matches!(
                detect(&[1.0, 2.0], t),
                Err(RegimeError::InvalidParameter { name: "threshold", .. })
            ));
        }
    }

    #[test]
    fn extreme_tracks_new_low_before_reversal() {
        // Down at 90 (10% off 100); the low keeps sliding to 80, so the Up
        // fires at 88 (10% off 80), not at 99 (10% off 90).
        let prices = [100.0, 90.0, 85.0, 80.0, 86.0, 88.0, 99.0];
        let events = detect(&prices, 0.1).unwrap();
        assert_eq!(events[1], ChangeEvent::new(1, 90.0, Direction::Down));
        assert_eq!(events[2], ChangeEvent::new(5, 88.0, Direction::Up));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn indicator_alignment() {
        let prices = [100.0, 101.0, 99.0, 95.0, 94.0, 100.0, 108.0];
        let events = detect(&prices, 0.05).unwrap();
        assert_eq!(dc_indicator(prices.len(), &events), vec![0, 0, 0, -1, 0, 1, 0]);
    }
}
