//! Observation sequences for the regime model.

use itertools::Itertools;

use crate::{
    config::ObservationMode,
    error::{RegimeError, RegimeResult},
    models::ChangeEvent,
};

/// `ln(p[i]) - ln(p[i-1])` for consecutive prices.
pub fn log_returns(prices: &[f64]) -> RegimeResult<Vec<f64>> {
    if prices.len() < 2 {
        return Err(RegimeError::insufficient(2, prices.len()));
    }
    Ok(prices
        .iter()
        .tuple_windows()
        .map(|(prev, next)| next.ln() - prev.ln())
        .collect())
}

/// Log-returns between consecutive change-event prices (the seed event included).
pub fn event_log_returns(events: &[ChangeEvent]) -> RegimeResult<Vec<f64>> {
    if events.len() < 2 {
        return Err(RegimeError::insufficient(2, events.len()));
    }
    Ok(events
        .iter()
        .tuple_windows()
        .map(|(prev, next)| next.price.ln() - prev.price.ln())
        .collect())
}

pub fn build_observations(
    prices: &[f64],
    events: &[ChangeEvent],
    mode: ObservationMode,
) -> RegimeResult<Vec<f64>> {
    match mode {
        ObservationMode::EventReturns => event_log_returns(events),
        ObservationMode::PriceReturns => log_returns(prices),
    }
}

/// Percentage change per bar, `p[i] / p[i-1] - 1`. One shorter than the input.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .iter()
        .tuple_windows()
        .map(|(prev, next)| next / prev - 1.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use approx::assert_relative_eq;

    #[test]
    fn log_returns_basic() {
        let r = log_returns(&[100.0, 110.0, 99.0]).unwrap();
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], (1.1f64).ln(), epsilon = 1e-12);
        assert_relative_eq!(r[1], (0.9f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn too_short_inputs() {
        assert_eq!(
            log_returns(&[1.0]),
            Err(RegimeError::InsufficientData {
                required: 2,
                available: 1
            })
        );
        let one = [ChangeEvent::new(0, 1.0, Direction::Initial)];
        assert!(matches!(
            event_log_returns(&one),
            Err(RegimeError::InsufficientData { available: 1, .. })
        ));
        assert!(matches!(
            event_log_returns(&[]),
            Err(RegimeError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn event_returns_include_seed() {
        let events = [
            ChangeEvent::new(0, 100.0, Direction::Initial),
            ChangeEvent::new(3, 95.0, Direction::Down),
            ChangeEvent::new(5, 100.0, Direction::Up),
        ];
        let r = event_log_returns(&events).unwrap();
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], (0.95f64).ln(), epsilon = 1e-12);
        assert_relative_eq!(r[1], (100.0f64 / 95.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn mode_selects_source() {
        let prices = [100.0, 101.0, 99.0, 95.0];
        let events = [
            ChangeEvent::new(0, 100.0, Direction::Initial),
            ChangeEvent::new(3, 95.0, Direction::Down),
        ];
        let ev = build_observations(&prices, &events, ObservationMode::EventReturns).unwrap();
        let px = build_observations(&prices, &events, ObservationMode::PriceReturns).unwrap();
        assert_eq!(ev.len(), 1);
        assert_eq!(px.len(), 3);
    }

    #[test]
    fn simple_returns_basic() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert_relative_eq!(r[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(r[1], -0.1, epsilon = 1e-12);
        assert!(simple_returns(&[5.0]).is_empty());
    }
}
