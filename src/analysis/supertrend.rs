//! Supertrend: ATR-band trend overlay.
//!
//! Values only; nothing here renders.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::{RegimeError, RegimeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum TrendDirection {
    #[strum(to_string = "up")]
    Up,
    #[strum(to_string = "down")]
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupertrendPoint {
    /// Active band. `None` at index 0.
    pub value: Option<f64>,
    /// `None` until the close first breaks out of a band.
    pub direction: Option<TrendDirection>,
    pub final_upper: f64,
    pub final_lower: f64,
}

/// True range per bar; the first bar has no previous close so it is `high - low`.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    (0..highs.len())
        .map(|i| {
            let hl = highs[i] - lows[i];
            if i == 0 {
                hl
            } else {
                let prev_close = closes[i - 1];
                hl.max((highs[i] - prev_close).abs())
                    .max((lows[i] - prev_close).abs())
            }
        })
        .collect()
}

/// Exponential moving average with span `window` (alpha = 2 / (window + 1)),
/// seeded with the first value.
pub fn ema(values: &[f64], window: usize) -> Vec<f64> {
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

pub fn supertrend(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    window: usize,
    multiplier: f64,
) -> RegimeResult<Vec<SupertrendPoint>> {
    if window == 0 {
        return Err(RegimeError::invalid("window", "must be at least 1"));
    }
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(RegimeError::invalid(
            "multiplier",
            format!("{} must be finite and positive", multiplier),
        ));
    }
    if highs.len() != closes.len() || lows.len() != closes.len() {
        return Err(RegimeError::invalid(
            "highs/lows",
            format!(
                "column lengths differ (high={}, low={}, close={})",
                highs.len(),
                lows.len(),
                closes.len()
            ),
        ));
    }

    let atr = ema(&true_range(highs, lows, closes), window);
    let mut points: Vec<SupertrendPoint> = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        let mid = (highs[i] + lows[i]) / 2.0;
        let basic_upper = mid + multiplier * atr[i];
        let basic_lower = mid - multiplier * atr[i];

        let Some(prev) = points.last().copied() else {
            points.push(SupertrendPoint {
                value: None,
                direction: None,
                final_upper: basic_upper,
                final_lower: basic_lower,
            });
            continue;
        };

        let mut final_upper = basic_upper;
        let mut final_lower = basic_lower;
        let close = closes[i];

        let direction = if close > prev.final_upper {
            Some(TrendDirection::Up)
        } else if close < prev.final_lower {
            Some(TrendDirection::Down)
        } else {
            // No breakout: carry the trend and ratchet its band
            match prev.direction {
                Some(TrendDirection::Up) => final_lower = basic_lower.max(prev.final_lower),
                Some(TrendDirection::Down) => final_upper = basic_upper.min(prev.final_upper),
                None => {}
            }
            prev.direction
        };

        let value = match direction {
            Some(TrendDirection::Up) => final_lower,
            _ => final_upper,
        };

        points.push(SupertrendPoint {
            value: Some(value),
            direction,
            final_upper,
            final_lower,
        });
    }

    Ok(points)
}
