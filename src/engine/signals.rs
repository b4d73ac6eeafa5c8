//! Mean-reversion signal generators.
//!
//! Both rules compare each price to its trailing SMA. The regime-aware rule flips
//! polarity at every directional-change event: the flip happens at the event's own
//! index, before that bar's signal is decided.

use crate::{
    analysis::directional_change::detect,
    error::{RegimeError, RegimeResult},
    models::{ChangeEvent, Signal},
    utils::rolling_mean,
};

fn check_window(window: usize) -> RegimeResult<()> {
    if window == 0 {
        return Err(RegimeError::invalid("window", "must be at least 1"));
    }
    Ok(())
}

/// Long below the SMA, short above it, flat on ties and during warm-up.
pub fn simple_mean_reversion(prices: &[f64], window: usize) -> RegimeResult<Vec<Signal>> {
    check_window(window)?;
    Ok(rolling_mean(prices, window)
        .into_iter()
        .zip(prices)
        .map(|(sma, &price)| match sma {
            Some(sma) => Signal::from_ordering(price, sma),
            None => Signal::Flat,
        })
        .collect())
}

/// Detects events at `dc_threshold` and applies [`regime_aware_from_events`].
pub fn regime_aware_mean_reversion(
    prices: &[f64],
    window: usize,
    dc_threshold: f64,
) -> RegimeResult<Vec<Signal>> {
    check_window(window)?;
    let events = detect(prices, dc_threshold)?;
    regime_aware_from_events(prices, window, &events)
}

/// Regime-aware rule over a caller-supplied event list (sorted by index).
///
/// Events inside the warm-up (`index < window - 1`) are passed over without
/// toggling. The seed event never toggles.
pub fn regime_aware_from_events(
    prices: &[f64],
    window: usize,
    events: &[ChangeEvent],
) -> RegimeResult<Vec<Signal>> {
    check_window(window)?;
    let sma = rolling_mean(prices, window);

    let mut signals = vec![Signal::Flat; prices.len()];
    let mut reversed = false;
    let mut pending = events.iter().filter(|ev| !ev.is_initial()).peekable();

    for (i, &price) in prices.iter().enumerate() {
        // Consume every event up to and including this bar
        let mut event_here = false;
        while let Some(ev) = pending.next_if(|ev| ev.index <= i) {
            if ev.index == i {
                event_here = true;
            }
        }

        let Some(mean) = sma[i] else {
            continue;
        };

        if event_here {
            reversed = !reversed;
        }

        signals[i] = if reversed {
            Signal::from_ordering(mean, price)
        } else {
            Signal::from_ordering(price, mean)
        };
    }

    Ok(signals)
}
