//! Per-regime statistics over a decoded state sequence.

use serde::{Deserialize, Serialize};

use crate::{
    analysis::directional_change::dc_indicator,
    config::ObservationMode,
    error::{RegimeError, RegimeResult},
    models::ChangeEvent,
    utils::mean_and_stddev,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    pub state: usize,
    pub samples: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    pub up_events: usize,
    pub down_events: usize,
}

/// DC sign (+1 up, -1 down, 0 none) belonging to each observation.
///
/// Event mode: the direction of the event that closes the observation.
/// Price mode: the indicator at the price index the return ends on.
pub fn aligned_directions(
    mode: ObservationMode,
    prices_len: usize,
    events: &[ChangeEvent],
) -> Vec<i8> {
    match mode {
        ObservationMode::EventReturns => {
            events.iter().skip(1).map(|ev| ev.direction.sign()).collect()
        }
        ObservationMode::PriceReturns => dc_indicator(prices_len, events)
            .into_iter()
            .skip(1)
            .collect(),
    }
}

pub fn summarize_regimes(
    observations: &[f64],
    states: &[usize],
    directions: &[i8],
    n_states: usize,
) -> RegimeResult<Vec<RegimeStats>> {
    if states.len() != observations.len() {
        return Err(RegimeError::invalid(
            "states",
            format!(
                "{} states for {} observations",
                states.len(),
                observations.len()
            ),
        ));
    }
    if directions.len() != observations.len() {
        return Err(RegimeError::invalid(
            "directions",
            format!(
                "{} directions for {} observations",
                directions.len(),
                observations.len()
            ),
        ));
    }
    if let Some(&bad) = states.iter().find(|&&s| s >= n_states) {
        return Err(RegimeError::invalid(
            "states",
            format!("state {} out of range for {} states", bad, n_states),
        ));
    }

    let stats = (0..n_states)
        .map(|state| {
            let members: Vec<usize> = (0..states.len()).filter(|&i| states[i] == state).collect();
            let values: Vec<f64> = members.iter().map(|&i| observations[i]).collect();
            let (mean, std_dev) = if values.is_empty() {
                (0.0, 0.0)
            } else {
                mean_and_stddev(&values, 1)
            };
            RegimeStats {
                state,
                samples: members.len(),
                mean,
                std_dev,
                up_events: members.iter().filter(|&&i| directions[i] > 0).count(),
                down_events: members.iter().filter(|&&i| directions[i] < 0).count(),
            }
        })
        .collect();

    Ok(stats)
}
